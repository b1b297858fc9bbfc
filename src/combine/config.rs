use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::assets::color::ColorDef;
use crate::combine::compositor::{ChannelSlot, CombineRequest};
use crate::combine::remap::RemapRange;
use crate::combine::sample::SampleFilter;
use crate::combine::selector::ChannelSelector;
use crate::foundation::error::{CombineError, CombineResult};
use crate::resolve::resolver::SourceDescriptor;

/// JSON-facing source of one slot: `{"path": "tex/a.png"}` or `{"color": "#808080"}`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSpec {
    Path(String),
    Color(ColorDef),
}

impl SourceSpec {
    pub fn to_descriptor(&self) -> SourceDescriptor {
        match self {
            Self::Path(p) => SourceDescriptor::path(p.clone()),
            Self::Color(c) => SourceDescriptor::color(c.to_rgba()),
        }
    }

    /// Parse the CLI shorthand: a leading `#` is a hex color, anything else a path.
    pub fn parse_shorthand(s: &str) -> CombineResult<Self> {
        if s.starts_with('#') {
            ColorDef::parse_hex(s)
                .map(Self::Color)
                .map_err(|e| CombineError::validation(format!("source '{s}': {e}")))
        } else if s.is_empty() {
            Err(CombineError::validation("source must be non-empty"))
        } else {
            Ok(Self::Path(s.to_owned()))
        }
    }
}

/// One output channel of a [`CombineSpec`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotSpec {
    pub source: SourceSpec,
    /// Signed selector code; see [`ChannelSelector`].
    pub channel: ChannelSelector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remap: Option<RemapRange>,
}

impl SlotSpec {
    /// Parse the CLI shorthand `<source>:<code>`, e.g. `tex/rough.png:-4` or `#808080:0`.
    pub fn parse_shorthand(s: &str) -> CombineResult<Self> {
        let (source, code) = s.rsplit_once(':').ok_or_else(|| {
            CombineError::validation(format!("slot '{s}' must look like <source>:<channel>"))
        })?;
        let code: i32 = code.trim().parse().map_err(|e| {
            CombineError::validation(format!("slot '{s}': channel '{code}' is not an integer: {e}"))
        })?;
        Ok(Self {
            source: SourceSpec::parse_shorthand(source)?,
            channel: ChannelSelector::from_code(code),
            remap: None,
        })
    }

    fn to_slot(&self) -> ChannelSlot {
        ChannelSlot::new(self.source.to_descriptor(), self.channel)
    }
}

/// A combine request as stored in a JSON file.
///
/// ```json
/// {
///   "r": { "source": { "path": "Rock_Metallic.png" }, "channel": 0 },
///   "g": { "source": { "path": "Rock_AO.png" }, "channel": 1 },
///   "b": { "source": { "color": "#ffffff" }, "channel": 3 },
///   "a": { "source": { "path": "Rock_Rough.png" }, "channel": -4, "remap": { "min": 0, "max": 0.8 } },
///   "filter": "bilinear",
///   "out": "Rock_MaskMap.png"
/// }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombineSpec {
    pub r: SlotSpec,
    pub g: SlotSpec,
    pub b: SlotSpec,
    pub a: SlotSpec,
    #[serde(default)]
    pub filter: SampleFilter,
    pub out: String,
}

impl CombineSpec {
    /// Parse a spec from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> CombineResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| CombineError::validation(format!("parse combine spec JSON: {e}")))
    }

    /// Parse a spec from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> CombineResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            CombineError::validation(format!("open combine spec '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn to_request(&self) -> CombineRequest {
        let slots = [&self.r, &self.g, &self.b, &self.a];
        let mut req = CombineRequest::new(
            slots[0].to_slot(),
            slots[1].to_slot(),
            slots[2].to_slot(),
            slots[3].to_slot(),
            self.out.clone(),
        )
        .with_filter(self.filter);
        for (i, slot) in slots.iter().enumerate() {
            if let Some(remap) = slot.remap {
                req.remaps[i] = remap;
            }
        }
        req
    }
}

#[cfg(test)]
#[path = "../../tests/unit/combine/config.rs"]
mod tests;
