use crate::foundation::error::{CombineError, CombineResult};

/// Rec. 601 luma weights.
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Scalar read from a source texel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extraction {
    Red,
    Green,
    Blue,
    Alpha,
    /// Weighted average of RGB.
    Luminance,
}

impl Extraction {
    pub const fn magnitude(self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
            Self::Alpha => 3,
            Self::Luminance => 4,
        }
    }

    pub fn from_magnitude(m: u8) -> Option<Self> {
        Some(match m {
            0 => Self::Red,
            1 => Self::Green,
            2 => Self::Blue,
            3 => Self::Alpha,
            4 => Self::Luminance,
            _ => return None,
        })
    }

    #[inline]
    pub fn extract(self, px: [f32; 4]) -> f32 {
        match self {
            Self::Red => px[0],
            Self::Green => px[1],
            Self::Blue => px[2],
            Self::Alpha => px[3],
            Self::Luminance => {
                LUMA_WEIGHTS[0] * px[0] + LUMA_WEIGHTS[1] * px[1] + LUMA_WEIGHTS[2] * px[2]
            }
        }
    }
}

/// Which channel of a source to read, and whether to invert it (`1 - v`).
///
/// The integer code form is `0..=3` for R/G/B/A and `4` for luminance; a negative code means
/// inverted (`-4` is inverted luminance). Code `0` cannot carry the sign, so inverted red is only
/// reachable through [`ChannelSelector::inverted`].
///
/// A selector may hold an unmapped magnitude; [`ChannelSelector::validate`] rejects it before a
/// combine samples anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct ChannelSelector {
    magnitude: u32,
    invert: bool,
}

impl ChannelSelector {
    pub const RED: Self = Self::of(Extraction::Red);
    pub const GREEN: Self = Self::of(Extraction::Green);
    pub const BLUE: Self = Self::of(Extraction::Blue);
    pub const ALPHA: Self = Self::of(Extraction::Alpha);
    pub const LUMINANCE: Self = Self::of(Extraction::Luminance);

    pub const fn of(extraction: Extraction) -> Self {
        Self {
            magnitude: extraction.magnitude() as u32,
            invert: false,
        }
    }

    /// Decode the signed integer form. Never fails; see [`Self::validate`].
    pub fn from_code(code: i32) -> Self {
        Self {
            magnitude: code.unsigned_abs(),
            invert: code < 0,
        }
    }

    /// Signed integer form. Inverted red has no code and encodes as plain `0`.
    pub fn code(self) -> i32 {
        let m = i32::try_from(self.magnitude).unwrap_or(i32::MAX);
        if self.invert { -m } else { m }
    }

    #[must_use]
    pub fn inverted(self) -> Self {
        Self {
            invert: !self.invert,
            ..self
        }
    }

    pub fn is_inverted(self) -> bool {
        self.invert
    }

    pub fn validate(self) -> CombineResult<Extraction> {
        u8::try_from(self.magnitude)
            .ok()
            .and_then(Extraction::from_magnitude)
            .ok_or_else(|| {
                CombineError::invalid_selector(format!(
                    "magnitude {} (code {}) is not one of 0=r 1=g 2=b 3=a 4=luminance",
                    self.magnitude,
                    self.code()
                ))
            })
    }

    /// Resolve into a validated, sampling-ready form.
    pub(crate) fn compile(self) -> CombineResult<CompiledSelector> {
        Ok(CompiledSelector {
            extraction: self.validate()?,
            invert: self.invert,
        })
    }
}

impl From<i32> for ChannelSelector {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl From<ChannelSelector> for i32 {
    fn from(sel: ChannelSelector) -> Self {
        sel.code()
    }
}

impl From<Extraction> for ChannelSelector {
    fn from(e: Extraction) -> Self {
        Self::of(e)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CompiledSelector {
    pub(crate) extraction: Extraction,
    pub(crate) invert: bool,
}

impl CompiledSelector {
    #[inline]
    pub(crate) fn apply(self, px: [f32; 4]) -> f32 {
        let v = self.extraction.extract(px);
        if self.invert { 1.0 - v } else { v }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/combine/selector.rs"]
mod tests;
