use crate::foundation::core::Rgba;
use serde::{Deserialize, Serialize};

/// Color literal accepted in request and material files.
///
/// Deserializes from a grey level (`0.5`), `"#RRGGBB"`, `"#RRGGBBAA"`, `{r,g,b[,a]}`, `[r,g,b]` or
/// `[r,g,b,a]`. Components are unit floats; no color-space conversion is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorDef {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ColorDef {
    pub fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_rgba(self) -> Rgba {
        Rgba::new(self.r as f32, self.g as f32, self.b as f32, self.a as f32)
    }

    /// Parse the string forms only (`#RRGGBB` / `#RRGGBBAA`).
    pub fn parse_hex(s: &str) -> Result<Self, String> {
        parse_hex(s)
    }
}

impl From<Rgba> for ColorDef {
    fn from(c: Rgba) -> Self {
        Self::rgba(c.r.into(), c.g.into(), c.b.into(), c.a.into())
    }
}

impl<'de> Deserialize<'de> for ColorDef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Grey(f64),
            Hex(String),
            Components {
                r: f64,
                g: f64,
                b: f64,
                #[serde(default = "opaque")]
                a: f64,
            },
            List(Vec<f64>),
        }

        fn opaque() -> f64 {
            1.0
        }

        match Repr::deserialize(deserializer)? {
            Repr::Grey(v) => Ok(Self::rgba(v, v, v, 1.0)),
            Repr::Hex(s) => parse_hex(&s).map_err(serde::de::Error::custom),
            Repr::Components { r, g, b, a } => Ok(Self::rgba(r, g, b, a)),
            Repr::List(v) => match *v.as_slice() {
                [r, g, b] => Ok(Self::rgba(r, g, b, 1.0)),
                [r, g, b, a] => Ok(Self::rgba(r, g, b, a)),
                _ => Err(serde::de::Error::invalid_length(
                    v.len(),
                    &"3 ([r, g, b]) or 4 ([r, g, b, a]) components",
                )),
            },
        }
    }
}

/// `#RRGGBB` or `#RRGGBBAA`, `#` optional. Bytes map to `n / 255`.
fn parse_hex(s: &str) -> Result<ColorDef, String> {
    let digits = s.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    let has_alpha = match digits.len() {
        6 => false,
        8 => true,
        n => return Err(format!("hex color '{s}' has {n} digits, expected 6 or 8")),
    };
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("hex color '{s}' contains a non-hex digit"));
    }
    let packed = u32::from_str_radix(digits, 16).map_err(|e| format!("hex color '{s}': {e}"))?;
    let packed = if has_alpha { packed } else { (packed << 8) | 0xff };

    let [r, g, b, a] = packed.to_be_bytes().map(|v| f64::from(v) / 255.0);
    Ok(ColorDef::rgba(r, g, b, a))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/color.rs"]
mod tests;
