use crate::foundation::error::{CombineError, CombineResult};

/// Straight (non-premultiplied) RGBA with float components.
///
/// Components are nominally in `[0, 1]` but are not clamped at storage time.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Mid grey `(0.5, 0.5, 0.5, 1)`.
    pub const GREY: Self = Self::new(0.5, 0.5, 0.5, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn splat_rgb(v: f32) -> Self {
        Self::new(v, v, v, 1.0)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_array(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Exact bit-level identity, usable as a hash key.
    pub fn key(self) -> ColorKey {
        ColorKey(self.to_array().map(f32::to_bits))
    }
}

/// Bit-exact color identity for memoization. `0.0` and `-0.0` are distinct keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorKey([u32; 4]);

/// Output resolution in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

/// Decoded float RGBA image, row-major, immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct SampledImage {
    width: u32,
    height: u32,
    texels: Vec<[f32; 4]>,
}

impl SampledImage {
    pub fn new(width: u32, height: u32, texels: Vec<[f32; 4]>) -> CombineResult<Self> {
        if width == 0 || height == 0 {
            return Err(CombineError::validation(format!(
                "image dimensions must be > 0 (got {width}x{height})"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| CombineError::validation("image size overflow"))?;
        if texels.len() != expected {
            return Err(CombineError::validation(format!(
                "image expects {expected} texels for {width}x{height}, got {}",
                texels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// A 1x1 image of a single color.
    pub fn solid(color: Rgba) -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![color.to_array()],
        }
    }

    /// Build an image by evaluating `f(x, y)` for every texel.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> Rgba,
    ) -> CombineResult<Self> {
        let mut texels = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                texels.push(f(x, y).to_array());
            }
        }
        Self::new(width, height, texels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    /// Texel at integer coordinates. Callers keep `x < width` and `y < height`.
    #[inline]
    pub fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        self.texels[(y as usize) * (self.width as usize) + (x as usize)]
    }

    pub fn into_texels(self) -> Vec<[f32; 4]> {
        self.texels
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
