use crate::foundation::error::{CombineError, CombineResult};
use crate::foundation::math::clamp01;

/// Affine input range mapped onto `[0, 1]`: `clamp01((v - min) / (max - min))`.
///
/// `min > max` is allowed and flips the ramp. `min == max` is rejected by [`Self::validate`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RemapRange {
    pub min: f32,
    pub max: f32,
}

impl Default for RemapRange {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RemapRange {
    pub const IDENTITY: Self = Self { min: 0.0, max: 1.0 };

    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn is_identity(self) -> bool {
        self == Self::IDENTITY
    }

    pub fn validate(self) -> CombineResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(CombineError::degenerate_remap(format!(
                "bounds must be finite (min={}, max={})",
                self.min, self.max
            )));
        }
        if self.min == self.max {
            return Err(CombineError::degenerate_remap(format!(
                "min == max ({}) has zero width",
                self.min
            )));
        }
        Ok(())
    }

    /// Apply the remap. Callers validate first; a zero-width range yields 0 rather than NaN.
    #[inline]
    pub fn apply(self, v: f32) -> f32 {
        clamp01((v - self.min) / (self.max - self.min))
    }
}
