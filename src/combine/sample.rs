use std::sync::Arc;

use crate::foundation::core::{Resolution, SampledImage};
use crate::foundation::math::lerp;

/// Texture filter used when a source is resampled to the output size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFilter {
    #[default]
    Bilinear,
    Nearest,
}

/// One output coordinate's footprint on a source axis.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Tap {
    i0: u32,
    i1: u32,
    t: f32,
}

/// Precomputed axis maps from output texels into one source image.
///
/// Coordinates map texel center to texel center with clamped addressing. When a source already
/// has the output size every tap lands exactly on a texel, so bilinear and nearest agree.
pub(crate) struct SourceSampler {
    image: Arc<SampledImage>,
    xs: Vec<Tap>,
    ys: Vec<Tap>,
}

impl SourceSampler {
    pub(crate) fn new(image: Arc<SampledImage>, out: Resolution, filter: SampleFilter) -> Self {
        let xs = axis_taps(image.width(), out.width, filter);
        let ys = axis_taps(image.height(), out.height, filter);
        Self { image, xs, ys }
    }

    #[inline]
    pub(crate) fn sample(&self, x: u32, y: u32) -> [f32; 4] {
        let tx = self.xs[x as usize];
        let ty = self.ys[y as usize];
        if tx.t == 0.0 && ty.t == 0.0 {
            return self.image.texel(tx.i0, ty.i0);
        }

        let p00 = self.image.texel(tx.i0, ty.i0);
        let p10 = self.image.texel(tx.i1, ty.i0);
        let p01 = self.image.texel(tx.i0, ty.i1);
        let p11 = self.image.texel(tx.i1, ty.i1);
        let mut out = [0.0f32; 4];
        for c in 0..4 {
            let top = lerp(p00[c], p10[c], tx.t);
            let bottom = lerp(p01[c], p11[c], tx.t);
            out[c] = lerp(top, bottom, ty.t);
        }
        out
    }
}

fn axis_taps(src_len: u32, out_len: u32, filter: SampleFilter) -> Vec<Tap> {
    let last = src_len.saturating_sub(1);
    if src_len == out_len || src_len == 1 {
        return (0..out_len)
            .map(|o| {
                let i = o.min(last);
                Tap { i0: i, i1: i, t: 0.0 }
            })
            .collect();
    }

    let scale = f64::from(src_len) / f64::from(out_len);
    (0..out_len)
        .map(|o| {
            let center = (f64::from(o) + 0.5) * scale;
            match filter {
                SampleFilter::Nearest => {
                    let i = (center.floor() as u32).min(last);
                    Tap { i0: i, i1: i, t: 0.0 }
                }
                SampleFilter::Bilinear => {
                    let s = (center - 0.5).clamp(0.0, f64::from(last));
                    let i0 = s.floor() as u32;
                    let i1 = (i0 + 1).min(last);
                    let t = (s - f64::from(i0)) as f32;
                    Tap { i0, i1, t }
                }
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/combine/sample.rs"]
mod tests;
