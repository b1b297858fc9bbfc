use std::path::Path;

use anyhow::Context;
use image::ImageDecoder as _;

use crate::foundation::core::{Resolution, SampledImage};
use crate::foundation::error::{CombineError, CombineResult};

/// Decode encoded image bytes into raw float RGBA.
///
/// Samples are converted to unit floats as stored. No gamma or color-profile conversion is
/// applied; 8-bit `128` decodes to `128 / 255`.
pub fn decode_image(bytes: &[u8]) -> CombineResult<SampledImage> {
    let dyn_img = image::load_from_memory(bytes)
        .context("decode image from memory")
        .map_err(unavailable)?;
    into_sampled(dyn_img)
}

/// Decode an image file from disk into raw float RGBA.
pub fn decode_image_file(path: &Path) -> CombineResult<SampledImage> {
    let dyn_img = image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .with_context(|| format!("open image '{}'", path.display()))
        .map_err(unavailable)?
        .decode()
        .with_context(|| format!("decode image '{}'", path.display()))
        .map_err(unavailable)?;
    into_sampled(dyn_img)
}

/// Read the pixel dimensions from the file header without decoding pixel data.
pub fn probe_dimensions(path: &Path) -> CombineResult<Resolution> {
    let (width, height) = image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .with_context(|| format!("open image '{}'", path.display()))
        .map_err(unavailable)?
        .into_dimensions()
        .with_context(|| format!("read image header '{}'", path.display()))
        .map_err(unavailable)?;
    if width == 0 || height == 0 {
        return Err(CombineError::source_unavailable(format!(
            "image '{}' has zero area",
            path.display()
        )));
    }
    Ok(Resolution::new(width, height))
}

/// Whether the file's stored pixel format carries an alpha channel.
pub fn probe_has_alpha(path: &Path) -> CombineResult<bool> {
    let decoder = image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .with_context(|| format!("open image '{}'", path.display()))
        .map_err(unavailable)?
        .into_decoder()
        .with_context(|| format!("read image header '{}'", path.display()))
        .map_err(unavailable)?;
    Ok(decoder.color_type().has_alpha())
}

fn into_sampled(dyn_img: image::DynamicImage) -> CombineResult<SampledImage> {
    let rgba = dyn_img.into_rgba32f();
    let (width, height) = rgba.dimensions();
    let texels = rgba
        .into_raw()
        .chunks_exact(4)
        .map(|px| [px[0], px[1], px[2], px[3]])
        .collect();
    SampledImage::new(width, height, texels)
}

fn unavailable(err: anyhow::Error) -> CombineError {
    CombineError::source_unavailable(format!("{err:#}"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
