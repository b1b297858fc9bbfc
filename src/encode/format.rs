use std::io::Cursor;

use anyhow::Context;
use image::ImageEncoder as _;

use crate::encode::sink::{ImportOptions, PlatformFormat};
use crate::foundation::core::Resolution;
use crate::foundation::error::{CombineError, CombineResult};
use crate::foundation::math::unorm8;

/// Quality used for lossy 8-bit output.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// On-disk encoding of a packed image, selected by destination extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputEncoding {
    /// Lossless 8-bit RGBA (`.png`).
    Png,
    /// Lossy 8-bit RGB (`.jpg`, `.jpeg`). JPEG has no alpha plane; alpha is dropped.
    Jpeg { quality: u8 },
    /// 32-bit float RGBA (`.exr`).
    Exr,
}

impl OutputEncoding {
    /// Pick the encoder for a destination path by its (case-insensitive) extension.
    pub fn from_path(path: &str) -> CombineResult<Self> {
        let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let ext = file_name
            .rsplit_once('.')
            .filter(|(stem, _)| !stem.is_empty())
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .ok_or_else(|| {
                CombineError::encoding_unsupported(format!("'{path}' has no file extension"))
            })?;
        match ext.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg {
                quality: DEFAULT_JPEG_QUALITY,
            }),
            "exr" => Ok(Self::Exr),
            other => Err(CombineError::encoding_unsupported(format!(
                "no encoder for '.{other}' (expected .png, .jpg, .jpeg or .exr)"
            ))),
        }
    }

    pub fn is_hdr(self) -> bool {
        matches!(self, Self::Exr)
    }

    /// Import settings requested after the encoded bytes are written.
    ///
    /// Values are already linear, so color management is always off. Float output additionally
    /// asks for block-compressed platform storage.
    pub fn import_options(self) -> ImportOptions {
        ImportOptions {
            color_managed: false,
            platform_format: self.is_hdr().then_some(PlatformFormat::Bc3),
        }
    }

    /// Encode row-major float RGBA texels.
    pub fn encode(self, res: Resolution, texels: &[[f32; 4]]) -> CombineResult<Vec<u8>> {
        if texels.len() != res.pixel_count() {
            return Err(CombineError::validation(format!(
                "encode expects {} texels for {}x{}, got {}",
                res.pixel_count(),
                res.width,
                res.height,
                texels.len()
            )));
        }

        let mut buf = Vec::new();
        match self {
            Self::Png => {
                let bytes: Vec<u8> = texels.iter().flatten().copied().map(unorm8).collect();
                let img = image::RgbaImage::from_raw(res.width, res.height, bytes)
                    .context("build rgba8 buffer")?;
                image::DynamicImage::ImageRgba8(img)
                    .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                    .context("encode png")?;
            }
            Self::Jpeg { quality } => {
                let bytes: Vec<u8> = texels
                    .iter()
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .map(unorm8)
                    .collect();
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality)
                    .write_image(
                        &bytes,
                        res.width,
                        res.height,
                        image::ExtendedColorType::Rgb8,
                    )
                    .context("encode jpeg")?;
            }
            Self::Exr => {
                let floats: Vec<f32> = texels.iter().flatten().copied().collect();
                let img = image::Rgba32FImage::from_raw(res.width, res.height, floats)
                    .context("build rgba32f buffer")?;
                image::DynamicImage::ImageRgba32F(img)
                    .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::OpenExr)
                    .context("encode exr")?;
            }
        }
        Ok(buf)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/format.rs"]
mod tests;
