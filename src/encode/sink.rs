use std::collections::BTreeMap;

use crate::assets::decode::decode_image;
use crate::foundation::core::SampledImage;
use crate::foundation::error::{CombineError, CombineResult};
use crate::foundation::math::Fnv1a64;

/// Platform storage format requested at import time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformFormat {
    /// 8-bit RGBA block compression with interpolated alpha (DXT5).
    Bc3,
}

/// Settings for registering written bytes as a managed image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImportOptions {
    /// Whether the importer should treat samples as color-managed (sRGB).
    pub color_managed: bool,
    /// Optional platform storage override.
    pub platform_format: Option<PlatformFormat>,
}

/// Opaque reference to a managed image, suitable for storing in a material record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ImageHandle {
    path: String,
    id: u64,
}

impl ImageHandle {
    /// Handle for the asset at `path`. The id is a stable hash of the path.
    pub fn for_path(path: &str) -> Self {
        let mut h = Fnv1a64::new_default();
        h.write_bytes(path.as_bytes());
        Self {
            path: path.to_owned(),
            id: h.finish(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// An image read back from a sink after import.
#[derive(Clone, Debug)]
pub struct ManagedImage {
    pub handle: ImageHandle,
    pub image: SampledImage,
    pub import: ImportOptions,
}

/// Narrow persistence contract the compositor writes its output through.
///
/// Paths are sink-relative and `/`-separated.
pub trait PersistenceSink: Send {
    /// Write (or overwrite) raw bytes at `path`.
    fn write_bytes(&mut self, path: &str, bytes: &[u8]) -> CombineResult<()>;
    /// Register previously written bytes as a managed image with the given settings.
    fn import_as_image(&mut self, path: &str, opts: ImportOptions) -> CombineResult<()>;
    /// Remove an asset and any import metadata. Deleting a missing asset is not an error.
    fn delete_asset(&mut self, path: &str) -> CombineResult<()>;
    /// Read a managed image back.
    fn read_image(&mut self, path: &str) -> CombineResult<ManagedImage>;
}

/// Operation recorded by [`InMemorySink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkOp {
    Write(String),
    Import(String, ImportOptions),
    Delete(String),
    Read(String),
}

#[derive(Clone, Debug, Default)]
struct StoredAsset {
    bytes: Vec<u8>,
    import: Option<ImportOptions>,
}

/// In-memory sink for tests and debugging. Records every operation in order.
#[derive(Debug, Default)]
pub struct InMemorySink {
    assets: BTreeMap<String, StoredAsset>,
    ops: Vec<SinkOp>,
    fail_import: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent import fail, to exercise cleanup paths.
    pub fn failing_imports() -> Self {
        Self {
            fail_import: true,
            ..Self::default()
        }
    }

    pub fn ops(&self) -> &[SinkOp] {
        &self.ops
    }

    pub fn bytes(&self, path: &str) -> Option<&[u8]> {
        self.assets.get(path).map(|a| a.bytes.as_slice())
    }

    pub fn import_options(&self, path: &str) -> Option<ImportOptions> {
        self.assets.get(path).and_then(|a| a.import)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.assets.contains_key(path)
    }

    pub fn write_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, SinkOp::Write(_)))
            .count()
    }
}

impl PersistenceSink for InMemorySink {
    fn write_bytes(&mut self, path: &str, bytes: &[u8]) -> CombineResult<()> {
        self.ops.push(SinkOp::Write(path.to_owned()));
        self.assets.insert(
            path.to_owned(),
            StoredAsset {
                bytes: bytes.to_vec(),
                import: None,
            },
        );
        Ok(())
    }

    fn import_as_image(&mut self, path: &str, opts: ImportOptions) -> CombineResult<()> {
        self.ops.push(SinkOp::Import(path.to_owned(), opts));
        if self.fail_import {
            return Err(CombineError::persistence(format!(
                "import of '{path}' rejected"
            )));
        }
        let asset = self
            .assets
            .get_mut(path)
            .ok_or_else(|| CombineError::persistence(format!("no bytes written at '{path}'")))?;
        asset.import = Some(opts);
        Ok(())
    }

    fn delete_asset(&mut self, path: &str) -> CombineResult<()> {
        self.ops.push(SinkOp::Delete(path.to_owned()));
        self.assets.remove(path);
        Ok(())
    }

    fn read_image(&mut self, path: &str) -> CombineResult<ManagedImage> {
        self.ops.push(SinkOp::Read(path.to_owned()));
        let asset = self
            .assets
            .get(path)
            .ok_or_else(|| CombineError::persistence(format!("no asset at '{path}'")))?;
        let import = asset
            .import
            .ok_or_else(|| CombineError::persistence(format!("'{path}' was never imported")))?;
        let image = decode_image(&asset.bytes)
            .map_err(|e| CombineError::persistence(format!("read back '{path}': {e}")))?;
        Ok(ManagedImage {
            handle: ImageHandle::for_path(path),
            image,
            import,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
