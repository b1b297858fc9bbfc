use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::assets::decode::decode_image_file;
use crate::assets::path::normalize_rel_path;
use crate::encode::sink::{ImageHandle, ImportOptions, ManagedImage, PersistenceSink};
use crate::foundation::error::{CombineError, CombineResult};

const IMPORT_SIDECAR_EXT: &str = "import.json";

/// Filesystem-backed sink rooted at a directory.
///
/// Importing writes a JSON sidecar next to the image (`<file>.import.json`) recording the import
/// settings; an image without a sidecar is not considered managed.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a sink-relative path.
    pub fn resolve(&self, path: &str) -> CombineResult<PathBuf> {
        Ok(self.root.join(normalize_rel_path(path)?))
    }

    fn sidecar(file: &Path) -> PathBuf {
        let mut name = file.as_os_str().to_owned();
        name.push(".");
        name.push(IMPORT_SIDECAR_EXT);
        PathBuf::from(name)
    }
}

impl PersistenceSink for FsSink {
    fn write_bytes(&mut self, path: &str, bytes: &[u8]) -> CombineResult<()> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CombineError::persistence(format!("create dir '{}': {e}", parent.display()))
            })?;
        }
        std::fs::write(&file, bytes)
            .map_err(|e| CombineError::persistence(format!("write '{}': {e}", file.display())))?;
        tracing::debug!(path = %file.display(), len = bytes.len(), "wrote bytes");
        Ok(())
    }

    fn import_as_image(&mut self, path: &str, opts: ImportOptions) -> CombineResult<()> {
        let file = self.resolve(path)?;
        if !file.is_file() {
            return Err(CombineError::persistence(format!(
                "cannot import '{}': no such file",
                file.display()
            )));
        }
        let json = serde_json::to_vec_pretty(&opts)
            .map_err(|e| CombineError::persistence(format!("serialize import settings: {e}")))?;
        let sidecar = Self::sidecar(&file);
        std::fs::write(&sidecar, json).map_err(|e| {
            CombineError::persistence(format!("write '{}': {e}", sidecar.display()))
        })?;
        Ok(())
    }

    fn delete_asset(&mut self, path: &str) -> CombineResult<()> {
        let file = self.resolve(path)?;
        for p in [Self::sidecar(&file), file] {
            match std::fs::remove_file(&p) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(CombineError::persistence(format!(
                        "delete '{}': {e}",
                        p.display()
                    )));
                }
            }
        }
        Ok(())
    }

    fn read_image(&mut self, path: &str) -> CombineResult<ManagedImage> {
        let file = self.resolve(path)?;
        let sidecar = Self::sidecar(&file);
        let json = std::fs::read(&sidecar).map_err(|e| {
            CombineError::persistence(format!(
                "'{}' is not imported ({}): {e}",
                file.display(),
                sidecar.display()
            ))
        })?;
        let import: ImportOptions = serde_json::from_slice(&json).map_err(|e| {
            CombineError::persistence(format!("parse '{}': {e}", sidecar.display()))
        })?;
        let image = decode_image_file(&file)
            .map_err(|e| CombineError::persistence(format!("read back: {e}")))?;
        Ok(ManagedImage {
            handle: ImageHandle::for_path(&normalize_rel_path(path)?),
            image,
            import,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/fs.rs"]
mod tests;
