use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    assets::{decode, path::normalize_rel_path},
    foundation::core::{ColorKey, Resolution, Rgba, SampledImage},
    foundation::error::CombineResult,
};

/// Logical image source for one output channel.
#[derive(Clone)]
pub enum SourceDescriptor {
    /// Image file relative to the resolver root.
    Path(String),
    /// Solid color, materialized as a memoized 1x1 image.
    Color(Rgba),
    /// Already decoded image, used as-is.
    Image(Arc<SampledImage>),
}

impl SourceDescriptor {
    pub fn path(rel: impl Into<String>) -> Self {
        Self::Path(rel.into())
    }

    pub fn color(color: Rgba) -> Self {
        Self::Color(color)
    }

    pub fn image(image: SampledImage) -> Self {
        Self::Image(Arc::new(image))
    }
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Self::Color(c) => f.debug_tuple("Color").field(c).finish(),
            Self::Image(img) => write!(f, "Image({}x{})", img.width(), img.height()),
        }
    }
}

/// A source whose dimensions are known and whose pixels can be materialized on demand.
///
/// File-backed sources hold only the probed header; pixels are decoded by
/// [`ChannelSourceResolver`] when a combine actually samples them.
#[derive(Clone)]
pub struct ResolvedSource {
    kind: ResolvedKind,
}

#[derive(Clone)]
enum ResolvedKind {
    Fallback(Arc<SampledImage>),
    Memory(Arc<SampledImage>),
    File {
        rel: String,
        abs: PathBuf,
        resolution: Resolution,
    },
}

/// Identity used to share one raw duplicate between slots reading the same source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SourceIdentity {
    Shared(usize),
    File(PathBuf),
}

impl ResolvedSource {
    pub fn resolution(&self) -> Resolution {
        match &self.kind {
            ResolvedKind::Fallback(img) | ResolvedKind::Memory(img) => img.resolution(),
            ResolvedKind::File { resolution, .. } => *resolution,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.kind, ResolvedKind::Fallback(_))
    }

    /// Whether sampling requires a transient decoded duplicate.
    pub fn needs_raw_copy(&self) -> bool {
        matches!(self.kind, ResolvedKind::File { .. })
    }

    pub(crate) fn identity(&self) -> SourceIdentity {
        match &self.kind {
            ResolvedKind::Fallback(img) | ResolvedKind::Memory(img) => {
                SourceIdentity::Shared(Arc::as_ptr(img) as usize)
            }
            ResolvedKind::File { abs, .. } => SourceIdentity::File(abs.clone()),
        }
    }

    pub fn label(&self) -> String {
        match &self.kind {
            ResolvedKind::Fallback(img) => {
                let [r, g, b, a] = img.texel(0, 0);
                format!("color({r}, {g}, {b}, {a})")
            }
            ResolvedKind::Memory(img) => format!("memory({}x{})", img.width(), img.height()),
            ResolvedKind::File { rel, .. } => rel.clone(),
        }
    }
}

impl fmt::Debug for ResolvedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let res = self.resolution();
        write!(f, "ResolvedSource({} {}x{})", self.label(), res.width, res.height)
    }
}

/// Counters for transient raw duplicates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawStats {
    /// Duplicates decoded so far.
    pub acquired: u64,
    /// Duplicates released so far.
    pub released: u64,
}

impl RawStats {
    /// Duplicates currently alive.
    pub fn live(self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// Turns [`SourceDescriptor`]s into sampleable images.
///
/// Owns the fallback-color cache. The cache only ever grows by insert-if-absent, so a resolver can
/// be shared across threads and combine calls.
pub struct ChannelSourceResolver {
    root: PathBuf,
    fallbacks: RwLock<HashMap<ColorKey, Arc<SampledImage>>>,
    raw_acquired: AtomicU64,
    raw_released: AtomicU64,
}

impl fmt::Debug for ChannelSourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSourceResolver")
            .field("root", &self.root)
            .field("fallbacks", &self.fallback_cache_len())
            .field("raw", &self.raw_stats())
            .finish()
    }
}

impl ChannelSourceResolver {
    /// Create a resolver reading file sources relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fallbacks: RwLock::new(HashMap::new()),
            raw_acquired: AtomicU64::new(0),
            raw_released: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a descriptor. File sources are probed for dimensions only.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn resolve(&self, desc: &SourceDescriptor) -> CombineResult<ResolvedSource> {
        let kind = match desc {
            SourceDescriptor::Color(c) => ResolvedKind::Fallback(self.fallback(*c)),
            SourceDescriptor::Image(img) => ResolvedKind::Memory(Arc::clone(img)),
            SourceDescriptor::Path(p) => {
                let rel = normalize_rel_path(p)?;
                let abs = self.root.join(&rel);
                let resolution = decode::probe_dimensions(&abs)?;
                ResolvedKind::File {
                    rel,
                    abs,
                    resolution,
                }
            }
        };
        Ok(ResolvedSource { kind })
    }

    /// The memoized 1x1 image for `color`.
    pub fn fallback(&self, color: Rgba) -> Arc<SampledImage> {
        let key = color.key();
        {
            let cache = self.fallbacks.read().unwrap_or_else(|e| e.into_inner());
            if let Some(img) = cache.get(&key) {
                return Arc::clone(img);
            }
        }

        let mut cache = self.fallbacks.write().unwrap_or_else(|e| e.into_inner());
        let img = cache.entry(key).or_insert_with(|| {
            tracing::debug!(?color, "materialize fallback color");
            Arc::new(SampledImage::solid(color))
        });
        Arc::clone(img)
    }

    /// Number of distinct fallback colors materialized so far.
    pub fn fallback_cache_len(&self) -> usize {
        self.fallbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether the file at `rel` stores an alpha channel. Reads the header only.
    pub fn has_alpha(&self, rel: &str) -> CombineResult<bool> {
        let rel = normalize_rel_path(rel)?;
        decode::probe_has_alpha(&self.root.join(rel))
    }

    pub fn raw_stats(&self) -> RawStats {
        RawStats {
            acquired: self.raw_acquired.load(Ordering::Acquire),
            released: self.raw_released.load(Ordering::Acquire),
        }
    }

    /// Decode a file-backed source into a fresh linear buffer.
    ///
    /// Every successful call must be paired with [`Self::release_raw`]; `RawSet` does this.
    pub(crate) fn acquire_raw(&self, src: &ResolvedSource) -> CombineResult<Arc<SampledImage>> {
        let abs = match &src.kind {
            ResolvedKind::Fallback(img) | ResolvedKind::Memory(img) => return Ok(Arc::clone(img)),
            ResolvedKind::File { abs, .. } => abs,
        };
        let img = decode::decode_image_file(abs)?;
        if img.resolution() != src.resolution() {
            tracing::warn!(
                source = %src.label(),
                "decoded size differs from probed header; file changed during combine"
            );
        }
        self.raw_acquired.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(source = %src.label(), "acquired raw duplicate");
        Ok(Arc::new(img))
    }

    pub(crate) fn release_raw(&self, label: &str) {
        self.raw_released.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(source = %label, "released raw duplicate");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/resolver.rs"]
mod tests;
