use std::sync::Arc;

use rayon::prelude::*;

use crate::assets::path::normalize_rel_path;
use crate::combine::remap::RemapRange;
use crate::combine::sample::{SampleFilter, SourceSampler};
use crate::combine::selector::{ChannelSelector, CompiledSelector};
use crate::combine::sizing::negotiate_resolution;
use crate::encode::format::OutputEncoding;
use crate::encode::sink::{ImageHandle, ImportOptions, ManagedImage, PersistenceSink};
use crate::foundation::core::{Resolution, SampledImage};
use crate::foundation::error::{CombineError, CombineResult};
use crate::resolve::raw::RawSet;
use crate::resolve::resolver::{ChannelSourceResolver, ResolvedSource, SourceDescriptor};

/// Options controlling how a [`Compositor`] assembles pixels.
#[derive(Clone, Debug)]
pub struct CompositorOpts {
    /// Assemble rows in parallel (rayon), using a dedicated thread pool.
    pub parallel: bool,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

impl Default for CompositorOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

/// One of the four channels of a packed image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputChannel {
    R,
    G,
    B,
    A,
}

impl OutputChannel {
    pub const ALL: [Self; 4] = [Self::R, Self::G, Self::B, Self::A];

    pub fn index(self) -> usize {
        match self {
            Self::R => 0,
            Self::G => 1,
            Self::B => 2,
            Self::A => 3,
        }
    }
}

/// Source and channel selector feeding one output channel.
#[derive(Clone, Debug)]
pub struct ChannelSlot {
    pub source: SourceDescriptor,
    pub selector: ChannelSelector,
}

impl ChannelSlot {
    pub fn new(source: SourceDescriptor, selector: impl Into<ChannelSelector>) -> Self {
        Self {
            source,
            selector: selector.into(),
        }
    }
}

/// Everything needed for one combine: four slots, per-channel remaps, the filter and the
/// destination path whose extension selects the encoding.
#[derive(Clone, Debug)]
pub struct CombineRequest {
    pub slots: [ChannelSlot; 4],
    pub remaps: [RemapRange; 4],
    pub filter: SampleFilter,
    pub destination: String,
}

impl CombineRequest {
    pub fn new(
        r: ChannelSlot,
        g: ChannelSlot,
        b: ChannelSlot,
        a: ChannelSlot,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            slots: [r, g, b, a],
            remaps: [RemapRange::IDENTITY; 4],
            filter: SampleFilter::default(),
            destination: destination.into(),
        }
    }

    /// Set the input range mapped onto `[0, 1]` for one output channel.
    pub fn set_remapping(&mut self, channel: OutputChannel, min: f32, max: f32) -> &mut Self {
        self.remaps[channel.index()] = RemapRange::new(min, max);
        self
    }

    #[must_use]
    pub fn with_remapping(mut self, channel: OutputChannel, min: f32, max: f32) -> Self {
        self.set_remapping(channel, min, max);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: SampleFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn slot(&self, channel: OutputChannel) -> &ChannelSlot {
        &self.slots[channel.index()]
    }

    pub fn remap(&self, channel: OutputChannel) -> RemapRange {
        self.remaps[channel.index()]
    }
}

/// The packed image as read back from the sink after import.
#[derive(Clone, Debug)]
pub struct PackedImage {
    pub handle: ImageHandle,
    pub image: SampledImage,
    pub encoding: OutputEncoding,
    pub import: ImportOptions,
}

impl PackedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Per-output-channel pixel program.
#[derive(Clone, Copy, Debug)]
struct Lane {
    selector: CompiledSelector,
    remap: RemapRange,
}

impl Lane {
    #[inline]
    fn eval(self, px: [f32; 4]) -> f32 {
        self.remap.apply(self.selector.apply(px))
    }
}

/// Packs four channel sources into one image and persists it.
///
/// A compositor is cheap to clone and shares its resolver (and so its fallback cache) across
/// clones.
#[derive(Clone, Debug)]
pub struct Compositor {
    resolver: Arc<ChannelSourceResolver>,
    opts: CompositorOpts,
}

impl Compositor {
    pub fn new(resolver: Arc<ChannelSourceResolver>, opts: CompositorOpts) -> Self {
        Self { resolver, opts }
    }

    pub fn resolver(&self) -> &ChannelSourceResolver {
        &self.resolver
    }

    pub fn opts(&self) -> &CompositorOpts {
        &self.opts
    }

    /// Combine, encode and persist `req` through `sink`.
    ///
    /// Configuration is validated before any source is decoded or any byte is written. On a
    /// persistence error the destination is deleted (best effort). Transient raw duplicates are
    /// released on every path.
    #[tracing::instrument(skip(self, req, sink), fields(dest = %req.destination))]
    pub fn combine(
        &self,
        req: &CombineRequest,
        sink: &mut dyn PersistenceSink,
    ) -> CombineResult<PackedImage> {
        let lanes = compile_lanes(req)?;
        let encoding = OutputEncoding::from_path(&req.destination)?;
        let destination = normalize_rel_path(&req.destination)?;

        let resolved = req
            .slots
            .iter()
            .map(|slot| self.resolver.resolve(&slot.source))
            .collect::<CombineResult<Vec<_>>>()?;
        let out = negotiate_resolution(resolved.iter().map(ResolvedSource::resolution));
        tracing::debug!(width = out.width, height = out.height, "negotiated output size");

        let texels = {
            let mut raw = RawSet::new(&self.resolver);
            let mut samplers = Vec::with_capacity(4);
            for src in &resolved {
                samplers.push(SourceSampler::new(raw.acquire(src)?, out, req.filter));
            }
            tracing::debug!(duplicates = raw.duplicate_count(), "raw sources ready");
            self.assemble(out, &samplers, &lanes)?
        };

        let bytes = encoding.encode(out, &texels)?;
        let import = encoding.import_options();
        let managed = persist(sink, &destination, &bytes, import, out)?;

        tracing::info!(
            path = %destination,
            width = out.width,
            height = out.height,
            bytes = bytes.len(),
            "wrote packed image"
        );
        Ok(PackedImage {
            handle: managed.handle,
            image: managed.image,
            encoding,
            import: managed.import,
        })
    }

    fn assemble(
        &self,
        out: Resolution,
        samplers: &[SourceSampler],
        lanes: &[Lane],
    ) -> CombineResult<Vec<[f32; 4]>> {
        let mut texels = vec![[0.0f32; 4]; out.pixel_count()];
        let row_len = out.width as usize;

        if !self.opts.parallel {
            for (y, row) in texels.chunks_mut(row_len).enumerate() {
                fill_row(y as u32, row, samplers, lanes);
            }
            return Ok(texels);
        }

        let pool = build_thread_pool(self.opts.threads)?;
        pool.install(|| {
            texels
                .par_chunks_mut(row_len)
                .enumerate()
                .for_each(|(y, row)| fill_row(y as u32, row, samplers, lanes));
        });
        Ok(texels)
    }
}

fn compile_lanes(req: &CombineRequest) -> CombineResult<Vec<Lane>> {
    let mut lanes = Vec::with_capacity(4);
    for ch in OutputChannel::ALL {
        let i = ch.index();
        let selector = req.slots[i].selector.compile().map_err(|e| match e {
            CombineError::InvalidChannelSelector(msg) => {
                CombineError::invalid_selector(format!("{ch:?} channel: {msg}"))
            }
            other => other,
        })?;
        let remap = req.remaps[i];
        remap.validate().map_err(|e| match e {
            CombineError::DegenerateRemapRange(msg) => {
                CombineError::degenerate_remap(format!("{ch:?} channel: {msg}"))
            }
            other => other,
        })?;
        lanes.push(Lane { selector, remap });
    }
    Ok(lanes)
}

#[inline]
fn fill_row(y: u32, row: &mut [[f32; 4]], samplers: &[SourceSampler], lanes: &[Lane]) {
    for (x, px) in row.iter_mut().enumerate() {
        let x = x as u32;
        for (c, lane) in lanes.iter().enumerate() {
            px[c] = lane.eval(samplers[c].sample(x, y));
        }
    }
}

fn persist(
    sink: &mut dyn PersistenceSink,
    path: &str,
    bytes: &[u8],
    import: ImportOptions,
    expected: Resolution,
) -> CombineResult<ManagedImage> {
    match write_import_read(sink, path, bytes, import, expected) {
        Ok(managed) => Ok(managed),
        Err(err) => {
            if let Err(cleanup) = sink.delete_asset(path) {
                tracing::warn!(path, error = %cleanup, "failed to remove partial output");
            }
            Err(match err {
                e @ CombineError::PersistenceFailure(_) => e,
                other => CombineError::persistence(other.to_string()),
            })
        }
    }
}

fn write_import_read(
    sink: &mut dyn PersistenceSink,
    path: &str,
    bytes: &[u8],
    import: ImportOptions,
    expected: Resolution,
) -> CombineResult<ManagedImage> {
    sink.write_bytes(path, bytes)?;
    sink.import_as_image(path, import)?;
    let managed = sink.read_image(path)?;
    if managed.image.resolution() != expected {
        return Err(CombineError::persistence(format!(
            "read back {}x{} from '{path}', expected {}x{}",
            managed.image.width(),
            managed.image.height(),
            expected.width,
            expected.height
        )));
    }
    Ok(managed)
}

fn build_thread_pool(threads: Option<usize>) -> CombineResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(CombineError::validation(
            "compositor 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build rayon thread pool: {e}").into())
}

#[cfg(test)]
#[path = "../../tests/unit/combine/compositor.rs"]
mod tests;
