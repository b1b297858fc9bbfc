//! texcombine packs channels from up to four source textures into one image.
//!
//! Each output channel (R, G, B, A) reads one channel (or the luminance) of its own source,
//! optionally inverted and linearly remapped. Sources are resampled to a negotiated common size,
//! assembled on the CPU, encoded (PNG, JPEG or EXR) and persisted through a [`PersistenceSink`].
//!
//! - Describe sources with [`SourceDescriptor`] and build a [`CombineRequest`]
//! - Run it through a [`Compositor`] backed by a [`ChannelSourceResolver`]
//! - Or convert whole legacy materials with [`MaterialUpgrader`]
#![forbid(unsafe_code)]

mod assets;
mod foundation;
mod resolve;

/// Channel packing.
pub mod combine;
/// Output encodings and persistence sinks.
pub mod encode;
/// Legacy material migration.
pub mod migrate;

pub use crate::foundation::core::{ColorKey, Resolution, Rgba, SampledImage};
pub use crate::foundation::error::{CombineError, CombineResult};

pub use crate::assets::color::ColorDef;
pub use crate::assets::decode::{
    decode_image, decode_image_file, probe_dimensions, probe_has_alpha,
};
pub use crate::assets::path::{normalize_rel_path, output_path_for};

pub use crate::resolve::resolver::{
    ChannelSourceResolver, RawStats, ResolvedSource, SourceDescriptor,
};

pub use crate::combine::compositor::{
    ChannelSlot, CombineRequest, Compositor, CompositorOpts, OutputChannel, PackedImage,
};
pub use crate::combine::config::{CombineSpec, SlotSpec, SourceSpec};
pub use crate::combine::remap::RemapRange;
pub use crate::combine::sample::SampleFilter;
pub use crate::combine::selector::{ChannelSelector, Extraction};
pub use crate::combine::sizing::{PLACEHOLDER_MAX_DIM, negotiate_resolution};

pub use crate::encode::format::{DEFAULT_JPEG_QUALITY, OutputEncoding};
pub use crate::encode::fs::FsSink;
pub use crate::encode::sink::{
    ImageHandle, ImportOptions, InMemorySink, ManagedImage, PersistenceSink, PlatformFormat, SinkOp,
};

pub use crate::migrate::batch::{
    BatchReport, FailurePolicy, JobOutcome, JobReport, MaterialJob, find_material_files,
    write_material,
};
pub use crate::migrate::material::{LegacyShader, MaterialRecord, TextureTransform};
pub use crate::migrate::upgrader::{MaterialUpgrader, TARGET_SHADER};
