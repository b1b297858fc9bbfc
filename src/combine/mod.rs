//! Channel packing: selectors, remaps, size negotiation, sampling and the compositor itself.

/// Compositor and request types.
pub mod compositor;
/// JSON request files.
pub mod config;
/// Linear input ranges.
pub mod remap;
/// Resampling to the output size.
pub mod sample;
/// Channel selection codes.
pub mod selector;
/// Output size negotiation.
pub mod sizing;
