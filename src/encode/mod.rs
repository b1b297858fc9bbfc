//! Output encodings and the persistence sinks packed images are written through.

/// Encoder selection and pixel encoding.
pub mod format;
/// Filesystem sink.
pub mod fs;
/// Sink contract and the in-memory sink.
pub mod sink;
