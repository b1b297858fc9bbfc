//! Legacy material conversion, the compositor's main caller.

/// Multi-material runs with per-material outcomes.
pub mod batch;
/// Material property records and legacy shader families.
pub mod material;
/// Standard-to-HDRP upgrade rules.
pub mod upgrader;
