/// Convenience result type used across texcombine.
pub type CombineResult<T> = Result<T, CombineError>;

/// Error taxonomy for resolving, combining and persisting packed textures.
///
/// Every variant is terminal for a single combine call. Callers decide whether to skip the asset,
/// abort a batch or report the failure.
#[derive(thiserror::Error, Debug)]
pub enum CombineError {
    /// A requested image source could not be located or decoded.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// A channel selector magnitude does not map to an extraction mode.
    #[error("invalid channel selector: {0}")]
    InvalidChannelSelector(String),

    /// A remap range has `min == max` (or a non-finite bound).
    #[error("degenerate remap range: {0}")]
    DegenerateRemapRange(String),

    /// The destination extension does not match any known encoder.
    #[error("encoding unsupported: {0}")]
    EncodingUnsupported(String),

    /// The persistence sink failed to write, import or read back the output.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// Malformed configuration, path or material data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CombineError {
    /// Build a [`CombineError::SourceUnavailable`] value.
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Build a [`CombineError::InvalidChannelSelector`] value.
    pub fn invalid_selector(msg: impl Into<String>) -> Self {
        Self::InvalidChannelSelector(msg.into())
    }

    /// Build a [`CombineError::DegenerateRemapRange`] value.
    pub fn degenerate_remap(msg: impl Into<String>) -> Self {
        Self::DegenerateRemapRange(msg.into())
    }

    /// Build a [`CombineError::EncodingUnsupported`] value.
    pub fn encoding_unsupported(msg: impl Into<String>) -> Self {
        Self::EncodingUnsupported(msg.into())
    }

    /// Build a [`CombineError::PersistenceFailure`] value.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::PersistenceFailure(msg.into())
    }

    /// Build a [`CombineError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
