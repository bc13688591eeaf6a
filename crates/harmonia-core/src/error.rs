//! Error types shared by the harmonia crates.

use thiserror::Error;

/// Errors raised by the core transforms.
///
/// None of these are retryable: they describe input that the transform
/// cannot work with, so callers are expected to fix the input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The buffer layout is not supported by the transform (e.g. stereo
    /// input to a mono-only transform).
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A note name or pitch number could not be resolved.
    #[error("unknown note: {0}")]
    UnknownNote(String),

    /// A precondition on a parameter does not hold.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Convenience result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
