//! Error types for xof-common.

use thiserror::Error;

/// Error raised when a textual identifier does not match its canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The input is not a well-formed GUID string.
    #[error("malformed GUID {input:?}: {reason}")]
    Malformed { input: String, reason: String },
}

impl FormatError {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using [`FormatError`].
pub type Result<T> = std::result::Result<T, FormatError>;
