//! Error types for data validation in cgm-types.

use thiserror::Error;

/// Errors that can occur when validating or parsing CGM data.
///
/// This error type is platform-agnostic and does not include
/// session errors (those belong in cgm-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A required text field was empty or whitespace.
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    /// A string did not name any variant of the target enum.
    #[error("Unknown {kind}: '{value}'")]
    UnknownVariant {
        /// Name of the type being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}

impl ValidationError {
    /// Create an unknown-variant error.
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.into(),
        }
    }
}

/// Result type alias using cgm-types' ValidationError type.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
