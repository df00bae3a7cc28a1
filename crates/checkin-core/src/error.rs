//! Domain error type.

use thiserror::Error;

/// Errors raised by domain validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A stored question kind that is neither `scale` nor `text`.
    #[error("unknown question kind: {0}")]
    UnknownQuestionKind(String),

    /// A text field exceeded its column length.
    #[error("{field} is longer than {max} characters")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum length in characters.
        max: usize,
    },

    /// A required text field was blank.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// The password hasher rejected its input or parameters.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}
