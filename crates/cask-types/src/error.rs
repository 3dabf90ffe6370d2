use thiserror::Error;

/// Errors produced when parsing an [`Address`](crate::Address) from its
/// textual form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid digest length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
