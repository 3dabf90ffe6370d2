use std::io;

use cask_types::{Address, AddressParseError};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No object is stored under the given address.
    #[error("object not found: {0}")]
    NotFound(Address),

    /// Shard parameters are inconsistent with the digest length. Detected at
    /// store construction; a store never exists in an invalid configuration.
    #[error("invalid store configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// A path or string does not correspond to a valid address under the
    /// configured codec.
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    /// Staging, directory creation, or the final rename failed during a
    /// write. The staged temporary file never becomes visible at a shard
    /// path when this is returned.
    #[error("write failed while {context}")]
    WriteFailure {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// Backend I/O failure on a read-side operation, not attributable to a
    /// missing object. Distinguishes "backend malfunction" from `NotFound`
    /// so callers can decide whether a retry makes sense.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] io::Error),
}

impl StoreError {
    pub(crate) fn write_failure(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::WriteFailure { context, source }
    }
}

impl From<AddressParseError> for StoreError {
    fn from(err: AddressParseError) -> Self {
        Self::MalformedAddress(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
