use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hash algorithm used to derive content addresses.
///
/// Fixed per store instance at creation time: changing the algorithm changes
/// every address, so a store's algorithm must never vary over its lifetime.
/// Both supported algorithms produce 256-bit digests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256. The default.
    #[default]
    Sha256,
    /// BLAKE3, truncated to its default 256-bit output.
    Blake3,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

/// The given string does not name a supported hash algorithm.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown hash algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}
