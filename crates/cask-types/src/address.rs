use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AddressParseError;

/// Length in bytes of a content digest. All supported hash algorithms are
/// 256-bit, so every address carries exactly this many bytes.
pub const DIGEST_LEN: usize = 32;

/// Length of the canonical hexadecimal form of an address.
pub const HEX_LEN: usize = 2 * DIGEST_LEN;

/// Content-derived address of a stored object.
///
/// An `Address` is the cryptographic digest of an object's byte content.
/// Identical content always produces the same `Address`, which is what makes
/// storage naturally deduplicating. Two addresses are equal iff their digests
/// are byte-equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; DIGEST_LEN]);

impl Address {
    /// Wrap a pre-computed digest.
    pub const fn from_digest(digest: [u8; DIGEST_LEN]) -> Self {
        Self(digest)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Canonical textual form: lowercase hex, no separators.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex form (first 8 characters), for logs and debug output.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from the canonical hexadecimal form.
    ///
    /// Uppercase hex digits are accepted on input; the canonical form
    /// produced by [`to_hex`](Self::to_hex) is always lowercase.
    pub fn from_hex(s: &str) -> Result<Self, AddressParseError> {
        let bytes = hex::decode(s).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        if bytes.len() != DIGEST_LEN {
            return Err(AddressParseError::InvalidLength {
                expected: DIGEST_LEN,
                actual: bytes.len(),
            });
        }
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&bytes);
        Ok(Self(digest))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; DIGEST_LEN]> for Address {
    fn from(digest: [u8; DIGEST_LEN]) -> Self {
        Self(digest)
    }
}

impl From<Address> for [u8; DIGEST_LEN] {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl std::str::FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
