//! Foundation types for cask.
//!
//! The central type is [`Address`]: the content-derived identifier under
//! which an object is stored. An address wraps a fixed-length cryptographic
//! digest and exposes its canonical lowercase hexadecimal form. Addresses
//! are the *only* external identifier objects have; no filename, timestamp,
//! or size is ever authoritative.

pub mod address;
pub mod error;

// Re-export primary types at crate root for ergonomic imports.
pub use address::{Address, DIGEST_LEN, HEX_LEN};
pub use error::AddressParseError;
