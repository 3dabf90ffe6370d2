//! Digest engine for cask.
//!
//! Streams bytes through a configured cryptographic hash function and
//! produces an [`Address`](cask_types::Address). Hashing is incremental, so
//! input never needs to be memory-resident, and chunking-independent:
//! however the input is split, identical bytes yield identical digests.
//!
//! All hashing wraps established libraries; no custom cryptography.

pub mod algorithm;
pub mod digester;

pub use algorithm::{HashAlgorithm, UnknownAlgorithm};
pub use digester::{digest_bytes, digest_reader, Digester};
