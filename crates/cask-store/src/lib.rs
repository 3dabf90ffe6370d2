//! Content-addressable object store.
//!
//! Byte streams go in; a content-derived [`Address`] comes back. Each unique
//! content is persisted exactly once, as a file under a sharded relative
//! path computed from its digest:
//!
//! ```text
//! <store root>/
//!   tmp/            reserved staging area (never a shard: "tmp" is not hex)
//!   9f/
//!     86/
//!       d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
//! ```
//!
//! # Storage backends
//!
//! The store talks to storage through the [`Backend`] capability trait:
//!
//! - [`LocalBackend`] -- `std::fs`-backed tree rooted at a directory
//! - [`MemoryBackend`] -- `HashMap`-based tree for tests and embedding
//!
//! # Design rules
//!
//! 1. Objects are immutable once written; content-addressing guarantees it.
//! 2. Stage-then-rename: input is spooled to a private staging file while
//!    being hashed, then installed with one atomic rename. The rename is the
//!    sole publication point; no partially written object is ever visible.
//! 3. `put` and `delete` treat "already in the desired state" as success,
//!    not error. Idempotence is part of the contract.
//! 4. Concurrent callers need no locks: racing `put`s of the same content
//!    converge on one object, and each operation is individually atomic.
//! 5. The store owns the tree under its root but never interprets object
//!    contents. It is a pure key-value store keyed by digest.
//! 6. All I/O errors are propagated, never silently ignored, and carry
//!    enough kind information to tell "object missing" from "backend
//!    malfunction".

pub mod backend;
pub mod config;
pub mod error;
pub mod local;
pub mod memory;
pub mod shard;
pub mod store;

// Re-export primary types at crate root for ergonomic imports.
pub use backend::{Backend, BlobWrite, DirEntry, EntryKind};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use store::{Addresses, CorruptEntry, Store};

// The identifier types callers handle day to day.
pub use cask_digest::HashAlgorithm;
pub use cask_types::Address;
