use std::io::{self, Read, Write};
use std::path::Path;

/// Kind of a directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// A single entry returned by [`Backend::read_dir`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (a single path component, not a full path).
    pub name: String,
    /// Whether the entry is a regular file or a directory.
    pub kind: EntryKind,
    /// Size in bytes for files; zero for directories.
    pub len: u64,
}

/// Writer handle for a file being staged.
///
/// [`sync`](BlobWrite::sync) flushes application and backend buffers so the
/// staged bytes are durable before the file is published via rename.
pub trait BlobWrite: Write + Send {
    fn sync(&mut self) -> io::Result<()>;
}

/// Hierarchical storage capability consumed by the store.
///
/// All paths are relative to the backend's root. Implementations must
/// satisfy these invariants:
/// - `rename` is atomic within the tree: a concurrent reader observes either
///   the old state or the new state, never a partial file. This is the only
///   primitive the store's publication step relies on.
/// - `create` is exclusive: it fails if the path already exists, so two
///   writers can never interleave into one staged file.
/// - `remove_empty_dir` fails on a non-empty directory rather than removing
///   its contents.
/// - All I/O errors are propagated, never silently ignored; "not found" is
///   reported as `io::ErrorKind::NotFound` so the store can distinguish a
///   missing object from a backend malfunction.
pub trait Backend: Send + Sync {
    /// Create a file for writing. Exclusive: fails with `AlreadyExists` if
    /// the path is taken. The parent directory must already exist.
    fn create(&self, path: &Path) -> io::Result<Box<dyn BlobWrite>>;

    /// Open a file for streaming read.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Atomically rename `from` to `to`, replacing `to` if present.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create a directory and all missing ancestors. Succeeds if the
    /// directory already exists.
    fn make_dirs(&self, path: &Path) -> io::Result<()>;

    /// List the entries of a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Remove a file. Fails with `NotFound` if absent.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Remove a directory only if it is empty.
    fn remove_empty_dir(&self, path: &Path) -> io::Result<()>;

    /// Whether a regular file exists at the path.
    fn is_file(&self, path: &Path) -> io::Result<bool>;
}
