use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::backend::{Backend, BlobWrite, DirEntry, EntryKind};

/// In-memory, HashMap-based backend.
///
/// Intended for tests and embedding. The whole tree is held behind a
/// `RwLock`; clones share the same tree, so a test can keep a handle for
/// inspection while the store owns another. Rename is trivially atomic
/// (a single map operation under the write lock).
#[derive(Clone)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

struct Shared {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
}

impl MemoryBackend {
    /// Create an empty backend containing only the root directory.
    pub fn new() -> Self {
        let mut state = State::default();
        state.dirs.insert(PathBuf::new());
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(state),
            }),
        }
    }

    /// Number of files currently stored.
    pub fn file_count(&self) -> usize {
        self.shared.state.read().expect("lock poisoned").files.len()
    }

    /// Sorted list of all file paths in the tree.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let state = self.shared.state.read().expect("lock poisoned");
        let mut paths: Vec<PathBuf> = state.files.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Raw contents of a file, if present.
    pub fn file_contents(&self, path: &Path) -> Option<Vec<u8>> {
        let state = self.shared.state.read().expect("lock poisoned");
        state.files.get(path).cloned()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such path: {}", path.display()),
    )
}

/// Writer that buffers locally and publishes into the shared tree on
/// [`sync`](BlobWrite::sync) or drop, mirroring how bytes written to a real
/// file become visible without an explicit flush.
struct MemoryFile {
    path: PathBuf,
    buf: Vec<u8>,
    shared: Arc<Shared>,
}

impl MemoryFile {
    fn commit(&mut self) {
        let mut state = self.shared.state.write().expect("lock poisoned");
        state.files.insert(self.path.clone(), self.buf.clone());
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit();
        Ok(())
    }
}

impl BlobWrite for MemoryFile {
    fn sync(&mut self) -> io::Result<()> {
        self.commit();
        Ok(())
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        self.commit();
    }
}

impl Backend for MemoryBackend {
    fn create(&self, path: &Path) -> io::Result<Box<dyn BlobWrite>> {
        let mut state = self.shared.state.write().expect("lock poisoned");
        let parent = path.parent().unwrap_or(Path::new(""));
        if !state.dirs.contains(parent) {
            return Err(not_found(parent));
        }
        if state.files.contains_key(path) || state.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("path already exists: {}", path.display()),
            ));
        }
        state.files.insert(path.to_path_buf(), Vec::new());
        drop(state);

        Ok(Box::new(MemoryFile {
            path: path.to_path_buf(),
            buf: Vec::new(),
            shared: Arc::clone(&self.shared),
        }))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let state = self.shared.state.read().expect("lock poisoned");
        let data = state.files.get(path).ok_or_else(|| not_found(path))?;
        Ok(Box::new(Cursor::new(data.clone())))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.shared.state.write().expect("lock poisoned");
        let data = state.files.remove(from).ok_or_else(|| not_found(from))?;
        let parent = to.parent().unwrap_or(Path::new(""));
        if !state.dirs.contains(parent) {
            // Rename failed; the source must stay intact.
            state.files.insert(from.to_path_buf(), data);
            return Err(not_found(parent));
        }
        state.files.insert(to.to_path_buf(), data);
        Ok(())
    }

    fn make_dirs(&self, path: &Path) -> io::Result<()> {
        let mut state = self.shared.state.write().expect("lock poisoned");
        let mut current = PathBuf::new();
        state.dirs.insert(current.clone());
        for component in path.components() {
            current.push(component);
            if state.files.contains_key(&current) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("a file exists at {}", current.display()),
                ));
            }
            state.dirs.insert(current.clone());
        }
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let state = self.shared.state.read().expect("lock poisoned");
        if !state.dirs.contains(path) {
            return Err(not_found(path));
        }

        let mut entries = Vec::new();
        for (file, data) in &state.files {
            if file.parent() == Some(path) {
                if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
                    entries.push(DirEntry {
                        name: name.to_string(),
                        kind: EntryKind::File,
                        len: data.len() as u64,
                    });
                }
            }
        }
        for dir in &state.dirs {
            if dir.as_path() != path && dir.parent() == Some(path) {
                if let Some(name) = dir.file_name().and_then(|n| n.to_str()) {
                    entries.push(DirEntry {
                        name: name.to_string(),
                        kind: EntryKind::Dir,
                        len: 0,
                    });
                }
            }
        }
        Ok(entries)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut state = self.shared.state.write().expect("lock poisoned");
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn remove_empty_dir(&self, path: &Path) -> io::Result<()> {
        let mut state = self.shared.state.write().expect("lock poisoned");
        if !state.dirs.contains(path) {
            return Err(not_found(path));
        }
        let occupied = state.files.keys().any(|f| f.parent() == Some(path))
            || state
                .dirs
                .iter()
                .any(|d| d.as_path() != path && d.parent() == Some(path));
        if occupied {
            return Err(io::Error::other(format!(
                "directory not empty: {}",
                path.display()
            )));
        }
        state.dirs.remove(path);
        Ok(())
    }

    fn is_file(&self, path: &Path) -> io::Result<bool> {
        let state = self.shared.state.read().expect("lock poisoned");
        Ok(state.files.contains_key(path))
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.read().expect("lock poisoned");
        f.debug_struct("MemoryBackend")
            .field("files", &state.files.len())
            .field("dirs", &state.dirs.len())
            .finish()
    }
}
