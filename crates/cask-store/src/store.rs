use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use cask_digest::{digest_reader, Digester, HashAlgorithm};
use cask_types::Address;

use crate::backend::{Backend, EntryKind};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::local::LocalBackend;
use crate::shard::{shard_path, unshard_path};

/// Read buffer size for teeing an input stream into the digester and the
/// staged file.
const CHUNK_SIZE: usize = 64 * 1024;

/// Content-addressable object store over an injected [`Backend`].
///
/// Objects have exactly two externally observable states, absent and
/// present. [`put`](Store::put) is the only absent-to-present transition and
/// [`delete`](Store::delete) the only present-to-absent one; the atomic
/// rename inside `put` is the sole publication point, so a partially
/// written object is never visible. All operations are safe to invoke from
/// concurrent threads, processes, or independent store instances pointed at
/// the same tree: correctness relies on rename atomicity alone, never on
/// locks.
///
/// Configuration is immutable for the life of the store (and of the tree:
/// two instances sharing a root must share a configuration).
pub struct Store {
    backend: Arc<dyn Backend>,
    config: StoreConfig,
    temp_dir: PathBuf,
}

impl Store {
    /// Open a store over the given backend.
    ///
    /// Validates the configuration, creates the staging area, and sweeps
    /// any staging files orphaned by earlier interrupted writes.
    pub fn open(backend: Arc<dyn Backend>, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let temp_dir = PathBuf::from(&config.temp_dir_name);
        backend
            .make_dirs(&temp_dir)
            .map_err(StoreError::write_failure("creating staging area"))?;

        let store = Self {
            backend,
            config,
            temp_dir,
        };
        store.sweep_temp();
        Ok(store)
    }

    /// Open a store on the local filesystem rooted at `root`.
    pub fn open_local(root: impl Into<PathBuf>, config: StoreConfig) -> StoreResult<Self> {
        let backend = LocalBackend::new(root.into())
            .map_err(StoreError::write_failure("opening store root"))?;
        Self::open(Arc::new(backend), config)
    }

    /// The store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The hash algorithm addresses are derived with.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.config.algorithm
    }

    /// Store the contents of a reader and return its address.
    ///
    /// The stream is read exactly once, simultaneously hashed and spooled
    /// to a uniquely named staging file, then installed at its shard path
    /// with an atomic rename. If an object with the same address already
    /// exists the staged copy is discarded and the call still succeeds:
    /// `put` is idempotent, and racing `put`s of identical content are
    /// harmless because the install step is atomic and order-independent.
    ///
    /// On failure nothing is ever visible at the shard path; the staging
    /// file is removed best-effort (the open-time sweep catches leftovers).
    pub fn put<R: Read>(&self, reader: R) -> StoreResult<Address> {
        let staged = self
            .temp_dir
            .join(format!("put-{}.tmp", Uuid::new_v4().simple()));
        match self.stage_and_install(reader, &staged) {
            Ok(address) => Ok(address),
            Err(e) => {
                let _ = self.backend.remove_file(&staged);
                Err(e)
            }
        }
    }

    /// Store an in-memory byte slice. Convenience over [`put`](Store::put).
    pub fn put_bytes(&self, data: &[u8]) -> StoreResult<Address> {
        self.put(data)
    }

    fn stage_and_install<R: Read>(&self, mut reader: R, staged: &Path) -> StoreResult<Address> {
        let mut digester = Digester::new(self.config.algorithm);
        let mut writer = self
            .backend
            .create(staged)
            .map_err(StoreError::write_failure("staging object"))?;

        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = reader
                .read(&mut buf)
                .map_err(StoreError::write_failure("reading input stream"))?;
            if n == 0 {
                break;
            }
            digester.update(&buf[..n]);
            writer
                .write_all(&buf[..n])
                .map_err(StoreError::write_failure("staging object"))?;
        }
        writer
            .sync()
            .map_err(StoreError::write_failure("syncing staged object"))?;
        drop(writer);

        let address = digester.finalize();
        let path = self.object_path(&address)?;

        if self.backend.is_file(&path)? {
            // Content-addressing guarantees the existing object is
            // byte-identical; the staged copy is redundant.
            let _ = self.backend.remove_file(staged);
            debug!(address = %address.short_hex(), "duplicate content, staged copy discarded");
            return Ok(address);
        }

        if let Some(parent) = path.parent() {
            self.backend
                .make_dirs(parent)
                .map_err(StoreError::write_failure("creating shard directory"))?;
        }
        self.backend
            .rename(staged, &path)
            .map_err(StoreError::write_failure("installing object"))?;

        debug!(address = %address.short_hex(), path = %path.display(), "object installed");
        Ok(address)
    }

    /// Open the object at `address` for streaming read.
    ///
    /// The returned reader supports read-to-exhaustion without the object
    /// being memory-resident.
    pub fn get(&self, address: &Address) -> StoreResult<Box<dyn Read + Send>> {
        let path = self.object_path(address)?;
        match self.backend.open(&path) {
            Ok(reader) => Ok(reader),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(*address)),
            Err(e) => Err(StoreError::StorageUnavailable(e)),
        }
    }

    /// Whether an object is stored under `address`.
    pub fn exists(&self, address: &Address) -> StoreResult<bool> {
        let path = self.object_path(address)?;
        Ok(self.backend.is_file(&path)?)
    }

    /// Remove the object at `address`, then prune now-empty shard
    /// directories upward toward the root.
    ///
    /// Idempotent: deleting an absent object succeeds. Pruning is a
    /// sequence of individually atomic remove-if-empty attempts and stops
    /// silently at the first directory that is non-empty, vanished, or
    /// being repopulated by a racing `put`.
    pub fn delete(&self, address: &Address) -> StoreResult<()> {
        let path = self.object_path(address)?;
        match self.backend.remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::StorageUnavailable(e)),
        }
        debug!(address = %address.short_hex(), "object deleted");
        self.prune_upward(path.parent());
        Ok(())
    }

    /// Lazily walk the shard tree and yield every stored address.
    ///
    /// The staging area is skipped, and entries that do not decode as
    /// addresses (foreign files placed in the tree) are skipped rather
    /// than aborting the walk. One-shot: a repeat call re-walks and may
    /// observe a different live set under concurrent mutation; no
    /// snapshot isolation is provided.
    pub fn list(&self) -> Addresses<'_> {
        Addresses { walk: self.walk() }
    }

    /// Number of stored objects. Walk-based, so O(store size).
    pub fn count(&self) -> StoreResult<usize> {
        let mut n = 0;
        for address in self.list() {
            address?;
            n += 1;
        }
        Ok(n)
    }

    /// Total size in bytes of all stored objects. Walk-based.
    pub fn size(&self) -> StoreResult<u64> {
        let mut total = 0;
        for entry in self.walk() {
            let (path, len) = entry?;
            if self.decode(&path).is_ok() {
                total += len;
            }
        }
        Ok(total)
    }

    /// Re-hash every stored file and report the ones whose content does
    /// not match the address their path encodes.
    ///
    /// Foreign files are included: any file in the shard tree whose bytes
    /// hash somewhere other than its location is misplaced.
    pub fn verify(&self) -> StoreResult<Vec<CorruptEntry>> {
        let mut corrupt = Vec::new();
        for entry in self.walk() {
            let (path, _len) = entry?;
            let reader = match self.backend.open(&path) {
                Ok(reader) => reader,
                // Raced with a delete; the file is simply gone.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::StorageUnavailable(e)),
            };
            let address = digest_reader(self.config.algorithm, reader)
                .map_err(StoreError::StorageUnavailable)?;
            if self.object_path(&address)? != path {
                corrupt.push(CorruptEntry { path, address });
            }
        }
        Ok(corrupt)
    }

    /// Relocate every misplaced file found by [`verify`](Store::verify) to
    /// the shard path its content dictates, deleting it instead when the
    /// correctly placed object already exists. Returns the repaired
    /// entries.
    pub fn repair(&self) -> StoreResult<Vec<CorruptEntry>> {
        let corrupt = self.verify()?;
        for entry in &corrupt {
            let target = self.object_path(&entry.address)?;
            if self.backend.is_file(&target)? {
                match self.backend.remove_file(&entry.path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(StoreError::StorageUnavailable(e)),
                }
            } else {
                if let Some(parent) = target.parent() {
                    self.backend
                        .make_dirs(parent)
                        .map_err(StoreError::write_failure("creating shard directory"))?;
                }
                self.backend
                    .rename(&entry.path, &target)
                    .map_err(StoreError::write_failure("relocating object"))?;
            }
            warn!(
                path = %entry.path.display(),
                address = %entry.address.short_hex(),
                "repaired misplaced object"
            );
            self.prune_upward(entry.path.parent());
        }
        Ok(corrupt)
    }

    /// Remove orphaned files from the staging area. Best-effort: returns
    /// the number removed and never fails.
    ///
    /// Runs automatically when a store is opened. Assumes no other writer
    /// is mid-`put` against the same tree at that moment; a racing `put`
    /// whose staging file is swept fails cleanly with `WriteFailure` and
    /// installs nothing.
    pub fn sweep_temp(&self) -> usize {
        let entries = match self.backend.read_dir(&self.temp_dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };
        let mut removed = 0;
        for entry in entries {
            if entry.kind != EntryKind::File {
                continue;
            }
            let path = self.temp_dir.join(&entry.name);
            if self.backend.remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "swept orphaned staging files");
        }
        removed
    }

    fn object_path(&self, address: &Address) -> StoreResult<PathBuf> {
        shard_path(address, self.config.segment_count, self.config.segment_width)
    }

    fn decode(&self, path: &Path) -> StoreResult<Address> {
        unshard_path(path, self.config.segment_count, self.config.segment_width)
    }

    /// Remove-if-empty attempts from `start` toward (but not including)
    /// the store root, stopping at the first attempt that fails.
    fn prune_upward(&self, start: Option<&Path>) {
        let mut current = start;
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            if self.backend.remove_empty_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }

    fn walk(&self) -> Walk<'_> {
        Walk {
            store: self,
            dirs: vec![PathBuf::new()],
            files: Vec::new(),
            done: false,
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("config", &self.config).finish()
    }
}

/// A file in the shard tree whose content hashes somewhere other than its
/// location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorruptEntry {
    /// Where the bytes actually live, relative to the store root.
    pub path: PathBuf,
    /// The address derived from the bytes, which dictates where they belong.
    pub address: Address,
}

/// Depth-first walk over the regular files of the shard tree, skipping the
/// staging area. Yields `(relative path, size)` pairs.
struct Walk<'a> {
    store: &'a Store,
    dirs: Vec<PathBuf>,
    files: Vec<(PathBuf, u64)>,
    done: bool,
}

impl Iterator for Walk<'_> {
    type Item = StoreResult<(PathBuf, u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(file) = self.files.pop() {
                return Some(Ok(file));
            }
            let dir = self.dirs.pop()?;
            let is_root = dir.as_os_str().is_empty();
            match self.store.backend.read_dir(&dir) {
                Ok(entries) => {
                    for entry in entries {
                        let path = dir.join(&entry.name);
                        match entry.kind {
                            EntryKind::Dir => {
                                if is_root && entry.name == self.store.config.temp_dir_name {
                                    continue;
                                }
                                self.dirs.push(path);
                            }
                            EntryKind::File => self.files.push((path, entry.len)),
                        }
                    }
                }
                // A racing delete pruned this directory mid-walk.
                Err(e) if e.kind() == io::ErrorKind::NotFound && !is_root => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(StoreError::StorageUnavailable(e)));
                }
            }
        }
    }
}

/// Lazy sequence of stored addresses, produced by [`Store::list`].
pub struct Addresses<'a> {
    walk: Walk<'a>,
}

impl Iterator for Addresses<'_> {
    type Item = StoreResult<Address>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.walk.next()? {
                Ok((path, _len)) => match self.walk.store.decode(&path) {
                    Ok(address) => return Some(Ok(address)),
                    Err(_) => {
                        debug!(path = %path.display(), "skipping foreign entry during walk");
                    }
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
