//! Content-addressed block storage backends.
//!
//! A block is an immutable byte string named by its BLAKE3 hash; the
//! hash is both the lookup key and the integrity proof, so a block that
//! exists never needs revalidation or expiry. On disk, blocks live
//! under the node's state directory, fanned out by hash prefix:
//!   {state_dir}/blocks/{hash[0..2]}/{full_hash}
//!
//! Backends expose two capabilities as separate traits: [`Lifecycle`]
//! (one-time setup against a state directory) and [`BlockStore`]
//! (put/get/has). [`Backend`] composes the two explicitly and is built
//! by name, so the host picks `disk` or `memory` from config.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use dashmap::DashMap;
use memmap2::Mmap;
use thiserror::Error;

/// Errors from backend construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("no backend named `{0}`")]
    NoSuchBackend(String),
}

// ── Capability traits ───────────────────────────────────────────────────

/// One-time setup against a state directory.
///
/// `init` must be idempotent: running it against an already-initialized
/// directory is a no-op, never an error.
pub trait Lifecycle: Send + Sync {
    fn init(&self, path: &Path) -> Result<()>;
}

/// Content-addressed block storage.
///
/// Blocks are keyed by the BLAKE3 hash of their contents. `put` returns
/// the hash it stored under; storing the same bytes twice is a no-op.
pub trait BlockStore: Send + Sync {
    fn put(&self, data: &[u8]) -> Result<[u8; 32]>;
    fn get(&self, hash: &[u8; 32]) -> Result<Option<Bytes>>;
    fn has(&self, hash: &[u8; 32]) -> bool;
}

// ── Disk backend ────────────────────────────────────────────────────────

/// Disk-backed block store rooted at `{state_dir}/blocks` when built
/// through [`Backend::by_name`]; tests point the root at a scratch dir.
#[derive(Clone)]
pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Filesystem path for a block. Two-level: blocks/ab/abc123...
    fn block_path(&self, hash: &[u8; 32]) -> PathBuf {
        let hex = hex::encode(hash);
        self.root.join(&hex[0..2]).join(&hex)
    }

    /// Count total blocks (for stats/debugging).
    pub fn count(&self) -> usize {
        let mut total = 0;
        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                if let Ok(subdir) = fs::read_dir(entry.path()) {
                    total += subdir.count();
                }
            }
        }
        total
    }
}

impl Lifecycle for DiskBackend {
    fn init(&self, _path: &Path) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create block root: {}", self.root.display()))?;
        tracing::debug!(root = %self.root.display(), "disk backend initialized");
        Ok(())
    }
}

impl BlockStore for DiskBackend {
    /// Store a block under its hash. The write goes to a temp file
    /// first and lands with a rename, so a crash mid-write never leaves
    /// a half-block at the final path. Re-storing existing content is a
    /// no-op.
    fn put(&self, data: &[u8]) -> Result<[u8; 32]> {
        let hash: [u8; 32] = blake3::hash(data).into();
        let path = self.block_path(&hash);

        if path.exists() {
            return Ok(hash);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create block dir: {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp_path)
                .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;
            file.write_all(data).context("failed to write block data")?;
            file.sync_all().context("failed to sync block to disk")?;
        }

        fs::rename(&tmp_path, &path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        tracing::trace!(hash = hex::encode(hash), "block stored");
        Ok(hash)
    }

    /// Retrieve a block, or `None` if it was never stored. Reads map
    /// the file instead of buffering it, so large blocks fault in
    /// lazily through the page cache.
    fn get(&self, hash: &[u8; 32]) -> Result<Option<Bytes>> {
        let path = self.block_path(hash);
        if !path.exists() {
            return Ok(None);
        }

        let file = fs::File::open(&path)
            .with_context(|| format!("failed to open block: {}", path.display()))?;

        // Safety: read-only mapping of a file nothing mutates after
        // the rename in put.
        let mmap = unsafe {
            Mmap::map(&file).with_context(|| format!("failed to mmap block: {}", path.display()))?
        };

        Ok(Some(Bytes::copy_from_slice(&mmap)))
    }

    fn has(&self, hash: &[u8; 32]) -> bool {
        self.block_path(hash).exists()
    }
}

// ── Memory backend ──────────────────────────────────────────────────────

/// In-memory block store. Init is a no-op; contents vanish on drop.
#[derive(Default)]
pub struct MemoryBackend {
    blocks: DashMap<[u8; 32], Bytes>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.blocks.len()
    }
}

impl Lifecycle for MemoryBackend {
    fn init(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

impl BlockStore for MemoryBackend {
    fn put(&self, data: &[u8]) -> Result<[u8; 32]> {
        let hash: [u8; 32] = blake3::hash(data).into();
        self.blocks
            .entry(hash)
            .or_insert_with(|| Bytes::copy_from_slice(data));
        Ok(hash)
    }

    fn get(&self, hash: &[u8; 32]) -> Result<Option<Bytes>> {
        Ok(self.blocks.get(hash).map(|b| b.clone()))
    }

    fn has(&self, hash: &[u8; 32]) -> bool {
        self.blocks.contains_key(hash)
    }
}

// ── Composition and by-name construction ────────────────────────────────

/// A backend is a block store plus a lifecycle, composed explicitly.
/// Both capabilities usually come from the same object, but they don't
/// have to.
#[derive(Clone)]
pub struct Backend {
    name: &'static str,
    blocks: Arc<dyn BlockStore>,
    lifecycle: Arc<dyn Lifecycle>,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Backend {
    pub fn disk(root: impl Into<PathBuf>) -> Self {
        let disk = Arc::new(DiskBackend::new(root));
        Self {
            name: "disk",
            blocks: disk.clone(),
            lifecycle: disk,
        }
    }

    pub fn memory() -> Self {
        let mem = Arc::new(MemoryBackend::new());
        Self {
            name: "memory",
            blocks: mem.clone(),
            lifecycle: mem,
        }
    }

    /// Construct a backend by its configured name.
    ///
    /// The disk backend stores blocks under `{state_dir}/blocks`.
    pub fn by_name(name: &str, state_dir: &Path) -> Result<Self, BackendError> {
        match name {
            "disk" => Ok(Self::disk(state_dir.join("blocks"))),
            "memory" => Ok(Self::memory()),
            other => Err(BackendError::NoSuchBackend(other.to_string())),
        }
    }

    /// Construct a backend by name and run its lifecycle init.
    pub fn init_by_name(name: &str, state_dir: &Path) -> Result<Self> {
        let backend = Self::by_name(name, state_dir)?;
        backend.init(state_dir)?;
        Ok(backend)
    }

    pub fn is_valid_name(name: &str) -> bool {
        matches!(name, "disk" | "memory")
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn init(&self, path: &Path) -> Result<()> {
        self.lifecycle.init(path)
    }

    pub fn put(&self, data: &[u8]) -> Result<[u8; 32]> {
        self.blocks.put(data)
    }

    pub fn get(&self, hash: &[u8; 32]) -> Result<Option<Bytes>> {
        self.blocks.get(hash)
    }

    pub fn has(&self, hash: &[u8; 32]) -> bool {
        self.blocks.has(hash)
    }
}
