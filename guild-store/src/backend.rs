//! Snapshot backends
//!
//! Where the snapshot lives. [`FileSnapshotBackend`] is the production
//! backend; [`MemorySnapshotBackend`] keeps the encoded snapshot in memory
//! and can be told to fail writes, which is what the store tests use.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::snapshot::Snapshot;

/// Storage for the encoded snapshot.
#[async_trait]
pub trait SnapshotBackend: Send + Sync + std::fmt::Debug {
    /// Read the stored snapshot, `None` if nothing has been stored yet.
    async fn load(&self) -> StoreResult<Option<Snapshot>>;

    /// Replace the stored snapshot.
    async fn save(&self, snapshot: &Snapshot) -> StoreResult<()>;

    /// Human-readable location, used in errors and logs.
    fn describe(&self) -> String;
}

/// JSON file backend with atomic replacement.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash mid-write never leaves a truncated snapshot behind.
#[derive(Debug, Clone)]
pub struct FileSnapshotBackend {
    path: PathBuf,
}

impl FileSnapshotBackend {
    /// Create a backend for `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "permissions.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotBackend for FileSnapshotBackend {
    async fn load(&self) -> StoreResult<Option<Snapshot>> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::load(self.describe(), e)),
        };
        Snapshot::from_json(&json).map(Some)
    }

    async fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let json = snapshot.to_json()?;
        let temp_path = self.temp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::persistence(self.describe(), e))?;
        }

        // Write to temp file first (atomic write pattern)
        fs::write(&temp_path, json.as_bytes())
            .await
            .map_err(|e| StoreError::persistence(self.describe(), e))?;

        // Rename to final path (atomic on most filesystems)
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StoreError::persistence(self.describe(), e))?;

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory backend.
///
/// Holds the last saved snapshot as JSON text so byte-level comparisons are
/// possible, counts successful writes, and can be switched to fail them.
#[derive(Debug, Default)]
pub struct MemorySnapshotBackend {
    stored: RwLock<Option<String>>,
    writes: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemorySnapshotBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that already holds `json`.
    pub fn with_json(json: impl Into<String>) -> Self {
        Self {
            stored: RwLock::new(Some(json.into())),
            ..Self::default()
        }
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// The stored JSON text, if any.
    pub async fn stored_json(&self) -> Option<String> {
        self.stored.read().await.clone()
    }
}

#[async_trait]
impl SnapshotBackend for MemorySnapshotBackend {
    async fn load(&self) -> StoreResult<Option<Snapshot>> {
        match self.stored.read().await.as_deref() {
            Some(json) => Snapshot::from_json(json).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::persistence(self.describe(), "writes disabled"));
        }
        let json = snapshot.to_json()?;
        *self.stored.write().await = Some(json);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
