//! Durable run counter
//!
//! Expansion tokens embed a counter that must never repeat across runs on the
//! same host, otherwise a second run could hit caches warmed by the first.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::{BenchError, Result};

/// Counter value assumed when the store has never been written
pub const INITIAL_RUN_COUNTER: u64 = 1004;

/// Read/write access to a counter that survives process restarts
pub trait CounterStore: Send + Sync {
    fn read(&self) -> Result<Option<u64>>;
    fn write(&self, value: u64) -> Result<()>;
}

/// Read, increment and persist the counter, returning the new value.
///
/// # Example
///
/// ```
/// use snippet_bench::counter::{next_run_counter, MemoryCounterStore};
///
/// let store = MemoryCounterStore::default();
/// assert_eq!(next_run_counter(&store).unwrap(), 1005);
/// assert_eq!(next_run_counter(&store).unwrap(), 1006);
/// ```
pub fn next_run_counter(store: &dyn CounterStore) -> Result<u64> {
    let current = store.read()?.unwrap_or(INITIAL_RUN_COUNTER);
    let next = current
        .checked_add(1)
        .ok_or_else(|| BenchError::Counter("run counter overflowed".to_string()))?;
    store.write(next)?;
    debug!(run_counter = next, "advanced run counter");
    Ok(next)
}

/// In-memory store, for tests and one-off runs
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    // Zero means "never written"; real values start above INITIAL_RUN_COUNTER.
    value: AtomicU64,
}

impl MemoryCounterStore {
    pub fn with_value(value: u64) -> Self {
        Self {
            value: AtomicU64::new(value),
        }
    }
}

impl CounterStore for MemoryCounterStore {
    fn read(&self) -> Result<Option<u64>> {
        match self.value.load(Ordering::Acquire) {
            0 => Ok(None),
            v => Ok(Some(v)),
        }
    }

    fn write(&self, value: u64) -> Result<()> {
        self.value.store(value, Ordering::Release);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CounterFile {
    no_cache_counter: u64,
}

/// Store backed by a small JSON file
#[derive(Debug, Clone)]
pub struct FileCounterStore {
    path: PathBuf,
}

impl FileCounterStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file each write is staged in before it replaces `path`
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CounterStore for FileCounterStore {
    fn read(&self) -> Result<Option<u64>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            BenchError::Counter(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let file: CounterFile = serde_json::from_str(&content).map_err(|e| {
            BenchError::Counter(format!("failed to parse {}: {}", self.path.display(), e))
        })?;
        Ok(Some(file.no_cache_counter))
    }

    fn write(&self, value: u64) -> Result<()> {
        let content = serde_json::to_string(&CounterFile {
            no_cache_counter: value,
        })
        .map_err(|e| BenchError::Counter(e.to_string()))?;

        // Stage then rename, so a crash mid-write never leaves a truncated
        // counter behind.
        let staging = self.staging_path();
        let staged = File::create(&staging).and_then(|mut file| {
            file.write_all(content.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = staged.and_then(|()| fs::rename(&staging, &self.path)) {
            let _ = fs::remove_file(&staging);
            return Err(BenchError::Counter(format!(
                "failed to write {}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }
}
