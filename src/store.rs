//! Counter store: where computed snapshots live between reads.
//!
//! Consumers never talk to a global cache; a `CounterStore` handle is
//! injected into the engine. Two backings are provided: a plain in-memory
//! map and a JSON file written out at batch boundaries.

use crate::scope::ScopeId;
use crate::snapshot::StatsSnapshot;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

/// Cache state of one scope instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotState {
    /// Never computed, or removed after the entity was deleted
    Uninitialized,
    /// Stored and current
    Valid,
    /// Stored but invalidated; the next read recomputes it
    Stale,
}

/// Persistent home of per-scope snapshots.
///
/// Implementations must give read-after-write consistency per scope id.
pub trait CounterStore: Send + Sync {
    /// The last computed snapshot, or `None` if never computed or invalidated.
    fn get(&self, scope: &ScopeId) -> Option<StatsSnapshot>;

    /// Overwrite the stored snapshot.
    fn put(&self, scope: &ScopeId, snapshot: StatsSnapshot);

    /// Mark the snapshot stale so the next `get` misses.
    fn invalidate(&self, scope: &ScopeId);

    /// Drop the entry entirely (the entity is gone).
    fn remove(&self, scope: &ScopeId);

    fn state(&self, scope: &ScopeId) -> SnapshotState;

    /// Write buffered changes to durable storage.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot {
    snapshot: StatsSnapshot,
    stale: bool,
}

/// In-memory store backed by a hash map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<ScopeId, Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn from_slots(slots: HashMap<ScopeId, Slot>) -> Self {
        Self {
            slots: RwLock::new(slots),
        }
    }

    fn entries(&self) -> Vec<StoredEntry> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<StoredEntry> = slots
            .iter()
            .map(|(scope, slot)| StoredEntry {
                scope: scope.clone(),
                snapshot: slot.snapshot.clone(),
                stale: slot.stale,
            })
            .collect();
        entries.sort_by(|a, b| a.scope.cmp(&b.scope));
        entries
    }
}

impl CounterStore for MemoryStore {
    fn get(&self, scope: &ScopeId) -> Option<StatsSnapshot> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(scope)
            .filter(|slot| !slot.stale)
            .map(|slot| slot.snapshot.clone())
    }

    fn put(&self, scope: &ScopeId, snapshot: StatsSnapshot) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(
            scope.clone(),
            Slot {
                snapshot,
                stale: false,
            },
        );
    }

    fn invalidate(&self, scope: &ScopeId) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(scope) {
            slot.stale = true;
        }
    }

    fn remove(&self, scope: &ScopeId) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.remove(scope);
    }

    fn state(&self, scope: &ScopeId) -> SnapshotState {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        match slots.get(scope) {
            None => SnapshotState::Uninitialized,
            Some(slot) if slot.stale => SnapshotState::Stale,
            Some(_) => SnapshotState::Valid,
        }
    }
}

/// One persisted store entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    scope: ScopeId,
    snapshot: StatsSnapshot,
    stale: bool,
}

/// Store keeping snapshots in memory and persisting them to a JSON file.
///
/// Writes only mark the store dirty; the file is rewritten as a whole on
/// `flush` (and on drop), so a batch of updates costs one write. The
/// in-memory copy is authoritative: a failed write leaves the store dirty
/// and the change visible to readers.
pub struct JsonFileStore {
    path: PathBuf,
    memory: MemoryStore,
    dirty: AtomicBool,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing entries if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let slots = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read stats store {}", path.display()))?;
            let entries: Vec<StoredEntry> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse stats store {}", path.display()))?;
            debug!("Loaded {} snapshots from {}", entries.len(), path.display());
            entries
                .into_iter()
                .map(|e| {
                    (
                        e.scope,
                        Slot {
                            snapshot: e.snapshot,
                            stale: e.stale,
                        },
                    )
                })
                .collect()
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            memory: MemoryStore::from_slots(slots),
            dirty: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether changes are waiting for the next flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    fn write_file(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.memory.entries())
            .context("Failed to serialize stats store")?;

        // Replace atomically so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl CounterStore for JsonFileStore {
    fn get(&self, scope: &ScopeId) -> Option<StatsSnapshot> {
        self.memory.get(scope)
    }

    fn put(&self, scope: &ScopeId, snapshot: StatsSnapshot) {
        self.memory.put(scope, snapshot);
        self.mark_dirty();
    }

    fn invalidate(&self, scope: &ScopeId) {
        self.memory.invalidate(scope);
        self.mark_dirty();
    }

    fn remove(&self, scope: &ScopeId) {
        self.memory.remove(scope);
        self.mark_dirty();
    }

    fn state(&self, scope: &ScopeId) -> SnapshotState {
        self.memory.state(scope)
    }

    /// Rewrite the file if anything changed since the last flush.
    fn flush(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Writers mark dirty after updating memory, so a change racing this
        // flush either lands in the file or leaves the flag set
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        if let Err(e) = self.write_file() {
            self.mark_dirty();
            return Err(e);
        }
        debug!("Flushed stats store to {}", self.path.display());
        Ok(())
    }
}

impl Drop for JsonFileStore {
    fn drop(&mut self) {
        if let Err(e) = CounterStore::flush(&*self) {
            warn!("Stats store not persisted: {:#}", e);
        }
    }
}
