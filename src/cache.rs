//! Cache layer: lazy reads, explicit recompute and invalidation.
//!
//! `StatsEngine` ties the catalog, the injected counter store and the
//! aggregator together. Every read-modify-write of one scope runs under that
//! scope's own mutex; locks are only ever taken parent before child, and a
//! parent's lock is released before any of its ancestors is touched.

use crate::aggregator::{compute_leaf, compute_parent};
use crate::catalog::Catalog;
use crate::error::{Result, StatsError};
use crate::metrics::StatsMetrics;
use crate::scope::ScopeId;
use crate::snapshot::StatsSnapshot;
use crate::store::{CounterStore, SnapshotState};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Per-scope mutexes, created on first use.
#[derive(Default)]
struct ScopeLocks {
    locks: Mutex<HashMap<ScopeId, Arc<Mutex<()>>>>,
}

impl ScopeLocks {
    fn for_scope(&self, scope: &ScopeId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(scope.clone()).or_default())
    }

    fn forget(&self, scope: &ScopeId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.remove(scope);
    }
}

/// Statistics engine over one catalog and one counter store.
pub struct StatsEngine {
    catalog: RwLock<Catalog>,
    store: Arc<dyn CounterStore>,
    locks: ScopeLocks,
    metrics: StatsMetrics,
}

impl StatsEngine {
    pub fn new(catalog: Catalog, store: Arc<dyn CounterStore>) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            store,
            locks: ScopeLocks::default(),
            metrics: StatsMetrics::new(),
        }
    }

    /// Shared access to the catalog.
    ///
    /// Do not hold the guard across calls into the engine.
    pub fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the catalog for mutations.
    ///
    /// Mutations do not touch statistics; the caller follows up with
    /// `update_stats` or `invalidate_cache` (see `events::dispatch`).
    pub fn catalog_mut(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store(&self) -> &dyn CounterStore {
        self.store.as_ref()
    }

    pub fn metrics(&self) -> &StatsMetrics {
        &self.metrics
    }

    pub fn state(&self, scope: &ScopeId) -> SnapshotState {
        self.store.state(scope)
    }

    /// Current snapshot of a scope, computing it on a miss.
    ///
    /// A missing or stale entry is never an error; only an unknown entity is.
    pub fn get(&self, scope: &ScopeId) -> Result<StatsSnapshot> {
        if let Some(snapshot) = self.store.get(scope) {
            self.metrics.record_cache_hit();
            return Ok(snapshot);
        }
        self.metrics.record_cache_miss();

        // Fill children first so the lock below is only held for the sum
        if !scope.scope().is_leaf() {
            let children = self.catalog().children(scope)?;
            for child in &children {
                self.get_child(child)?;
            }
        }

        let lock = self.locks.for_scope(scope);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Another reader may have filled it while we waited
        if let Some(snapshot) = self.store.get(scope) {
            return Ok(snapshot);
        }

        let snapshot = self.compute(scope)?;
        self.store.put(scope, snapshot.clone());
        Ok(snapshot)
    }

    /// Recompute a scope and store it; with `update_parents`, recompute every
    /// ancestor as well, children strictly before parents.
    ///
    /// When this returns, no ancestor of `scope` holds a stale snapshot.
    pub fn update_stats(&self, scope: &ScopeId, update_parents: bool) -> Result<StatsSnapshot> {
        let ancestors = if update_parents {
            self.catalog().ancestors(scope)?
        } else {
            Vec::new()
        };

        let snapshot = self.refresh(scope)?;
        for ancestor in &ancestors {
            self.refresh(ancestor)?;
        }

        debug!(
            "Updated stats for {} ({} ancestors refreshed)",
            scope,
            ancestors.len()
        );
        Ok(snapshot)
    }

    /// Drop the stored snapshot of a scope, and with `cascade` those of all
    /// its ancestors. Nothing is recomputed until the next read.
    pub fn invalidate_cache(&self, scope: &ScopeId, cascade: bool) -> Result<()> {
        let ancestors = if cascade {
            self.catalog().ancestors(scope)?
        } else {
            Vec::new()
        };

        for target in std::iter::once(scope).chain(ancestors.iter()) {
            let lock = self.locks.for_scope(target);
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.store.invalidate(target);
            self.metrics.record_invalidation();
        }

        debug!("Invalidated {} (cascade: {})", scope, cascade);
        Ok(())
    }

    /// Re-nest a category, then refresh the chain it left and the chain it
    /// joined so neither the old nor the new parents keep a stale sum.
    pub fn move_category(&self, category: u64, parent: Option<u64>) -> Result<()> {
        let scope = ScopeId::category(category);
        let previous = self.catalog_mut().set_category_parent(category, parent)?;

        if let Some(old) = previous {
            self.update_stats(&ScopeId::category(old), true)?;
        }
        let ancestors = self.catalog().ancestors(&scope)?;
        for ancestor in &ancestors {
            self.refresh(ancestor)?;
        }

        debug!("Moved {} from {:?} to {:?}", scope, previous, parent);
        Ok(())
    }

    /// Remove an entity and everything it contains from the catalog, drop
    /// their snapshots and refresh every surviving scope that aggregated them.
    ///
    /// Ancestors left without any content (a language rollup whose last
    /// translation went away) are dropped instead of refreshed.
    pub fn delete(&self, scope: &ScopeId) -> Result<()> {
        let (removed, affected) = {
            let mut catalog = self.catalog_mut();
            let subtree = catalog.subtree(scope)?;

            let mut affected = BTreeSet::new();
            for entry in &subtree {
                affected.extend(catalog.ancestors(entry)?);
            }
            for entry in &subtree {
                affected.remove(entry);
            }
            let mut affected: Vec<ScopeId> = affected.into_iter().collect();
            affected.sort_by_key(|ancestor| refresh_rank(&catalog, ancestor));

            (catalog.remove(scope)?, affected)
        };

        for entry in &removed {
            self.forget(entry);
        }
        for ancestor in &affected {
            if self.catalog().contains(ancestor) {
                self.refresh(ancestor)?;
            } else {
                self.forget(ancestor);
            }
        }

        debug!(
            "Deleted {} ({} scopes removed, {} ancestors touched)",
            scope,
            removed.len(),
            affected.len()
        );
        Ok(())
    }

    /// Drop the snapshot of a scope whose entity no longer exists.
    pub fn forget(&self, scope: &ScopeId) {
        {
            let lock = self.locks.for_scope(scope);
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.store.remove(scope);
        }
        self.locks.forget(scope);
    }

    /// Write buffered store changes out. A failure is logged; the stored
    /// snapshots stay readable either way.
    pub fn flush(&self) {
        if let Err(e) = self.store.flush() {
            warn!("Stats store not persisted: {:#}", e);
        }
    }

    /// Recompute and store one scope under its lock.
    fn refresh(&self, scope: &ScopeId) -> Result<StatsSnapshot> {
        let lock = self.locks.for_scope(scope);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot = self.compute(scope)?;
        self.store.put(scope, snapshot.clone());
        Ok(snapshot)
    }

    /// Compute a snapshot from strings (leaf) or from the children's
    /// current snapshots (parent). Caller holds the scope lock.
    fn compute(&self, scope: &ScopeId) -> Result<StatsSnapshot> {
        if let ScopeId::Translation { id } = scope {
            let snapshot = {
                let catalog = self.catalog();
                let translation = catalog
                    .translation(*id)
                    .ok_or_else(|| StatsError::UnknownScope(scope.clone()))?;
                compute_leaf(&translation.units)
            };
            self.metrics.record_leaf_computation();
            return Ok(snapshot);
        }

        let children = self.catalog().children(scope)?;
        let mut snapshots = Vec::with_capacity(children.len());
        for child in &children {
            if let Some(snapshot) = self.get_child(child)? {
                snapshots.push(snapshot);
            }
        }

        self.metrics.record_parent_computation();
        Ok(compute_parent(&snapshots))
    }

    /// Read a child snapshot; a child deleted since the parent listed it is skipped.
    fn get_child(&self, child: &ScopeId) -> Result<Option<StatsSnapshot>> {
        match self.get(child) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(StatsError::UnknownScope(missing)) if missing == *child => {
                debug!("Skipping {} removed during aggregation", child);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Sort key placing every scope after all scopes it aggregates.
fn refresh_rank(catalog: &Catalog, scope: &ScopeId) -> (u8, Reverse<usize>) {
    match scope {
        ScopeId::Translation { .. } => (0, Reverse(0)),
        ScopeId::Component { .. } => (1, Reverse(0)),
        ScopeId::Category { id } => (2, Reverse(catalog.category_depth(*id))),
        ScopeId::ProjectLanguage { .. } => (3, Reverse(0)),
        ScopeId::Project { .. } => (4, Reverse(0)),
    }
}
