//! Translation statistics rollup.
//!
//! Counters of translation progress are computed per translation from its
//! strings and summed up through components, categories, per-language
//! project rollups and projects. Snapshots live in an injected
//! [`CounterStore`] and are recomputed lazily after invalidation or eagerly
//! through [`StatsEngine::update_stats`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use weblate_stats::{Catalog, MemoryStore, ScopeId, StatsEngine};
//!
//! let engine = StatsEngine::new(Catalog::load("catalog.json")?, Arc::new(MemoryStore::new()));
//! let project = engine.get(&ScopeId::project(1))?;
//! println!("{}% translated", project.percentages().translated_percent);
//! ```

pub mod aggregator;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod scheduler;
pub mod scope;
pub mod snapshot;
pub mod store;

pub use cache::StatsEngine;
pub use catalog::{Catalog, Category, Component, Project, Translation, Unit, UnitState};
pub use error::StatsError;
pub use events::{dispatch, StatsEvent};
pub use metrics::{MetricsReport, StatsMetrics};
pub use scheduler::RollupScheduler;
pub use scope::{ScopeId, StatsScope};
pub use snapshot::{translation_percent, StatsPercentages, StatsSnapshot};
pub use store::{CounterStore, JsonFileStore, MemoryStore, SnapshotState};
