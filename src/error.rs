//! Error type shared by the statistics library.

use crate::scope::ScopeId;
use thiserror::Error;

/// Errors raised by catalog mutations and statistics lookups.
///
/// A missing snapshot in the store is never an error: it triggers a lazy
/// recompute instead.
#[derive(Debug, Error)]
pub enum StatsError {
    /// The scope names an entity that does not exist in the catalog
    #[error("unknown scope: {0}")]
    UnknownScope(ScopeId),

    /// Assigning `parent` to `category` would make category nesting cyclic
    #[error("category {category} cannot nest under {parent}: nesting would form a cycle")]
    CategoryCycle { category: u64, parent: u64 },

    /// A category or component was attached to a category of another project
    #[error("category {category} belongs to project {expected}, not project {found}")]
    ProjectMismatch {
        category: u64,
        expected: u64,
        found: u64,
    },

    /// An entity id was registered twice
    #[error("duplicate id {id} for {kind}")]
    DuplicateId { kind: &'static str, id: u64 },

    /// A blocking aggregation task panicked or was aborted
    #[error("aggregation task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;
