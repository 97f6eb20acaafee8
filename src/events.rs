//! Mutation events and the statistics work each one triggers.
//!
//! Call sites mutate the catalog and then dispatch the matching event; the
//! statistics layer never hooks into mutations on its own.

use crate::cache::StatsEngine;
use crate::error::Result;
use crate::scope::ScopeId;
use tracing::info;

/// Something changed that the statistics have to follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsEvent {
    /// A string of the translation was edited
    UnitChanged { translation: u64 },

    /// Strings were uploaded or imported in bulk
    UnitsImported { translation: u64 },

    /// Check results of the translation's strings changed
    ChecksChanged { translation: u64 },

    /// An administrator cleared the cached statistics of a component
    CacheCleared { component: u64 },

    /// A category was nested under another one or moved to the top level
    CategoryMoved { category: u64, parent: Option<u64> },

    /// The translation is being deleted
    TranslationDeleted { translation: u64 },

    /// The component and all of its translations are being deleted
    ComponentDeleted { component: u64 },

    /// The category and everything nested in it are being deleted
    CategoryDeleted { category: u64 },

    ProjectDeleted { project: u64 },
}

/// Apply the statistics side of an event.
///
/// String and check changes refresh the translation and every ancestor
/// eagerly. A cache clear only invalidates, leaving recomputation to the
/// next read. Moves and deletions carry out the catalog change themselves
/// so the old ancestors are still known when their sums are redone.
pub fn dispatch(engine: &StatsEngine, event: &StatsEvent) -> Result<()> {
    match event {
        StatsEvent::UnitChanged { translation }
        | StatsEvent::UnitsImported { translation }
        | StatsEvent::ChecksChanged { translation } => {
            engine.update_stats(&ScopeId::translation(*translation), true)?;
        }
        StatsEvent::CacheCleared { component } => {
            info!("Clearing cached stats of component {}", component);
            engine.invalidate_cache(&ScopeId::component(*component), true)?;
        }
        StatsEvent::CategoryMoved { category, parent } => {
            engine.move_category(*category, *parent)?;
        }
        StatsEvent::TranslationDeleted { translation } => {
            delete(engine, ScopeId::translation(*translation))?;
        }
        StatsEvent::ComponentDeleted { component } => {
            delete(engine, ScopeId::component(*component))?;
        }
        StatsEvent::CategoryDeleted { category } => {
            delete(engine, ScopeId::category(*category))?;
        }
        StatsEvent::ProjectDeleted { project } => {
            delete(engine, ScopeId::project(*project))?;
        }
    }
    engine.flush();
    Ok(())
}

fn delete(engine: &StatsEngine, scope: ScopeId) -> Result<()> {
    info!("Dropping stats of deleted {}", scope);
    engine.delete(&scope)
}
