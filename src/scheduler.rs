//! Batch recomputation of whole projects.
//!
//! Components are recomputed in parallel on the blocking pool; project-level
//! scopes wait for all of them before they are summed.

use crate::cache::StatsEngine;
use crate::error::{Result, StatsError};
use crate::scope::ScopeId;
use crate::snapshot::StatsSnapshot;
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// What has to be recomputed for one project, captured up front so no
/// catalog guard is held while the work runs.
struct ProjectPlan {
    /// (component, its translations)
    components: Vec<(u64, Vec<u64>)>,
    /// Innermost categories first
    categories: Vec<u64>,
    languages: Vec<String>,
}

/// Orders multi-scope recomputation so children are always stored before
/// their parents are summed.
pub struct RollupScheduler {
    engine: Arc<StatsEngine>,
    workers: Arc<Semaphore>,
}

impl RollupScheduler {
    /// Create a scheduler running at most `workers` component jobs at once.
    pub fn new(engine: Arc<StatsEngine>, workers: usize) -> Self {
        Self {
            engine,
            workers: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub fn engine(&self) -> &Arc<StatsEngine> {
        &self.engine
    }

    /// Recompute every scope of a project from its strings up.
    ///
    /// Order: every translation, then its component (parallel per
    /// component); after all components finish, categories innermost first,
    /// project-language rollups, and finally the project itself. Buffered
    /// store changes are flushed once the project is done.
    pub async fn recalculate_project(&self, project: u64) -> Result<StatsSnapshot> {
        let plan = self.plan(project)?;
        info!(
            "Recalculating project {} ({} components, {} categories, {} languages)",
            project,
            plan.components.len(),
            plan.categories.len(),
            plan.languages.len()
        );

        let jobs = plan
            .components
            .into_iter()
            .map(|(component, translations)| self.recalculate_component(component, translations));

        // Barrier: project-level sums need every component stored
        try_join_all(jobs).await?;

        let engine = Arc::clone(&self.engine);
        let (categories, languages) = (plan.categories, plan.languages);
        let snapshot = tokio::task::spawn_blocking(move || -> Result<StatsSnapshot> {
            for category in categories {
                engine.update_stats(&ScopeId::category(category), false)?;
            }
            for language in languages {
                engine.update_stats(&ScopeId::project_language(project, language), false)?;
            }
            let snapshot = engine.update_stats(&ScopeId::project(project), false)?;
            // One store write per project, never one per scope
            engine.flush();
            Ok(snapshot)
        })
        .await
        .map_err(|e| StatsError::Task(e.to_string()))??;

        info!(
            "✓ Project {} recalculated: {}/{} strings translated",
            project, snapshot.translated, snapshot.all
        );
        Ok(snapshot)
    }

    /// Leaves of one component, then the component, on the blocking pool.
    async fn recalculate_component(&self, component: u64, translations: Vec<u64>) -> Result<()> {
        let _permit = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|e| StatsError::Task(e.to_string()))?;

        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || -> Result<()> {
            for translation in &translations {
                engine.update_stats(&ScopeId::translation(*translation), false)?;
            }
            engine.update_stats(&ScopeId::component(component), false)?;
            debug!(
                "Component {} recalculated ({} translations)",
                component,
                translations.len()
            );
            Ok(())
        })
        .await
        .map_err(|e| StatsError::Task(e.to_string()))?
    }

    /// Recompute every project of the catalog, one project at a time.
    pub async fn recalculate_all(&self) -> Result<Vec<(u64, StatsSnapshot)>> {
        let projects = self.engine.catalog().project_ids();

        let mut results = Vec::with_capacity(projects.len());
        for project in projects {
            let snapshot = self.recalculate_project(project).await?;
            results.push((project, snapshot));
        }
        Ok(results)
    }

    fn plan(&self, project: u64) -> Result<ProjectPlan> {
        let catalog = self.engine.catalog();
        if catalog.project(project).is_none() {
            return Err(StatsError::UnknownScope(ScopeId::project(project)));
        }

        let components = catalog
            .components_of_project(project)
            .into_iter()
            .map(|component| (component, catalog.translations_of_component(component)))
            .collect();

        let mut categories = catalog.categories_of_project(project);
        categories.sort_by_key(|category| std::cmp::Reverse(catalog.category_depth(*category)));

        Ok(ProjectPlan {
            components,
            categories,
            languages: catalog.languages_of_project(project),
        })
    }
}
