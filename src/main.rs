use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use weblate_stats::config::Config;
use weblate_stats::{
    Catalog, CounterStore, JsonFileStore, MemoryStore, MetricsReport, RollupScheduler,
    StatsEngine, StatsPercentages, StatsSnapshot,
};

#[derive(Serialize)]
struct ProjectReport {
    id: u64,
    name: String,
    stats: StatsSnapshot,
    percentages: StatsPercentages,
}

#[derive(Serialize)]
struct Report {
    projects: Vec<ProjectReport>,
    metrics: MetricsReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("weblate_stats=info".parse()?),
        )
        .init();

    info!("Starting statistics recalculation");

    let config = Config::from_env()?;

    let catalog = Catalog::load(&config.catalog_file)?;
    info!("Loaded catalog from {}", config.catalog_file.display());

    let store: Arc<dyn CounterStore> = match &config.store_file {
        Some(path) => {
            info!("Persisting snapshots to {}", path.display());
            Arc::new(JsonFileStore::open(path)?)
        }
        None => Arc::new(MemoryStore::new()),
    };

    let engine = Arc::new(StatsEngine::new(catalog, store));
    let scheduler = RollupScheduler::new(Arc::clone(&engine), config.workers);

    let results = scheduler.recalculate_all().await?;
    engine
        .store()
        .flush()
        .context("Failed to persist stats store")?;

    let projects = {
        let catalog = engine.catalog();
        results
            .into_iter()
            .map(|(id, stats)| ProjectReport {
                id,
                name: catalog
                    .project(id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                percentages: stats.percentages(),
                stats,
            })
            .collect()
    };

    let report = Report {
        projects,
        metrics: engine.metrics().report(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("✓ Recalculation finished");
    Ok(())
}
