use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // Input
    pub catalog_file: PathBuf,

    // Counter store (in-memory when unset)
    pub store_file: Option<PathBuf>,

    // Scheduling
    pub workers: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            catalog_file: std::env::var("STATS_CATALOG_FILE")
                .context("STATS_CATALOG_FILE not set")?
                .into(),

            store_file: std::env::var("STATS_STORE_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),

            workers: match std::env::var("STATS_WORKERS") {
                Ok(v) => v
                    .parse()
                    .with_context(|| format!("STATS_WORKERS must be a number, got '{}'", v))?,
                Err(_) => 4,
            },
        })
    }
}
