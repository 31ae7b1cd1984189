use std::sync::Arc;

use prometheus::Registry;
use recast_core::{metrics, Config, HistoryStore, JobRunner};

/// Shared application state
pub struct AppState {
    config: Config,
    jobs: Arc<JobRunner>,
    history: Arc<dyn HistoryStore>,
    metrics_registry: Registry,
}

impl AppState {
    pub fn new(config: Config, jobs: Arc<JobRunner>, history: Arc<dyn HistoryStore>) -> Self {
        let metrics_registry = Registry::new();
        metrics::register_metrics(&metrics_registry);
        Self {
            config,
            jobs,
            history,
            metrics_registry,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn jobs(&self) -> &JobRunner {
        &self.jobs
    }

    pub fn history(&self) -> &dyn HistoryStore {
        self.history.as_ref()
    }

    pub fn metrics_registry(&self) -> &Registry {
        &self.metrics_registry
    }
}
