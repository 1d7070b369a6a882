use std::sync::Arc;

use crate::config::Config;
use crate::service::QueryService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub service: Arc<QueryService>,
}

impl AppState {
    /// Build the state for the online query path. Fails with
    /// `IndexNotBuilt` when the offline indexer has never run.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let service = QueryService::from_config(&config, http_client)?;

        Ok(Self {
            config,
            service: Arc::new(service),
        })
    }
}
