//! Application state: repositories plus the coordination components.

use anyhow::Result;
use std::sync::Arc;
use survey_oracle::{HttpOracle, OracleAdapter};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::hub::Hub;
use crate::ledger::{Ledger, LockTable};
use crate::persistence::{self, Repositories};
use crate::scheduler::Scheduler;

/// Application state - every coordination operation goes through here.
pub struct AppState {
    pub(super) config: Config,
    pub(super) repos: Repositories,
    pub(super) ledger: Ledger,
    pub(super) mission_locks: LockTable,
    /// Serializes serial-number uniqueness checks with their writes.
    pub(super) registry: Mutex<()>,
    pub(super) scheduler: Arc<Scheduler>,
    pub(super) hub: Hub,
    pub(super) oracle: OracleAdapter,
}

impl AppState {
    pub fn new(config: Config, repos: Repositories, oracle: OracleAdapter) -> Self {
        Self {
            ledger: Ledger::new(repos.drones.clone()),
            mission_locks: LockTable::new(),
            registry: Mutex::new(()),
            scheduler: Scheduler::new(repos.missions.clone()),
            hub: Hub::new(),
            config,
            repos,
            oracle,
        }
    }

    /// In-memory store with the oracle disabled.
    pub fn in_memory() -> Self {
        Self::new(
            Config::default(),
            Repositories::in_memory(),
            OracleAdapter::disabled(),
        )
    }

    /// Build storage and the oracle from configuration.
    pub async fn from_config(config: Config) -> Result<Self> {
        let repos = match config.database_path.as_deref() {
            Some(path) => {
                let db =
                    persistence::init_database(path, config.database_max_connections).await?;
                Repositories::sqlite(db)
            }
            None => {
                tracing::warn!("SURVEY_DATABASE_PATH not set; records are kept in memory only");
                Repositories::in_memory()
            }
        };

        let oracle = match config.oracle_url.as_deref() {
            Some(url) => {
                let client = HttpOracle::new(
                    url,
                    config.oracle_api_key.clone(),
                    config.oracle_timeout,
                )?;
                tracing::info!("Oracle enabled at {}", url);
                OracleAdapter::uniform(Arc::new(client), config.oracle_timeout)
            }
            None => {
                tracing::warn!("SURVEY_ORACLE_URL not set; using local fallbacks");
                OracleAdapter::disabled()
            }
        };

        Ok(Self::new(config, repos, oracle))
    }

    /// Re-arm recurrence timers for persisted missions.
    pub async fn restore(&self) -> Result<usize> {
        self.scheduler.restore().await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn oracle(&self) -> &OracleAdapter {
        &self.oracle
    }

    /// Answer an operator chat message.
    pub async fn chat(&self, message: &str) -> String {
        crate::chat::reply(&self.repos, &self.oracle, message).await
    }

    /// Stop timers and close every live channel.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        self.hub.shutdown();
    }
}
