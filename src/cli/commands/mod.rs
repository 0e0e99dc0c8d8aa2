//! CLI command implementations

pub mod export;
pub mod init;
pub mod register;
pub mod run;
pub mod status;
pub mod validate;

use crate::adapters::database::{DatabaseClient, SettingsRepository, UsageExtractor};
use crate::adapters::sink::SinkClient;
use crate::config::{load_config, TallyConfig};
use crate::core::export::ExportOrchestrator;
use crate::core::state::MarkerStore;
use crate::domain::{Result, SinkSettings, TallyError};
use std::sync::Arc;

/// Exit code: success
pub const EXIT_OK: i32 = 0;
/// Exit code: `run --once` cycle aborted partway
pub const EXIT_PARTIAL: i32 = 1;
/// Exit code: configuration error
pub const EXIT_CONFIG: i32 = 2;
/// Exit code: database or sink connection error
pub const EXIT_CONNECTION: i32 = 4;
/// Exit code: fatal error
pub const EXIT_FATAL: i32 = 5;

/// Map a domain error to the CLI exit code convention
pub fn exit_code_for(err: &TallyError) -> i32 {
    match err {
        TallyError::Configuration(_) => EXIT_CONFIG,
        TallyError::DataAccess(_) | TallyError::Settings(_) | TallyError::Sink(_) => {
            EXIT_CONNECTION
        }
        _ => EXIT_FATAL,
    }
}

/// Shared wiring for the commands that talk to the database and sink
pub struct AppContext {
    pub config: TallyConfig,
    pub database: Arc<DatabaseClient>,
    pub settings_repo: Arc<SettingsRepository>,
    pub extractor: Arc<UsageExtractor>,
}

impl AppContext {
    /// Load configuration and connect to the gateway database.
    ///
    /// Also ensures the settings table exists, so a fresh deployment works
    /// without a manual migration step.
    pub async fn connect(config_path: &str) -> Result<Self> {
        let config = load_config(config_path)?;

        let database = Arc::new(DatabaseClient::new(config.database.clone())?);
        database.test_connection().await?;
        database.ensure_settings_table().await?;

        let settings_repo = Arc::new(SettingsRepository::new(database.clone()));
        let extractor = Arc::new(UsageExtractor::new(database.clone()));

        Ok(Self {
            config,
            database,
            settings_repo,
            extractor,
        })
    }

    /// Resolve effective sink settings (stored row over file config).
    pub async fn sink_settings(&self) -> Result<SinkSettings> {
        use crate::adapters::database::traits::SettingsStore;
        let stored = self.settings_repo.read_settings().await?;
        SinkSettings::resolve(&self.config.sink, stored.as_ref())
    }

    /// Build the orchestrator with the real sink client.
    pub async fn orchestrator(&self) -> Result<ExportOrchestrator> {
        let settings = self.sink_settings().await?;
        let sink = Arc::new(SinkClient::new(settings, &self.config.export)?);
        let marker_store = MarkerStore::new(self.settings_repo.clone());

        Ok(ExportOrchestrator::new(
            self.extractor.clone(),
            sink,
            marker_store,
            self.config.export.row_limit,
        ))
    }
}
