//! Settings row persistence
//!
//! The exporter keeps all of its durable state in one row of the
//! `tally_settings` table: `param_name = 'sink_settings'` with a JSONB
//! object as the value. This adapter only moves the object in and out;
//! merging semantics live in the marker store and the register command.

use crate::adapters::database::client::DatabaseClient;
use crate::adapters::database::traits::SettingsStore;
use crate::domain::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Row key for the sink settings object
pub const SINK_SETTINGS_PARAM: &str = "sink_settings";

const READ_QUERY: &str = "SELECT param_value FROM tally_settings WHERE param_name = $1";

const UPSERT_QUERY: &str = r#"
INSERT INTO tally_settings (param_name, param_value, updated_at)
VALUES ($1, $2, now())
ON CONFLICT (param_name)
DO UPDATE SET param_value = EXCLUDED.param_value, updated_at = now()
"#;

/// PostgreSQL-backed [`SettingsStore`]
pub struct SettingsRepository {
    client: Arc<DatabaseClient>,
}

impl SettingsRepository {
    pub fn new(client: Arc<DatabaseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SettingsStore for SettingsRepository {
    async fn read_settings(&self) -> Result<Option<Value>> {
        let rows = self
            .client
            .query(READ_QUERY, &[&SINK_SETTINGS_PARAM])
            .await?;

        Ok(rows
            .first()
            .and_then(|row| row.try_get::<_, Value>(0).ok()))
    }

    async fn write_settings(&self, settings: &Value) -> Result<()> {
        self.client
            .execute(UPSERT_QUERY, &[&SINK_SETTINGS_PARAM, settings])
            .await?;
        tracing::debug!("Settings row written");
        Ok(())
    }
}
