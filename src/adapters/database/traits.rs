//! Database access traits
//!
//! The orchestrator and marker store depend on these traits rather than the
//! concrete PostgreSQL adapter, so tests can substitute in-memory fakes.

use crate::domain::{Result, UsageRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

/// Read access to the gateway's accumulated daily usage rows
#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Fetch all usage rows for a single calendar day, joined with key, team
    /// and user metadata, ordered by creation time, capped at `limit` rows.
    async fn fetch_usage(&self, day: NaiveDate, limit: i64) -> Result<Vec<UsageRecord>>;

    /// Earliest day for which usage exists, if any.
    async fn earliest_usage_date(&self) -> Result<Option<NaiveDate>>;
}

/// Persistence for the sink settings row
///
/// The row holds one JSON object carrying both the connection settings and
/// the export marker. Implementations must preserve fields they don't know
/// about when writing.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the stored settings object, if the row exists.
    async fn read_settings(&self) -> Result<Option<Value>>;

    /// Upsert the settings row with the given object.
    async fn write_settings(&self, settings: &Value) -> Result<()>;
}
