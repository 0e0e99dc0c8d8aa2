//! Usage row extraction
//!
//! Reads one calendar day of accumulated usage from the gateway's
//! `daily_usage` table, joined with the key, team, and user tables so each
//! record is self-contained. The select list order matches
//! [`crate::domain::record::CSV_COLUMNS`].

use crate::adapters::database::client::DatabaseClient;
use crate::adapters::database::traits::UsageSource;
use crate::domain::{Result, TallyError, UsageRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio_postgres::Row;

const USAGE_QUERY: &str = r#"
SELECT
    d.id,
    d.usage_date,
    d.user_id,
    d.api_key,
    d.model,
    d.model_group,
    d.provider,
    d.prompt_tokens,
    d.completion_tokens,
    d.spend,
    d.api_requests,
    d.successful_requests,
    d.failed_requests,
    d.cache_creation_tokens,
    d.cache_read_tokens,
    d.created_at,
    d.updated_at,
    k.team_id,
    k.key_alias,
    t.team_alias,
    u.user_email
FROM daily_usage d
LEFT JOIN api_keys k ON k.token = d.api_key
LEFT JOIN teams t ON t.team_id = k.team_id
LEFT JOIN users u ON u.user_id = d.user_id
WHERE d.usage_date = $1
ORDER BY d.created_at ASC
LIMIT $2
"#;

const EARLIEST_DATE_QUERY: &str = "SELECT MIN(usage_date) FROM daily_usage";

/// PostgreSQL-backed [`UsageSource`]
pub struct UsageExtractor {
    client: Arc<DatabaseClient>,
}

impl UsageExtractor {
    pub fn new(client: Arc<DatabaseClient>) -> Self {
        Self { client }
    }

    fn record_from_row(row: &Row) -> Result<UsageRecord> {
        let get = |idx: usize, name: &str| {
            TallyError::DataAccess(format!("Unexpected type in usage column {idx} ({name})"))
        };

        Ok(UsageRecord {
            id: row.try_get(0).map_err(|_| get(0, "id"))?,
            usage_date: row.try_get(1).map_err(|_| get(1, "usage_date"))?,
            user_id: row.try_get(2).map_err(|_| get(2, "user_id"))?,
            api_key: row.try_get(3).map_err(|_| get(3, "api_key"))?,
            model: row.try_get(4).map_err(|_| get(4, "model"))?,
            model_group: row.try_get(5).map_err(|_| get(5, "model_group"))?,
            provider: row.try_get(6).map_err(|_| get(6, "provider"))?,
            prompt_tokens: row.try_get(7).map_err(|_| get(7, "prompt_tokens"))?,
            completion_tokens: row.try_get(8).map_err(|_| get(8, "completion_tokens"))?,
            spend: row.try_get(9).map_err(|_| get(9, "spend"))?,
            api_requests: row.try_get(10).map_err(|_| get(10, "api_requests"))?,
            successful_requests: row
                .try_get(11)
                .map_err(|_| get(11, "successful_requests"))?,
            failed_requests: row.try_get(12).map_err(|_| get(12, "failed_requests"))?,
            cache_creation_tokens: row
                .try_get(13)
                .map_err(|_| get(13, "cache_creation_tokens"))?,
            cache_read_tokens: row.try_get(14).map_err(|_| get(14, "cache_read_tokens"))?,
            created_at: row.try_get(15).map_err(|_| get(15, "created_at"))?,
            updated_at: row.try_get(16).map_err(|_| get(16, "updated_at"))?,
            team_id: row.try_get(17).map_err(|_| get(17, "team_id"))?,
            key_alias: row.try_get(18).map_err(|_| get(18, "key_alias"))?,
            team_alias: row.try_get(19).map_err(|_| get(19, "team_alias"))?,
            user_email: row.try_get(20).map_err(|_| get(20, "user_email"))?,
        })
    }
}

#[async_trait]
impl UsageSource for UsageExtractor {
    async fn fetch_usage(&self, day: NaiveDate, limit: i64) -> Result<Vec<UsageRecord>> {
        let rows = self.client.query(USAGE_QUERY, &[&day, &limit]).await?;

        let records = rows
            .iter()
            .map(Self::record_from_row)
            .collect::<Result<Vec<_>>>()?;

        if records.len() as i64 == limit {
            // The cap may have cut the day short; rows beyond it are dropped
            tracing::warn!(
                day = %day,
                limit,
                "Usage fetch hit the row limit, payload may be truncated"
            );
        }

        tracing::debug!(day = %day, rows = records.len(), "Fetched usage rows");
        Ok(records)
    }

    async fn earliest_usage_date(&self) -> Result<Option<NaiveDate>> {
        let rows = self.client.query(EARLIEST_DATE_QUERY, &[]).await?;
        let earliest = rows
            .first()
            .and_then(|row| row.try_get::<_, Option<NaiveDate>>(0).ok())
            .flatten();
        Ok(earliest)
    }
}
