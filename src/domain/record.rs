//! Usage row model
//!
//! One `UsageRecord` is one accumulated row for a (subject, resource, day)
//! triple, already joined with the identifying metadata the payload needs
//! (key alias, team name, user email). The extractor produces self-contained
//! records; nothing downstream goes back to the database.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Column order for the CSV payload.
///
/// This order is stable and matches the extraction query's select list; the
/// transformer preserves every column exactly as fetched.
pub const CSV_COLUMNS: [&str; 21] = [
    "id",
    "usage_date",
    "user_id",
    "api_key",
    "model",
    "model_group",
    "provider",
    "prompt_tokens",
    "completion_tokens",
    "spend",
    "api_requests",
    "successful_requests",
    "failed_requests",
    "cache_creation_tokens",
    "cache_read_tokens",
    "created_at",
    "updated_at",
    "team_id",
    "key_alias",
    "team_alias",
    "user_email",
];

/// One accumulated usage row for a single calendar day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Row identifier in the gateway's daily usage table
    pub id: String,

    /// Calendar day this row accumulates over
    pub usage_date: NaiveDate,

    /// User identifier (nullable in the gateway schema)
    pub user_id: Option<String>,

    /// Hashed API key the requests were made with
    pub api_key: String,

    /// Model name (e.g. "gpt-4o")
    pub model: Option<String>,

    /// Model family/group
    pub model_group: Option<String>,

    /// Upstream provider (e.g. "openai", "anthropic")
    pub provider: Option<String>,

    /// Input tokens used
    pub prompt_tokens: i64,

    /// Output tokens used
    pub completion_tokens: i64,

    /// Cost in USD
    pub spend: f64,

    /// Total API requests
    pub api_requests: i64,

    /// Successful API requests
    pub successful_requests: i64,

    /// Failed API requests
    pub failed_requests: i64,

    /// Cache-creation input tokens
    pub cache_creation_tokens: i64,

    /// Cache-read input tokens
    pub cache_read_tokens: i64,

    /// Row creation timestamp
    pub created_at: DateTime<Utc>,

    /// Row last-update timestamp
    pub updated_at: DateTime<Utc>,

    /// Team identifier joined from the key table
    pub team_id: Option<String>,

    /// Human-readable key alias
    pub key_alias: Option<String>,

    /// Human-readable team name
    pub team_alias: Option<String>,

    /// User email joined from the user table
    pub user_email: Option<String>,
}

impl UsageRecord {
    /// A record carries billable signal only when at least one request
    /// succeeded. Zero-success rows are dropped before transmission.
    pub fn is_billable(&self) -> bool {
        self.successful_requests > 0
    }

    /// Render the row as CSV fields in [`CSV_COLUMNS`] order.
    ///
    /// Nullable columns render as empty strings, matching how the original
    /// export serializes NULLs.
    pub fn csv_fields(&self) -> [String; 21] {
        fn opt(value: &Option<String>) -> String {
            value.clone().unwrap_or_default()
        }

        [
            self.id.clone(),
            self.usage_date.format("%Y-%m-%d").to_string(),
            opt(&self.user_id),
            self.api_key.clone(),
            opt(&self.model),
            opt(&self.model_group),
            opt(&self.provider),
            self.prompt_tokens.to_string(),
            self.completion_tokens.to_string(),
            self.spend.to_string(),
            self.api_requests.to_string(),
            self.successful_requests.to_string(),
            self.failed_requests.to_string(),
            self.cache_creation_tokens.to_string(),
            self.cache_read_tokens.to_string(),
            self.created_at.to_rfc3339(),
            self.updated_at.to_rfc3339(),
            opt(&self.team_id),
            opt(&self.key_alias),
            opt(&self.team_alias),
            opt(&self.user_email),
        ]
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    /// Build a record with the given success count; everything else fixed.
    pub fn record(day: NaiveDate, successful_requests: i64) -> UsageRecord {
        let created = Utc.with_ymd_and_hms(2026, 2, 18, 3, 0, 0).unwrap();
        UsageRecord {
            id: "row-1".to_string(),
            usage_date: day,
            user_id: Some("user-1".to_string()),
            api_key: "sk-hash".to_string(),
            model: Some("gpt-4o".to_string()),
            model_group: Some("gpt-4o".to_string()),
            provider: Some("openai".to_string()),
            prompt_tokens: 120,
            completion_tokens: 40,
            spend: 0.0042,
            api_requests: successful_requests + 1,
            successful_requests,
            failed_requests: 1,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
            created_at: created,
            updated_at: created,
            team_id: Some("team-1".to_string()),
            key_alias: Some("prod-key".to_string()),
            team_alias: Some("Platform".to_string()),
            user_email: Some("dev@example.com".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billable_predicate() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        assert!(test_support::record(day, 3).is_billable());
        assert!(!test_support::record(day, 0).is_billable());
    }

    #[test]
    fn test_csv_fields_match_column_order() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        let fields = test_support::record(day, 3).csv_fields();

        assert_eq!(fields.len(), CSV_COLUMNS.len());
        assert_eq!(fields[0], "row-1");
        assert_eq!(fields[1], "2026-02-18");
        assert_eq!(fields[9], "0.0042");
        assert_eq!(fields[11], "3");
        assert_eq!(fields[20], "dev@example.com");
    }

    #[test]
    fn test_csv_fields_render_nulls_as_empty() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        let mut record = test_support::record(day, 1);
        record.team_id = None;
        record.team_alias = None;

        let fields = record.csv_fields();
        assert_eq!(fields[17], "");
        assert_eq!(fields[19], "");
    }
}
