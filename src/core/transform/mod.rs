//! Usage row to CSV payload transformation
//!
//! The payload is a plain CSV document: one header line, one line per
//! billable row, columns in [`CSV_COLUMNS`] order. Rows with zero successful
//! requests never reach the sink. An empty string is the valid "nothing to
//! send" payload; the uploader short-circuits on it.

use crate::domain::record::CSV_COLUMNS;
use crate::domain::{Result, TallyError, UsageRecord};
use std::collections::HashSet;

/// Render usage rows as a CSV payload.
///
/// Returns an empty string when no billable rows remain after filtering.
///
/// # Errors
///
/// Returns a serialization error if CSV writing fails.
pub fn to_csv(records: &[UsageRecord]) -> Result<String> {
    let billable: Vec<&UsageRecord> = records.iter().filter(|r| r.is_billable()).collect();
    if billable.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;
    for record in billable {
        writer.write_record(record.csv_fields())?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TallyError::Serialization(format!("CSV flush failed: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| TallyError::Serialization(format!("CSV payload is not UTF-8: {e}")))
}

/// Aggregate statistics over the billable subset of a day's rows.
///
/// Shown by the dry-run preview so an operator can sanity-check a day before
/// letting the scheduler send it.
#[derive(Debug, Default)]
pub struct UsageStats {
    pub billable_rows: usize,
    pub total_spend: f64,
    pub total_tokens: i64,
    pub unique_models: usize,
    pub unique_teams: usize,
}

impl UsageStats {
    pub fn from_records(records: &[UsageRecord]) -> Self {
        let mut stats = Self::default();
        let mut models = HashSet::new();
        let mut teams = HashSet::new();

        for record in records.iter().filter(|r| r.is_billable()) {
            stats.billable_rows += 1;
            stats.total_spend += record.spend;
            stats.total_tokens += record.prompt_tokens + record.completion_tokens;
            if let Some(model) = &record.model {
                models.insert(model.clone());
            }
            if let Some(team) = &record.team_id {
                teams.insert(team.clone());
            }
        }

        stats.unique_models = models.len();
        stats.unique_teams = teams.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::test_support::record;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 17).unwrap()
    }

    #[test]
    fn test_empty_input_yields_empty_payload() {
        assert_eq!(to_csv(&[]).unwrap(), "");
    }

    #[test]
    fn test_all_zero_success_rows_yield_empty_payload() {
        let records = vec![record(day(), 0), record(day(), 0), record(day(), 0)];
        assert_eq!(to_csv(&records).unwrap(), "");
    }

    #[test]
    fn test_zero_success_rows_are_dropped() {
        let records = vec![record(day(), 5), record(day(), 0)];
        let payload = to_csv(&records).unwrap();

        let lines: Vec<&str> = payload.lines().collect();
        assert_eq!(lines.len(), 2, "header plus one billable row");
        assert_eq!(lines[0], CSV_COLUMNS.join(","));
    }

    #[test]
    fn test_all_columns_preserved_in_order() {
        let mut billable = record(day(), 3);
        billable.model = Some("gpt-4o".to_string());
        billable.user_email = Some("dev@example.com".to_string());

        let payload = to_csv(&[billable]).unwrap();
        let lines: Vec<&str> = payload.lines().collect();

        let header: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(header, CSV_COLUMNS.to_vec());

        let row: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(row.len(), CSV_COLUMNS.len());
        assert_eq!(row[1], "2026-02-17");
        assert_eq!(row[20], "dev@example.com");
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let mut r = record(day(), 1);
        r.team_alias = Some("Platform, Core".to_string());

        let payload = to_csv(&[r]).unwrap();
        assert!(payload.contains("\"Platform, Core\""));
    }

    #[test]
    fn test_stats_cover_only_billable_rows() {
        let mut a = record(day(), 3);
        a.model = Some("gpt-4o".to_string());
        a.team_id = Some("team-a".to_string());
        let mut b = record(day(), 1);
        b.model = Some("claude-sonnet".to_string());
        b.team_id = Some("team-b".to_string());
        let mut skipped = record(day(), 0);
        skipped.model = Some("gpt-3.5".to_string());
        skipped.spend = 100.0;

        let stats = UsageStats::from_records(&[a, b, skipped]);
        assert_eq!(stats.billable_rows, 2);
        assert_eq!(stats.unique_models, 2);
        assert_eq!(stats.unique_teams, 2);
        assert!((stats.total_spend - 0.0084).abs() < 1e-9);
        assert_eq!(stats.total_tokens, 320);
    }
}
