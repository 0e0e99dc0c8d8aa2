//! Export cycle results

use chrono::NaiveDate;
use std::time::Duration;

/// Outcome of exporting one calendar day
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayOutcome {
    /// Payload delivered to the sink
    Uploaded {
        /// Billable rows in the payload
        rows: usize,
    },

    /// Nothing billable to send; no network traffic occurred
    Empty {
        /// Rows fetched before filtering
        rows_fetched: usize,
    },
}

/// Summary of one export cycle
#[derive(Debug, Default)]
pub struct ExportSummary {
    /// Days due when the cycle started
    pub days_due: usize,

    /// Days whose payload reached the sink
    pub days_uploaded: usize,

    /// Days skipped because nothing billable remained
    pub days_empty: usize,

    /// Billable rows delivered across all uploaded days
    pub rows_exported: usize,

    /// Marker value after the cycle, if any day was committed
    pub marker: Option<NaiveDate>,

    /// Error that aborted the cycle, if any. Days committed before the
    /// error stay committed.
    pub error: Option<String>,

    /// Wall-clock duration of the cycle
    pub duration: Duration,
}

impl ExportSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Whether the cycle completed without aborting
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Dry-run preview of one day's payload
#[derive(Debug)]
pub struct DryRunReport {
    pub day: NaiveDate,
    pub rows_fetched: usize,
    pub billable_rows: usize,
    pub total_spend: f64,
    pub total_tokens: i64,
    pub unique_models: usize,
    pub unique_teams: usize,

    /// CSV payload truncated for terminal display
    pub preview: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_completeness() {
        let mut summary = ExportSummary::new();
        assert!(summary.is_complete());

        summary.error = Some("upload failed".to_string());
        assert!(!summary.is_complete());
    }
}
