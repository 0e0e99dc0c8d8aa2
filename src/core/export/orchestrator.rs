//! Export orchestrator
//!
//! Drives one export cycle: read the marker, walk the due days oldest
//! first, and for each day extract, transform, upload, commit the marker,
//! then notify the sink cursor. The marker is committed per day, so a crash
//! or upload failure mid-cycle resumes at the first undelivered day. Days
//! with nothing billable commit nothing and cost no network traffic.

use crate::adapters::database::traits::UsageSource;
use crate::adapters::sink::SinkTransport;
use crate::core::export::summary::{DayOutcome, DryRunReport, ExportSummary};
use crate::core::state::{day_epoch, format_marker, parse_marker, pending_days, MarkerStore};
use crate::core::transform::{to_csv, UsageStats};
use crate::domain::Result;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Instant;

/// Characters of CSV shown by the dry-run preview
const PREVIEW_LIMIT: usize = 5_000;

/// Export orchestrator
pub struct ExportOrchestrator {
    usage: Arc<dyn UsageSource>,
    sink: Arc<dyn SinkTransport>,
    marker_store: MarkerStore,
    row_limit: i64,
}

impl ExportOrchestrator {
    pub fn new(
        usage: Arc<dyn UsageSource>,
        sink: Arc<dyn SinkTransport>,
        marker_store: MarkerStore,
        row_limit: i64,
    ) -> Self {
        Self {
            usage,
            sink,
            marker_store,
            row_limit,
        }
    }

    /// Run one scheduled export cycle against the current UTC date.
    pub async fn run_cycle(&self) -> Result<ExportSummary> {
        self.run_cycle_at(Utc::now().date_naive()).await
    }

    /// Run one export cycle with an explicit "today".
    ///
    /// The current day is never exported; its rows are still accumulating.
    ///
    /// # Errors
    ///
    /// Returns an error only when the marker itself cannot be read or
    /// written. Upload failures abort the cycle but are reported inside the
    /// summary, since days committed before the failure remain committed.
    pub async fn run_cycle_at(&self, today: NaiveDate) -> Result<ExportSummary> {
        let start = Instant::now();
        let mut summary = ExportSummary::new();

        let marker = self.read_marker().await?;
        let days = pending_days(marker, today);
        summary.days_due = days.len();

        if days.is_empty() {
            tracing::info!(marker = ?marker.map(format_marker), "Nothing due for export");
            return Ok(summary.with_duration(start.elapsed()));
        }

        tracing::info!(
            days_due = days.len(),
            first = %format_marker(days[0]),
            last = %format_marker(*days.last().unwrap_or(&days[0])),
            "Starting export cycle"
        );

        for day in days {
            match self.deliver_day(day, self.row_limit).await {
                Ok(DayOutcome::Uploaded { rows }) => {
                    self.marker_store.advance(day).await?;
                    summary.days_uploaded += 1;
                    summary.rows_exported += rows;
                    summary.marker = Some(day);

                    // Cursor notification is advisory; the committed marker
                    // is the durable state
                    if let Err(e) = self.sink.advance_cursor(day_epoch(day)).await {
                        tracing::warn!(day = %format_marker(day), error = %e, "Cursor notification failed");
                    }
                }
                Ok(DayOutcome::Empty { rows_fetched }) => {
                    tracing::info!(
                        day = %format_marker(day),
                        rows_fetched,
                        "No billable rows, skipping day"
                    );
                    summary.days_empty += 1;
                }
                Err(e) => {
                    tracing::error!(day = %format_marker(day), error = %e, "Export aborted");
                    summary.error = Some(e.to_string());
                    break;
                }
            }
        }

        Ok(summary.with_duration(start.elapsed()))
    }

    /// Export a single day without touching the marker.
    ///
    /// This backs the manual `tally export` command: re-running a day
    /// overwrites the sink object of the same name, so it is safe to repeat.
    pub async fn export_day(&self, day: NaiveDate, limit: Option<i64>) -> Result<DayOutcome> {
        self.deliver_day(day, limit.unwrap_or(self.row_limit)).await
    }

    /// Build a day's payload without uploading anything.
    pub async fn dry_run(&self, day: NaiveDate, limit: Option<i64>) -> Result<DryRunReport> {
        let records = self
            .usage
            .fetch_usage(day, limit.unwrap_or(self.row_limit))
            .await?;
        let payload = to_csv(&records)?;
        let stats = UsageStats::from_records(&records);

        let mut preview: String = payload.chars().take(PREVIEW_LIMIT).collect();
        if payload.len() > preview.len() {
            preview.push_str("\n... (truncated)");
        }

        Ok(DryRunReport {
            day,
            rows_fetched: records.len(),
            billable_rows: stats.billable_rows,
            total_spend: stats.total_spend,
            total_tokens: stats.total_tokens,
            unique_models: stats.unique_models,
            unique_teams: stats.unique_teams,
            preview,
        })
    }

    async fn deliver_day(&self, day: NaiveDate, limit: i64) -> Result<DayOutcome> {
        let records = self.usage.fetch_usage(day, limit).await?;
        let payload = to_csv(&records)?;

        if payload.trim().is_empty() {
            return Ok(DayOutcome::Empty {
                rows_fetched: records.len(),
            });
        }

        let rows = records.iter().filter(|r| r.is_billable()).count();
        self.sink.upload(&payload, &format_marker(day)).await?;

        Ok(DayOutcome::Uploaded { rows })
    }

    /// Read and parse the stored marker. An unparseable value is treated as
    /// absent so a corrupted row degrades to first-run behavior instead of
    /// wedging the exporter.
    async fn read_marker(&self) -> Result<Option<NaiveDate>> {
        match self.marker_store.read().await? {
            None => Ok(None),
            Some(raw) => match parse_marker(&raw) {
                Some(day) => Ok(Some(day)),
                None => {
                    tracing::warn!(marker = %raw, "Stored marker is not a date, treating as first run");
                    Ok(None)
                }
            },
        }
    }
}
