//! Scheduled export loop
//!
//! Runs an export cycle on a fixed interval. Each tick takes the database
//! advisory lock first (unless locking is disabled), so multiple exporter
//! instances pointed at the same gateway database interleave instead of
//! double-sending. Ticks are sequential; a slow cycle delays the next tick
//! rather than overlapping it.

use crate::adapters::database::DatabaseClient;
use crate::config::ExportConfig;
use crate::core::export::{ExportOrchestrator, ExportSummary};
use crate::domain::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Scheduler for recurring export cycles
pub struct Scheduler {
    orchestrator: Arc<ExportOrchestrator>,
    database: Arc<DatabaseClient>,
    config: ExportConfig,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<ExportOrchestrator>,
        database: Arc<DatabaseClient>,
        config: ExportConfig,
    ) -> Self {
        Self {
            orchestrator,
            database,
            config,
        }
    }

    /// Run until the shutdown signal fires.
    ///
    /// The first tick runs immediately; later ticks follow the configured
    /// interval. A tick that errors is logged and the loop continues.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let interval = Duration::from_secs(self.config.interval_minutes * 60);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_minutes = self.config.interval_minutes,
            lock_enabled = self.config.lock_enabled,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_tick().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Shutdown signal received, stopping scheduler");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Run a single lock-guarded cycle and return its summary.
    ///
    /// Backs `tally run --once`, where the caller inspects the summary to
    /// pick an exit code. Returns `Ok(None)` when another instance holds
    /// the export lock.
    ///
    /// # Errors
    ///
    /// Returns an error when the lock cannot be queried or the cycle itself
    /// fails before producing a summary.
    pub async fn run_once(&self) -> Result<Option<ExportSummary>> {
        if !self.config.lock_enabled {
            return Ok(Some(self.orchestrator.run_cycle().await?));
        }

        match self.database.try_advisory_lock().await? {
            Some(lock) => {
                let outcome = self.orchestrator.run_cycle().await;
                if let Err(e) = lock.release().await {
                    tracing::warn!(error = %e, "Failed to release export lock");
                }
                Ok(Some(outcome?))
            }
            None => {
                tracing::info!("Another instance holds the export lock");
                Ok(None)
            }
        }
    }

    async fn run_tick(&self) {
        if !self.config.lock_enabled {
            self.run_cycle_logged().await;
            return;
        }

        match self.database.try_advisory_lock().await {
            Ok(Some(lock)) => {
                self.run_cycle_logged().await;
                if let Err(e) = lock.release().await {
                    tracing::warn!(error = %e, "Failed to release export lock");
                }
            }
            Ok(None) => {
                tracing::info!("Another instance holds the export lock, skipping tick");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not acquire export lock, skipping tick");
            }
        }
    }

    async fn run_cycle_logged(&self) {
        match self.orchestrator.run_cycle().await {
            Ok(summary) => {
                if let Some(error) = &summary.error {
                    tracing::warn!(
                        days_uploaded = summary.days_uploaded,
                        days_due = summary.days_due,
                        error = %error,
                        "Export cycle aborted, will resume next tick"
                    );
                } else {
                    tracing::info!(
                        days_due = summary.days_due,
                        days_uploaded = summary.days_uploaded,
                        days_empty = summary.days_empty,
                        rows_exported = summary.rows_exported,
                        duration_ms = summary.duration.as_millis() as u64,
                        "Export cycle complete"
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Export cycle failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::database::traits::{SettingsStore, UsageSource};
    use crate::adapters::sink::SinkTransport;
    use crate::config::DatabaseConfig;
    use crate::core::state::MarkerStore;
    use crate::domain::record::test_support::record;
    use crate::domain::{SinkError, TallyError, UsageRecord};
    use async_trait::async_trait;
    use chrono::{Days, NaiveDate, Utc};
    use serde_json::Value;
    use std::sync::Mutex;

    struct StubUsage {
        day: NaiveDate,
    }

    #[async_trait]
    impl UsageSource for StubUsage {
        async fn fetch_usage(&self, day: NaiveDate, _limit: i64) -> Result<Vec<UsageRecord>> {
            if day == self.day {
                Ok(vec![record(day, 2)])
            } else {
                Ok(Vec::new())
            }
        }

        async fn earliest_usage_date(&self) -> Result<Option<NaiveDate>> {
            Ok(Some(self.day))
        }
    }

    struct StubSink {
        fail: bool,
    }

    #[async_trait]
    impl SinkTransport for StubSink {
        async fn upload(&self, _payload: &str, _target_id: &str) -> Result<()> {
            if self.fail {
                return Err(TallyError::Sink(SinkError::Transient {
                    status: 503,
                    message: "unavailable".to_string(),
                }));
            }
            Ok(())
        }

        async fn advance_cursor(&self, _epoch_seconds: i64) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySettings {
        value: Mutex<Option<Value>>,
    }

    #[async_trait]
    impl SettingsStore for MemorySettings {
        async fn read_settings(&self) -> Result<Option<Value>> {
            Ok(self.value.lock().unwrap().clone())
        }

        async fn write_settings(&self, settings: &Value) -> Result<()> {
            *self.value.lock().unwrap() = Some(settings.clone());
            Ok(())
        }
    }

    fn database() -> Arc<DatabaseClient> {
        // Never connected: the tests below disable locking, so the pool
        // stays idle
        Arc::new(
            DatabaseClient::new(DatabaseConfig {
                connection_string: "host=localhost user=gateway dbname=gateway".to_string(),
                max_connections: 1,
                connection_timeout_seconds: 1,
                statement_timeout_seconds: 1,
            })
            .unwrap(),
        )
    }

    fn scheduler(sink_fails: bool) -> Scheduler {
        let yesterday = Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(1))
            .unwrap();
        let orchestrator = ExportOrchestrator::new(
            Arc::new(StubUsage { day: yesterday }),
            Arc::new(StubSink { fail: sink_fails }),
            MarkerStore::new(Arc::new(MemorySettings::default())),
            100_000,
        );

        let config = ExportConfig {
            lock_enabled: false,
            ..ExportConfig::default()
        };
        Scheduler::new(Arc::new(orchestrator), database(), config)
    }

    #[tokio::test]
    async fn test_run_once_returns_cycle_summary() {
        let summary = scheduler(false).run_once().await.unwrap().unwrap();
        assert!(summary.is_complete());
        assert_eq!(summary.days_uploaded, 1);
        assert_eq!(summary.rows_exported, 1);
    }

    #[tokio::test]
    async fn test_run_once_reports_aborted_cycle() {
        let summary = scheduler(true).run_once().await.unwrap().unwrap();
        assert!(!summary.is_complete());
        assert_eq!(summary.days_uploaded, 0);
    }
}
