//! Run command implementation
//!
//! Starts the scheduled export loop and blocks until shutdown. With
//! `--once`, runs a single lock-guarded cycle and exits with a code that
//! reflects how far the cycle got.

use crate::cli::commands::{exit_code_for, AppContext, EXIT_OK, EXIT_PARTIAL};
use crate::core::schedule::Scheduler;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override the configured interval between cycles, in minutes
    #[arg(long)]
    pub interval_minutes: Option<u64>,

    /// Run a single lock-guarded cycle and exit instead of looping
    #[arg(long)]
    pub once: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let ctx = match AppContext::connect(config_path).await {
            Ok(ctx) => ctx,
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let orchestrator = match ctx.orchestrator().await {
            Ok(o) => Arc::new(o),
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let mut export_config = ctx.config.export.clone();
        if let Some(minutes) = self.interval_minutes {
            export_config.interval_minutes = minutes.max(1);
        }

        if self.once {
            let scheduler = Scheduler::new(orchestrator, ctx.database.clone(), export_config);
            return match scheduler.run_once().await {
                Ok(Some(summary)) if summary.is_complete() => {
                    println!(
                        "✅ Cycle complete: {} of {} days uploaded, {} rows",
                        summary.days_uploaded, summary.days_due, summary.rows_exported
                    );
                    Ok(EXIT_OK)
                }
                Ok(Some(summary)) => {
                    println!(
                        "⚠️  Cycle aborted after {} of {} days: {}",
                        summary.days_uploaded,
                        summary.days_due,
                        summary.error.as_deref().unwrap_or("unknown error")
                    );
                    Ok(EXIT_PARTIAL)
                }
                Ok(None) => {
                    println!("⏭️  Another instance holds the export lock, nothing to do");
                    Ok(EXIT_OK)
                }
                Err(e) => {
                    println!("❌ {e}");
                    Ok(exit_code_for(&e))
                }
            };
        }

        println!(
            "🚀 Tally scheduler started (every {} minutes, database {})",
            export_config.interval_minutes,
            ctx.database.connection_string_safe()
        );

        let scheduler = Scheduler::new(orchestrator, ctx.database.clone(), export_config);
        match scheduler.run(shutdown).await {
            Ok(()) => {
                println!("👋 Scheduler stopped");
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Scheduler failed: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}
