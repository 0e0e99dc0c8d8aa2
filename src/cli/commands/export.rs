//! Export command implementation
//!
//! Manual single-day export. Unlike the scheduled loop this never advances
//! the marker: re-running a day simply overwrites the sink object of the
//! same name.

use crate::cli::commands::{exit_code_for, AppContext, EXIT_CONFIG, EXIT_OK};
use crate::core::export::DayOutcome;
use chrono::{Duration, NaiveDate, Utc};
use clap::Args;
use std::io::Write;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Day to export (YYYY-MM-DD, defaults to yesterday UTC)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Override the configured row limit for this run
    #[arg(long)]
    pub limit: Option<i64>,

    /// Build the payload and print a preview without uploading
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let today = Utc::now().date_naive();
        let day = self.date.unwrap_or(today - Duration::days(1));

        if day >= today {
            println!("❌ Cannot export {day}: rows for the current day are still accumulating");
            return Ok(EXIT_CONFIG);
        }

        let ctx = match AppContext::connect(config_path).await {
            Ok(ctx) => ctx,
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let orchestrator = match ctx.orchestrator().await {
            Ok(o) => o,
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        if self.dry_run {
            return match orchestrator.dry_run(day, self.limit).await {
                Ok(report) => {
                    println!("🔍 Dry run for {day}");
                    println!();
                    println!("  Rows fetched:    {}", report.rows_fetched);
                    println!("  Billable rows:   {}", report.billable_rows);
                    println!("  Total spend:     ${:.4}", report.total_spend);
                    println!("  Total tokens:    {}", report.total_tokens);
                    println!("  Unique models:   {}", report.unique_models);
                    println!("  Unique teams:    {}", report.unique_teams);
                    println!();
                    if report.preview.is_empty() {
                        println!("  (empty payload, nothing would be uploaded)");
                    } else {
                        println!("Payload preview:");
                        println!("{}", report.preview);
                    }
                    Ok(EXIT_OK)
                }
                Err(e) => {
                    println!("❌ Dry run failed: {e}");
                    Ok(exit_code_for(&e))
                }
            };
        }

        if !self.yes && !confirm(&format!("Export {day} to the sink? [y/N] "))? {
            println!("Aborted");
            return Ok(EXIT_OK);
        }

        match orchestrator.export_day(day, self.limit).await {
            Ok(DayOutcome::Uploaded { rows }) => {
                println!("✅ Exported {day}: {rows} billable rows delivered");
                println!("   (marker unchanged; manual exports do not advance it)");
                Ok(EXIT_OK)
            }
            Ok(DayOutcome::Empty { rows_fetched }) => {
                println!("✅ Nothing billable for {day} ({rows_fetched} rows fetched), no upload performed");
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Export failed: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt}");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_args_defaults() {
        let args = ExportArgs {
            date: None,
            limit: None,
            dry_run: false,
            yes: false,
        };
        assert!(args.date.is_none());
        assert!(!args.dry_run);
    }
}
