//! Status command implementation
//!
//! Shows the stored sink settings (key masked), the marker position, and
//! how far back usage data exists.

use crate::adapters::database::traits::{SettingsStore, UsageSource};
use crate::cli::commands::{exit_code_for, AppContext, EXIT_OK};
use crate::core::state::MarkerStore;
use crate::domain::settings::mask_key;
use clap::Args;
use serde_json::Value;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let ctx = match AppContext::connect(config_path).await {
            Ok(ctx) => ctx,
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("📊 Tally status");
        println!();
        println!("Database: {}", ctx.database.connection_string_safe());

        let stored = match ctx.settings_repo.read_settings().await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to read settings row: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!();
        match &stored {
            None => {
                println!("Sink: not registered (no settings row)");
                println!("      Run `tally register` after filling the [sink] config section");
            }
            Some(row) => {
                println!("Sink settings (stored):");
                print_field(row, "api_endpoint", "Endpoint", false);
                print_field(row, "tenant", "Tenant", false);
                print_field(row, "instance_id", "Instance", false);
                print_field(row, "timezone", "Timezone", false);
                print_field(row, "api_key", "API key", true);
            }
        }

        let marker_store = MarkerStore::new(ctx.settings_repo.clone());
        match marker_store.read().await {
            Ok(Some(marker)) => println!("Marker:   {marker} (last fully exported day)"),
            Ok(None) => println!("Marker:   none (first cycle will export yesterday)"),
            Err(e) => println!("Marker:   unreadable ({e})"),
        }

        match ctx.extractor.earliest_usage_date().await {
            Ok(Some(earliest)) => println!("Earliest usage day: {earliest}"),
            Ok(None) => println!("Earliest usage day: no usage rows yet"),
            Err(e) => println!("Earliest usage day: unavailable ({e})"),
        }

        Ok(EXIT_OK)
    }
}

fn print_field(row: &Value, field: &str, label: &str, masked: bool) {
    match row.get(field).and_then(Value::as_str) {
        Some(value) if masked => println!("  {label:<9} {}", mask_key(value)),
        Some(value) => println!("  {label:<9} {value}"),
        None => println!("  {label:<9} (not set)"),
    }
}
