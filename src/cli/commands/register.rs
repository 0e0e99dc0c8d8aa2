//! Register command implementation
//!
//! One-time handshake with the analytics sink. Persists the effective sink
//! settings and the initial export marker into the settings row. If the
//! handshake itself fails, the settings are still saved with a
//! first-of-month default marker so the scheduler can start; the sink then
//! learns about this instance on the first cursor notification.

use crate::adapters::database::traits::SettingsStore;
use crate::adapters::sink::SinkClient;
use crate::cli::commands::{exit_code_for, AppContext, EXIT_OK};
use crate::core::state::{format_marker, marker_from_epoch};
use clap::Args;
use chrono::Utc;

/// Arguments for the register command
#[derive(Args, Debug)]
pub struct RegisterArgs {}

impl RegisterArgs {
    /// Execute the register command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let ctx = match AppContext::connect(config_path).await {
            Ok(ctx) => ctx,
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let settings = match ctx.sink_settings().await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("🔗 Registering with sink at {}", settings.endpoint);
        println!("   Tenant:   {}", settings.tenant);
        println!("   Instance: {}", settings.instance_id);
        println!("   API key:  {}", settings.masked_key());
        println!();

        let client = match SinkClient::new(settings, &ctx.config.export) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let now = Utc::now();
        let marker_epoch = match client.register().await {
            Ok(registration) => {
                if let Some(id) = &registration.id {
                    println!("✅ Registered as {id}");
                }
                registration.metrics_marker
            }
            Err(e) => {
                println!("⚠️  Registration call failed: {e}");
                println!("   Saving settings anyway with a first-of-month marker");
                0
            }
        };

        let marker = marker_from_epoch(marker_epoch, now);

        // Re-resolve after the round trip so we write what was actually used
        let settings = match ctx.sink_settings().await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };
        let row = settings.to_stored_value(Some(&format_marker(marker)));
        if let Err(e) = ctx.settings_repo.write_settings(&row).await {
            println!("❌ Failed to persist settings: {e}");
            return Ok(exit_code_for(&e));
        }

        println!();
        println!("✅ Sink settings saved");
        println!("   Export resumes after: {}", format_marker(marker));
        println!("   Next: tally run");
        Ok(EXIT_OK)
    }
}
