// Tally - LLM Gateway Usage Exporter
// Copyright (c) 2026 Tally Contributors
// Licensed under the MIT License

//! # Tally - incremental usage/spend exporter
//!
//! Tally exports accumulated per-day usage and spend rows from an LLM
//! gateway's PostgreSQL database to an analytics sink, via signed-URL
//! resumable uploads, on a recurring schedule.
//!
//! ## Overview
//!
//! Each cycle walks the days between the stored marker and yesterday:
//!
//! - **Extract** one day of usage rows, joined with key/team/user metadata
//! - **Transform** them into a CSV payload, dropping zero-success rows
//! - **Upload** the gzip payload through the sink's three-step signed-URL
//!   protocol, named after the day so re-delivery is idempotent
//! - **Commit** the marker for that day, then notify the sink's cursor
//!
//! The marker is committed per day, so a failure mid-backlog resumes at the
//! first undelivered day on the next cycle. The current day is never
//! exported; its rows are still accumulating.
//!
//! ## Architecture
//!
//! Tally follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (export, transform, state, scheduling)
//! - [`adapters`] - External integrations (gateway database, analytics sink)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tally::cli::commands::AppContext;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = AppContext::connect("tally.toml").await?;
//!     let orchestrator = ctx.orchestrator().await?;
//!
//!     let summary = orchestrator.run_cycle().await?;
//!     println!(
//!         "Exported {} of {} due days",
//!         summary.days_uploaded, summary.days_due
//!     );
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
