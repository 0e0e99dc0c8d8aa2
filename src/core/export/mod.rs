//! Export cycle orchestration

pub mod orchestrator;
pub mod summary;

pub use orchestrator::ExportOrchestrator;
pub use summary::{DayOutcome, DryRunReport, ExportSummary};
