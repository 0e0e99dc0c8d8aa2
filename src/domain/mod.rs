//! Core domain types and models
//!
//! This module contains the types shared across the exporter: the error
//! taxonomy, the usage row model, and resolved sink connection settings.

pub mod errors;
pub mod record;
pub mod result;
pub mod settings;

pub use errors::{SinkError, TallyError};
pub use record::UsageRecord;
pub use result::Result;
pub use settings::SinkSettings;
