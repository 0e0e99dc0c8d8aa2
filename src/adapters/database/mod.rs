//! Gateway database adapter

pub mod client;
pub mod extractor;
pub mod settings;
pub mod traits;

pub use client::{AdvisoryLock, DatabaseClient};
pub use extractor::UsageExtractor;
pub use settings::SettingsRepository;
pub use traits::{SettingsStore, UsageSource};
