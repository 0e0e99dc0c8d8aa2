//! Configuration management module

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, DatabaseConfig, ExportConfig, LoggingConfig, RetryConfig, SinkConfig,
    TallyConfig,
};
pub use secret::{SecretString, SecretValue};
