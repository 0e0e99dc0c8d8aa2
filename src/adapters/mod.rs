//! External integrations
//!
//! Adapters for the gateway PostgreSQL database and the analytics sink.

pub mod database;
pub mod sink;
