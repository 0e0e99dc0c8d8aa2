//! Core business logic
//!
//! Export orchestration, CSV transformation, marker state, and scheduling.

pub mod export;
pub mod schedule;
pub mod state;
pub mod transform;
