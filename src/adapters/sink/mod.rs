//! Analytics sink adapter
//!
//! The sink exposes a small control API (authenticated with `x-api-key`)
//! that hands out signed object-store URLs, plus the object store itself.
//! The orchestrator depends on the [`SinkTransport`] trait; [`SinkClient`]
//! is the HTTP implementation.

pub mod client;

pub use client::{Registration, SinkClient};

use crate::domain::Result;
use async_trait::async_trait;

/// Operations the export cycle needs from the sink
#[async_trait]
pub trait SinkTransport: Send + Sync {
    /// Deliver one day's payload under the given target id.
    ///
    /// An empty or whitespace-only payload returns `Ok` without any network
    /// traffic. Re-uploading the same target id overwrites the previous
    /// object, which is what makes retried days idempotent.
    async fn upload(&self, payload: &str, target_id: &str) -> Result<()>;

    /// Report the export cursor (epoch seconds) to the sink.
    ///
    /// Callers treat failures as advisory; the durable marker lives in the
    /// local settings row, not at the sink.
    async fn advance_cursor(&self, epoch_seconds: i64) -> Result<()>;
}
