//! Marker persistence over the settings row
//!
//! The marker lives inside the same JSON object as the sink connection
//! settings, under the `marker` key. Advancing the marker is a
//! read-merge-write: only the `marker` field changes, every other field in
//! the row survives untouched, including fields written by other versions.

use crate::adapters::database::traits::SettingsStore;
use crate::core::state::marker::format_marker;
use crate::domain::Result;
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;

/// JSON field holding the marker inside the settings row
pub const MARKER_FIELD: &str = "marker";

/// Marker store backed by the settings row
pub struct MarkerStore {
    store: Arc<dyn SettingsStore>,
}

impl MarkerStore {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Read the raw stored marker, if present.
    ///
    /// Parsing and the invalid-marker fallback are the orchestrator's
    /// concern; the store only reports what is persisted.
    pub async fn read(&self) -> Result<Option<String>> {
        let settings = self.store.read_settings().await?;
        Ok(settings
            .as_ref()
            .and_then(|v| v.get(MARKER_FIELD))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Advance the marker to the given day.
    ///
    /// # Errors
    ///
    /// Returns a settings error if the row cannot be read or written. The
    /// caller must abort the cycle in that case so the day is re-exported
    /// rather than lost.
    pub async fn advance(&self, day: NaiveDate) -> Result<()> {
        let settings = self.store.read_settings().await?;

        let mut object = match settings {
            Some(Value::Object(map)) => map,
            // Missing or malformed row: start a fresh object so the marker
            // still lands
            _ => serde_json::Map::new(),
        };
        object.insert(
            MARKER_FIELD.to_string(),
            Value::String(format_marker(day)),
        );

        self.store.write_settings(&Value::Object(object)).await?;

        tracing::debug!(marker = %format_marker(day), "Marker advanced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Result;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct MemoryStore {
        value: Mutex<Option<Value>>,
    }

    impl MemoryStore {
        fn new(initial: Option<Value>) -> Arc<Self> {
            Arc::new(Self {
                value: Mutex::new(initial),
            })
        }
    }

    #[async_trait]
    impl SettingsStore for MemoryStore {
        async fn read_settings(&self) -> Result<Option<Value>> {
            Ok(self.value.lock().unwrap().clone())
        }

        async fn write_settings(&self, settings: &Value) -> Result<()> {
            *self.value.lock().unwrap() = Some(settings.clone());
            Ok(())
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_read_absent_row() {
        let store = MarkerStore::new(MemoryStore::new(None));
        assert_eq!(store.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_row_without_marker() {
        let store = MarkerStore::new(MemoryStore::new(Some(json!({"tenant": "acme"}))));
        assert_eq!(store.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_advance_preserves_unknown_fields() {
        let backing = MemoryStore::new(Some(json!({
            "tenant": "acme",
            "api_key": "sk-123",
            "future_field": {"nested": true}
        })));
        let store = MarkerStore::new(backing.clone());

        store.advance(day(2026, 2, 17)).await.unwrap();

        let stored = backing.value.lock().unwrap().clone().unwrap();
        assert_eq!(stored["marker"], "2026-02-17");
        assert_eq!(stored["tenant"], "acme");
        assert_eq!(stored["api_key"], "sk-123");
        assert_eq!(stored["future_field"]["nested"], true);
    }

    #[tokio::test]
    async fn test_advance_creates_row_when_missing() {
        let backing = MemoryStore::new(None);
        let store = MarkerStore::new(backing.clone());

        store.advance(day(2026, 2, 17)).await.unwrap();

        let stored = backing.value.lock().unwrap().clone().unwrap();
        assert_eq!(stored["marker"], "2026-02-17");
    }

    #[tokio::test]
    async fn test_advance_then_read() {
        let backing = MemoryStore::new(Some(json!({})));
        let store = MarkerStore::new(backing);

        store.advance(day(2026, 2, 16)).await.unwrap();
        store.advance(day(2026, 2, 17)).await.unwrap();

        assert_eq!(store.read().await.unwrap().as_deref(), Some("2026-02-17"));
    }
}
