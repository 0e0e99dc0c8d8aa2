//! Resolved sink connection settings
//!
//! Sink settings have two sources: the TOML file (operator-managed) and the
//! settings row in the database (written by `tally register`). Values stored
//! in the database take precedence so a registration survives config-file
//! churn. The marker shares the same row but is owned by the marker store,
//! not by this type.

use crate::config::{SecretString, SecretValue, SinkConfig};
use crate::domain::{Result, TallyError};
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;

/// JSON field names used in the stored settings row
const FIELD_API_KEY: &str = "api_key";
const FIELD_ENDPOINT: &str = "api_endpoint";
const FIELD_TENANT: &str = "tenant";
const FIELD_INSTANCE_ID: &str = "instance_id";
const FIELD_TIMEZONE: &str = "timezone";

/// Fully resolved sink connection settings
///
/// Construction fails fast when a required field is missing, before any
/// network call is attempted.
#[derive(Debug)]
pub struct SinkSettings {
    /// API key sent as the `x-api-key` header
    pub api_key: SecretString,

    /// Sink API base URL, trailing slash stripped
    pub endpoint: String,

    /// Tenant slug used in the control API path
    pub tenant: String,

    /// Instance identifier used in the control API path
    pub instance_id: String,

    /// Timezone label stored alongside the connection settings
    pub timezone: String,
}

impl SinkSettings {
    /// Resolve effective settings from the file config and the stored row.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming every missing required field.
    pub fn resolve(file: &SinkConfig, stored: Option<&Value>) -> Result<Self> {
        let pick = |field: &str, from_file: Option<String>| -> Option<String> {
            stored
                .and_then(|v| v.get(field))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or(from_file.filter(|s| !s.is_empty()))
        };

        let api_key = pick(
            FIELD_API_KEY,
            file.api_key.as_ref().map(|k| k.expose_secret().to_string()),
        );
        let endpoint = pick(FIELD_ENDPOINT, file.endpoint.clone());
        let tenant = pick(FIELD_TENANT, file.tenant.clone());
        let instance_id = pick(FIELD_INSTANCE_ID, file.instance_id.clone());
        let timezone = pick(FIELD_TIMEZONE, Some(file.timezone.clone()))
            .unwrap_or_else(|| "UTC".to_string());

        let mut missing = Vec::new();
        if api_key.is_none() {
            missing.push("api_key");
        }
        if endpoint.is_none() {
            missing.push("api_endpoint");
        }
        if tenant.is_none() {
            missing.push("tenant");
        }
        if instance_id.is_none() {
            missing.push("instance_id");
        }
        if !missing.is_empty() {
            return Err(TallyError::Configuration(format!(
                "missing required sink settings: {}. Run `tally register` or set them in the [sink] section",
                missing.join(", ")
            )));
        }

        Ok(Self {
            api_key: Secret::new(SecretValue::from(api_key.unwrap())),
            endpoint: endpoint.unwrap().trim_end_matches('/').to_string(),
            tenant: tenant.unwrap(),
            instance_id: instance_id.unwrap(),
            timezone,
        })
    }

    /// Render the settings as the JSON object stored in the settings row.
    ///
    /// Used by `tally register`, which writes the whole row; marker advances
    /// go through the marker store's read-merge-write instead.
    pub fn to_stored_value(&self, marker: Option<&str>) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert(
            FIELD_API_KEY.to_string(),
            Value::String(self.api_key.expose_secret().to_string()),
        );
        obj.insert(
            FIELD_ENDPOINT.to_string(),
            Value::String(self.endpoint.clone()),
        );
        obj.insert(FIELD_TENANT.to_string(), Value::String(self.tenant.clone()));
        obj.insert(
            FIELD_INSTANCE_ID.to_string(),
            Value::String(self.instance_id.clone()),
        );
        obj.insert(
            FIELD_TIMEZONE.to_string(),
            Value::String(self.timezone.clone()),
        );
        if let Some(marker) = marker {
            obj.insert("marker".to_string(), Value::String(marker.to_string()));
        }
        Value::Object(obj)
    }

    /// Masked API key for display (first 4 + last 4 characters)
    pub fn masked_key(&self) -> String {
        mask_key(self.api_key.expose_secret().as_ref())
    }
}

/// Mask a credential for display
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file_config() -> SinkConfig {
        SinkConfig {
            endpoint: Some("https://api.sink.example/".to_string()),
            api_key: Some(Secret::new(SecretValue::from("file-key-1234".to_string()))),
            tenant: Some("acme".to_string()),
            instance_id: Some("gw-1".to_string()),
            timezone: "UTC".to_string(),
        }
    }

    #[test]
    fn test_resolve_from_file_only() {
        let settings = SinkSettings::resolve(&file_config(), None).unwrap();
        assert_eq!(settings.endpoint, "https://api.sink.example");
        assert_eq!(settings.tenant, "acme");
        assert_eq!(settings.instance_id, "gw-1");
        assert_eq!(settings.api_key.expose_secret().as_ref(), "file-key-1234");
    }

    #[test]
    fn test_stored_row_overrides_file() {
        let stored = json!({
            "api_key": "db-key-98765",
            "tenant": "acme-prod",
            "marker": "2026-02-17"
        });
        let settings = SinkSettings::resolve(&file_config(), Some(&stored)).unwrap();
        assert_eq!(settings.api_key.expose_secret().as_ref(), "db-key-98765");
        assert_eq!(settings.tenant, "acme-prod");
        // Fields absent from the row fall back to the file
        assert_eq!(settings.instance_id, "gw-1");
    }

    #[test]
    fn test_resolve_fails_fast_listing_missing_fields() {
        let file = SinkConfig {
            endpoint: None,
            api_key: None,
            tenant: Some("acme".to_string()),
            instance_id: None,
            timezone: "UTC".to_string(),
        };
        let err = SinkSettings::resolve(&file, None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("api_key"));
        assert!(message.contains("api_endpoint"));
        assert!(message.contains("instance_id"));
        assert!(!message.contains("tenant,"));
    }

    #[test]
    fn test_to_stored_value_round_trip() {
        let settings = SinkSettings::resolve(&file_config(), None).unwrap();
        let value = settings.to_stored_value(Some("2026-02-17"));
        assert_eq!(value["api_endpoint"], "https://api.sink.example");
        assert_eq!(value["marker"], "2026-02-17");

        let resolved = SinkSettings::resolve(&file_config(), Some(&value)).unwrap();
        assert_eq!(resolved.tenant, "acme");
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-live-abcdef123456"), "sk-l...3456");
        assert_eq!(mask_key("short"), "****");
        assert_eq!(mask_key(""), "****");
    }

    #[test]
    fn test_mask_key_handles_multibyte_characters() {
        // Characters, not bytes: keys with non-ASCII content must not panic
        assert_eq!(mask_key("clé-secrète-αβγδ"), "clé-...αβγδ");
        assert_eq!(mask_key("ключ-доступа"), "ключ...тупа");
        // 8 bytes but fewer than 8 characters stays fully masked
        assert_eq!(mask_key("αααα"), "****");
    }

    #[test]
    fn test_debug_output_redacts_api_key() {
        let settings = SinkSettings::resolve(&file_config(), None).unwrap();
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("file-key-1234"));
        assert!(rendered.contains("acme"));
    }
}
