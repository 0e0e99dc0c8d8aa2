//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::TallyConfig;
use crate::config::SecretValue;
use crate::domain::errors::TallyError;
use crate::domain::result::Result;
use regex::Regex;
use secrecy::Secret;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into TallyConfig
/// 4. Applies environment variable overrides (TALLY_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read, TOML parsing fails, a
/// referenced environment variable is unset, or validation fails.
pub fn load_config(path: impl AsRef<Path>) -> Result<TallyConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TallyError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        TallyError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: TallyConfig = toml::from_str(&contents)
        .map_err(|e| TallyError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config
        .validate()
        .map_err(|e| TallyError::Configuration(format!("Configuration validation failed: {e}")))?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched. All missing variables are collected and
/// reported together.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(TallyError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the TALLY_* prefix
///
/// Variables follow the pattern TALLY_<SECTION>_<KEY>, for example
/// TALLY_DATABASE_CONNECTION_STRING or TALLY_SINK_API_KEY.
fn apply_env_overrides(config: &mut TallyConfig) {
    if let Ok(val) = std::env::var("TALLY_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Ok(val) = std::env::var("TALLY_DATABASE_CONNECTION_STRING") {
        config.database.connection_string = val;
    }
    if let Ok(val) = std::env::var("TALLY_DATABASE_MAX_CONNECTIONS") {
        if let Ok(size) = val.parse() {
            config.database.max_connections = size;
        }
    }

    if let Ok(val) = std::env::var("TALLY_SINK_ENDPOINT") {
        config.sink.endpoint = Some(val);
    }
    if let Ok(val) = std::env::var("TALLY_SINK_API_KEY") {
        config.sink.api_key = Some(Secret::new(SecretValue::from(val)));
    }
    if let Ok(val) = std::env::var("TALLY_SINK_TENANT") {
        config.sink.tenant = Some(val);
    }
    if let Ok(val) = std::env::var("TALLY_SINK_INSTANCE_ID") {
        config.sink.instance_id = Some(val);
    }
    if let Ok(val) = std::env::var("TALLY_SINK_TIMEZONE") {
        config.sink.timezone = val;
    }

    if let Ok(val) = std::env::var("TALLY_EXPORT_INTERVAL_MINUTES") {
        if let Ok(minutes) = val.parse() {
            config.export.interval_minutes = minutes;
        }
    }
    if let Ok(val) = std::env::var("TALLY_EXPORT_ROW_LIMIT") {
        if let Ok(limit) = val.parse() {
            config.export.row_limit = limit;
        }
    }
    if let Ok(val) = std::env::var("TALLY_EXPORT_LOCK_ENABLED") {
        config.export.lock_enabled = val.parse().unwrap_or(true);
    }

    if let Ok(val) = std::env::var("TALLY_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("TALLY_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("TALLY_TEST_VAR", "test_value");
        let input = "api_key = \"${TALLY_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "api_key = \"test_value\"\n");
        std::env::remove_var("TALLY_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("TALLY_MISSING_VAR");
        let input = "api_key = \"${TALLY_MISSING_VAR}\"";
        let result = substitute_env_vars(input);
        assert!(result.is_err());
    }

    #[test]
    fn test_substitute_skips_comments() {
        std::env::remove_var("TALLY_COMMENTED_VAR");
        let input = "# api_key = \"${TALLY_COMMENTED_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("TALLY_COMMENTED_VAR"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[database]
connection_string = "host=localhost user=gateway dbname=gateway"

[sink]
endpoint = "https://api.sink.example"
tenant = "acme"
instance_id = "gw-1"

[export]
interval_minutes = 30
row_limit = 50000
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.sink.tenant.as_deref(), Some("acme"));
        assert_eq!(config.export.interval_minutes, 30);
        assert_eq!(config.export.row_limit, 50_000);
        // Unset sections fall back to defaults
        assert_eq!(config.export.retry.max_attempts, 3);
        assert!(!config.logging.local_enabled);
    }

    #[test]
    fn test_load_config_invalid_values_rejected() {
        let toml_content = r#"
[database]
connection_string = ""
"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        assert!(load_config(temp_file.path()).is_err());
    }
}
