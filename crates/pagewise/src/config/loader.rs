use std::path::Path;

use crate::config::schema::{Config, CONFIG_VERSION, MAX_RETENTION_HOURS};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub const ENV_MAX_CONCURRENT_PAGES: &str = "PAGEWISE_MAX_CONCURRENT_PAGES";
pub const ENV_RETENTION_HOURS: &str = "PAGEWISE_RETENTION_HOURS";
pub const ENV_OLLAMA_HOST: &str = "PAGEWISE_OLLAMA_HOST";
pub const ENV_TEXT_MODEL: &str = "PAGEWISE_TEXT_MODEL";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    config.scheduler()?;

    config.retention()?;

    if config.index.chunk_size == 0 || config.index.chunk_overlap >= config.index.chunk_size {
        return Err(ConfigError::Validation {
            message: format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.index.chunk_overlap, config.index.chunk_size
            ),
        });
    }

    if !config.analysis.host.starts_with("http://") && !config.analysis.host.starts_with("https://")
    {
        return Err(ConfigError::Validation {
            message: format!("Analysis host must be an http(s) URL: {}", config.analysis.host),
        });
    }

    Ok(())
}

impl Config {
    /// Applies `PAGEWISE_*` environment variables on top of the loaded values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::apply_env_overrides`] with a custom variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_CONCURRENT_PAGES) {
            self.max_concurrent_pages = parse_positive(ENV_MAX_CONCURRENT_PAGES, &value)?;
        }
        if let Some(value) = lookup(ENV_RETENTION_HOURS) {
            let hours: u64 = parse_positive(ENV_RETENTION_HOURS, &value)?;
            if hours > MAX_RETENTION_HOURS {
                return Err(env_error(
                    ENV_RETENTION_HOURS,
                    &value,
                    &format!("must be at most {}", MAX_RETENTION_HOURS),
                ));
            }
            self.retention_hours = hours;
        }
        if let Some(value) = lookup(ENV_OLLAMA_HOST) {
            let host = value.trim();
            if host.is_empty() {
                return Err(env_error(ENV_OLLAMA_HOST, &value, "must not be empty"));
            }
            self.analysis.host = host.trim_end_matches('/').to_string();
        }
        if let Some(value) = lookup(ENV_TEXT_MODEL) {
            let model = value.trim();
            if model.is_empty() {
                return Err(env_error(ENV_TEXT_MODEL, &value, "must not be empty"));
            }
            self.analysis.model = model.to_string();
        }
        Ok(())
    }
}

fn parse_positive<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let parsed: T = value
        .trim()
        .parse()
        .map_err(|e: T::Err| env_error(name, value, &e.to_string()))?;
    if parsed <= T::default() {
        return Err(env_error(name, value, "must be at least 1"));
    }
    Ok(parsed)
}

fn env_error(name: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::EnvOverride {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_load_valid_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "max_concurrent_pages": 8,
            "retention_hours": 12,
            "enhancement": { "enabled": false },
            "ocr": { "languages": ["eng", "deu"], "dpi": 300 },
            "analysis": { "host": "http://ollama:11434", "model": "llama3" },
            "index": { "storage_directory": "/data/index", "chunk_size": 500, "chunk_overlap": 50 },
            "stage_timeout_secs": 60
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.max_concurrent_pages, 8);
        assert_eq!(config.retention_hours, 12);
        assert!(!config.enhancement.enabled);
        assert_eq!(config.ocr.languages, vec!["eng", "deu"]);
        assert_eq!(config.analysis.model, "llama3");
        assert_eq!(config.index.chunk_size, 500);
        assert_eq!(config.stage_timeout_secs, Some(60));
    }

    #[test]
    fn test_unknown_field_fails_schema() {
        let err = load_config_from_str(r#"{"version": "1.0", "worker_count": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_zero_concurrency_fails_schema() {
        let err =
            load_config_from_str(r#"{"version": "1.0", "max_concurrent_pages": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let err = load_config_from_str(r#"{"version": "2.0"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let err = load_config_from_str(
            r#"{"version": "1.0", "index": {"chunk_size": 100, "chunk_overlap": 100}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let err = load_config_from_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/nonexistent/pagewise.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_MAX_CONCURRENT_PAGES, "2"),
            (ENV_RETENTION_HOURS, " 48 "),
            (ENV_OLLAMA_HOST, "http://gpu-box:11434/"),
            (ENV_TEXT_MODEL, "mistral"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides_from(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.max_concurrent_pages, 2);
        assert_eq!(config.retention_hours, 48);
        assert_eq!(config.analysis.host, "http://gpu-box:11434");
        assert_eq!(config.analysis.model, "mistral");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides_from(|name| {
                (name == ENV_MAX_CONCURRENT_PAGES).then(|| "zero".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvOverride { ref name, .. } if name == ENV_MAX_CONCURRENT_PAGES));

        let err = config
            .apply_overrides_from(|name| (name == ENV_RETENTION_HOURS).then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvOverride { .. }));
        assert_eq!(config.max_concurrent_pages, 4);
    }

    #[test]
    fn test_retention_above_bound_rejected_from_file() {
        let err = load_config_from_str(r#"{"version": "1.0", "retention_hours": 876001}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));

        let config =
            load_config_from_str(r#"{"version": "1.0", "retention_hours": 876000}"#).unwrap();
        assert_eq!(config.retention().unwrap(), chrono::Duration::hours(876_000));
    }

    #[test]
    fn test_retention_override_above_bound_rejected() {
        for value in ["876001", "3000000000000", "18446744073709551615"] {
            let mut config = Config::default();
            let err = config
                .apply_overrides_from(|name| {
                    (name == ENV_RETENTION_HOURS).then(|| value.to_string())
                })
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::EnvOverride { ref name, .. } if name == ENV_RETENTION_HOURS),
                "value {}",
                value
            );
            assert_eq!(config.retention_hours, 24);
            assert_eq!(config.retention().unwrap(), chrono::Duration::hours(24));
        }
    }
}
