use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::index::TextChunker;
use crate::pipeline::StageTimeouts;

use super::SchedulerConfig;
use crate::error::ConfigError;

pub const CONFIG_VERSION: &str = "1.0";

/// Upper bound on `retention_hours` (100 years).
pub const MAX_RETENTION_HOURS: u64 = 876_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: usize,
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Where enhanced page images are written.
    #[serde(default = "default_processed_directory")]
    pub processed_directory: String,
    #[serde(default)]
    pub enhancement: EnhancementConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub index: IndexConfig,
    /// Deadline applied to every stage call. Unbounded when absent.
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,
}

fn default_max_concurrent_pages() -> usize {
    4
}

fn default_retention_hours() -> u64 {
    24
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

fn default_processed_directory() -> String {
    "/tmp/pagewise/processed".to_string()
}

impl Config {
    pub fn scheduler(&self) -> Result<SchedulerConfig, ConfigError> {
        SchedulerConfig::new(self.max_concurrent_pages)
    }

    /// Age after which finished jobs are swept.
    pub fn retention(&self) -> Result<chrono::Duration, ConfigError> {
        let out_of_range = || ConfigError::Validation {
            message: format!(
                "retention_hours must be between 1 and {}, got {}",
                MAX_RETENTION_HOURS, self.retention_hours
            ),
        };
        if self.retention_hours == 0 || self.retention_hours > MAX_RETENTION_HOURS {
            return Err(out_of_range());
        }
        let hours = i64::try_from(self.retention_hours).map_err(|_| out_of_range())?;
        chrono::Duration::try_hours(hours).ok_or_else(out_of_range)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn stage_timeouts(&self) -> StageTimeouts {
        StageTimeouts::uniform(self.stage_timeout_secs.map(Duration::from_secs))
    }

    pub fn chunker(&self) -> TextChunker {
        TextChunker::new(self.index.chunk_size, self.index.chunk_overlap)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            max_concurrent_pages: default_max_concurrent_pages(),
            retention_hours: default_retention_hours(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            processed_directory: default_processed_directory(),
            enhancement: EnhancementConfig::default(),
            ocr: OcrConfig::default(),
            analysis: AnalysisConfig::default(),
            index: IndexConfig::default(),
            stage_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Images whose shorter side is below this many pixels are upscaled.
    #[serde(default = "default_upscale_below")]
    pub upscale_below: u32,
    #[serde(default = "default_contrast")]
    pub contrast: f32,
}

fn default_true() -> bool {
    true
}

fn default_upscale_below() -> u32 {
    1000
}

fn default_contrast() -> f32 {
    30.0
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            upscale_below: default_upscale_below(),
            contrast: default_contrast(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

fn default_dpi() -> u32 {
    300
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            dpi: default_dpi(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "mistral:7b-instruct".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_storage_directory")]
    pub storage_directory: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_storage_directory() -> String {
    "/tmp/pagewise/index".to_string()
}

fn default_chunk_size() -> usize {
    TextChunker::DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    TextChunker::DEFAULT_CHUNK_OVERLAP
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            storage_directory: default_storage_directory(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config = serde_json::from_str(r#"{"version": "1.0"}"#).unwrap();
        assert_eq!(config.max_concurrent_pages, 4);
        assert_eq!(config.retention_hours, 24);
        assert!(config.enhancement.enabled);
        assert_eq!(config.ocr.languages, vec!["eng"]);
        assert_eq!(config.analysis.host, "http://localhost:11434");
        assert_eq!(config.index.chunk_size, 1000);
        assert_eq!(config.index.chunk_overlap, 200);
        assert!(config.stage_timeout_secs.is_none());
    }

    #[test]
    fn test_derived_settings() {
        let config = Config {
            stage_timeout_secs: Some(30),
            retention_hours: 2,
            ..Config::default()
        };
        assert_eq!(config.retention().unwrap(), chrono::Duration::hours(2));
        assert_eq!(
            config.stage_timeouts().extract,
            Some(Duration::from_secs(30))
        );
        assert_eq!(config.scheduler().unwrap().concurrency_limit(), 4);
        assert_eq!(config.chunker().chunk_size(), 1000);
    }

    #[test]
    fn test_retention_out_of_range_is_error() {
        for hours in [0, MAX_RETENTION_HOURS + 1, 3_000_000_000_000, u64::MAX] {
            let config = Config {
                retention_hours: hours,
                ..Config::default()
            };
            assert!(
                matches!(config.retention(), Err(ConfigError::Validation { .. })),
                "retention_hours {}",
                hours
            );
        }

        let config = Config {
            retention_hours: MAX_RETENTION_HOURS,
            ..Config::default()
        };
        assert_eq!(
            config.retention().unwrap(),
            chrono::Duration::hours(MAX_RETENTION_HOURS as i64)
        );
    }
}
