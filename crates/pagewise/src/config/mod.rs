pub mod loader;
pub mod schema;

use crate::error::ConfigError;

pub use loader::{load_config, load_config_from_str};
pub use schema::{
    AnalysisConfig, Config, EnhancementConfig, IndexConfig, OcrConfig, CONFIG_VERSION,
    MAX_RETENTION_HOURS,
};

/// Settings for the page scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    concurrency_limit: usize,
}

impl SchedulerConfig {
    pub const DEFAULT_CONCURRENCY_LIMIT: usize = 4;

    pub fn new(concurrency_limit: usize) -> Result<Self, ConfigError> {
        if concurrency_limit == 0 {
            return Err(ConfigError::Validation {
                message: "concurrency limit must be at least 1".to_string(),
            });
        }
        Ok(Self { concurrency_limit })
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: Self::DEFAULT_CONCURRENCY_LIMIT,
        }
    }
}
