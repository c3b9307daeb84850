//! Builder for test configurations.

#![allow(dead_code)]

use pagewise::Config;

/// Fluent builder over [`Config::default`].
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn max_concurrent_pages(mut self, limit: usize) -> Self {
        self.config.max_concurrent_pages = limit;
        self
    }

    pub fn retention_hours(mut self, hours: u64) -> Self {
        self.config.retention_hours = hours;
        self
    }

    pub fn stage_timeout_secs(mut self, secs: u64) -> Self {
        self.config.stage_timeout_secs = Some(secs);
        self
    }

    pub fn chunking(mut self, size: usize, overlap: usize) -> Self {
        self.config.index.chunk_size = size;
        self.config.index.chunk_overlap = overlap;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }

    /// The configuration as JSON, for loader tests.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.config).expect("Failed to serialize config")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
