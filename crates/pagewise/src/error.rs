use std::path::PathBuf;
use thiserror::Error;

use crate::tracker::JobStatus;

#[derive(Error, Debug)]
pub enum PagewiseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid value '{value}' for environment variable {name}: {reason}")]
    EnvOverride {
        name: String,
        value: String,
        reason: String,
    },
}

/// Outcome of a failed stage invocation.
///
/// `Failed` is an expected degraded outcome (backend error, timeout,
/// malformed response) that the page pipeline recovers from. `Defect`
/// is anything the stage contract does not anticipate and aborts the page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("{0}")]
    Failed(String),

    #[error("defect: {0}")]
    Defect(String),
}

impl StageError {
    pub fn failed(message: impl Into<String>) -> Self {
        StageError::Failed(message.into())
    }

    pub fn defect(message: impl Into<String>) -> Self {
        StageError::Defect(message.into())
    }

    pub fn is_defect(&self) -> bool {
        matches!(self, StageError::Defect(_))
    }
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("No pages to process")]
    EmptyInput,

    #[error("Page task could not be joined: {0}")]
    Runtime(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to create index directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write artifact '{path}': {source}")]
    WriteArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read artifact '{path}': {source}")]
    ReadArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete artifact '{path}': {source}")]
    DeleteArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode artifact: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid document id: {0}")]
    InvalidDocumentId(String),
}

pub type Result<T> = std::result::Result<T, PagewiseError>;
