//! Concurrent per-page document enrichment with live job progress.
//!
//! A submitted document is a list of page images. Each page runs through
//! an enhance, extract-text, analyze pipeline of injected [`stage::Stage`]
//! backends, with at most a configured number of pages in flight. Page
//! results come back in page order, page failures stay local to their
//! page, and the job's progress can be polled or streamed while it runs.

pub mod adapters;
pub mod aggregate;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod scheduler;
pub mod service;
pub mod stage;
pub mod telemetry;
pub mod tracker;

pub use aggregate::BatchAggregator;
pub use broadcast::{JobProgressBroadcaster, JobProgressEvent};
pub use config::{load_config, load_config_from_str, Config, SchedulerConfig};
pub use error::{
    ConfigError, IndexError, PagewiseError, Result, SchedulerError, ServiceError, StageError,
    TrackerError,
};
pub use index::{ArtifactIndex, FileArtifactIndex, TextChunker};
pub use pipeline::{
    ActionItem, AnalysisBundle, PageAnalysis, PageDefect, PagePipeline, PageResult, PageSubstep,
    ProgressReporter, StageTimeouts, Summary,
};
pub use scheduler::{ActiveRunGauge, PageSink, Scheduler};
pub use service::{
    JobListing, JobService, JobStatusView, PageInput, RetentionSweeper, SubmittedJob,
};
pub use stage::{AnalysisRequest, PageImage, Stage};
pub use tracker::{CleanupReport, Job, JobStatus, JobStore, PageErrorEntry};
