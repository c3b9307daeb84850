//! Job submission and queries.
//!
//! [`JobService::submit`] validates the pages, creates the job and hands
//! it to a background task; every other operation reads or removes job
//! records without touching a running job's pipeline.

pub mod input;
pub mod sweeper;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::aggregate::BatchAggregator;
use crate::broadcast::JobProgressEvent;
use crate::config::Config;
use crate::error::{ConfigError, ServiceError};
use crate::index::ArtifactIndex;
use crate::pipeline::{PagePipeline, PageResult};
use crate::scheduler::Scheduler;
use crate::tracker::{CleanupReport, Job, JobStatus, JobStore, PageErrorEntry};

pub use input::{validate_pages, PageInput, SUPPORTED_PAGE_TYPES};
pub use sweeper::RetentionSweeper;

use worker::JobWorker;

/// Acknowledgement returned by [`JobService::submit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedJob {
    pub job_id: String,
    pub status: JobStatus,
}

/// Externally visible state of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    pub id: String,
    pub filename: String,
    pub total_pages: usize,
    pub processed_pages: usize,
    pub status: JobStatus,
    pub progress_percentage: f64,
    pub current_page: usize,
    pub current_step: String,
    pub step_description: String,
    pub errors: Vec<PageErrorEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds, once the job has finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl From<&Job> for JobStatusView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            filename: job.filename.clone(),
            total_pages: job.total_pages,
            processed_pages: job.processed_pages,
            status: job.status,
            progress_percentage: job.progress_percentage,
            current_page: job.current_page,
            current_step: job.current_step.clone(),
            step_description: job.step_description.clone(),
            errors: job.errors.clone(),
            error: job.error.clone(),
            start_time: job.start_time,
            end_time: job.end_time,
            duration: job.duration(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobListing {
    pub jobs: Vec<JobStatusView>,
    pub total_jobs: usize,
    pub active_jobs: usize,
}

pub struct JobService {
    store: Arc<JobStore>,
    scheduler: Arc<Scheduler>,
    aggregator: Arc<BatchAggregator>,
    retention: chrono::Duration,
}

impl JobService {
    pub fn new(
        store: Arc<JobStore>,
        scheduler: Arc<Scheduler>,
        aggregator: Arc<BatchAggregator>,
        retention: chrono::Duration,
    ) -> Self {
        Self {
            store,
            scheduler,
            aggregator,
            retention,
        }
    }

    /// Wires a service from configuration and injected backends.
    pub fn from_config(
        config: &Config,
        pipeline: PagePipeline,
        index: Arc<dyn ArtifactIndex>,
    ) -> Result<Self, ConfigError> {
        let retention = config.retention()?;
        let pipeline = pipeline.with_timeouts(config.stage_timeouts());
        let scheduler = Scheduler::new(Arc::new(pipeline), config.scheduler()?);
        Ok(Self::new(
            Arc::new(JobStore::new()),
            Arc::new(scheduler),
            Arc::new(BatchAggregator::new(index)),
            retention,
        ))
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Accepts a document and starts processing it in the background.
    pub async fn submit(
        &self,
        filename: &str,
        pages: Vec<PageInput>,
    ) -> Result<SubmittedJob, ServiceError> {
        validate_pages(&pages)?;

        let job = self.store.create(filename, pages.len());
        log::info!(
            "Accepted job {} for {} ({} pages)",
            job.id,
            filename,
            pages.len()
        );

        let worker = JobWorker {
            store: Arc::clone(&self.store),
            scheduler: Arc::clone(&self.scheduler),
            aggregator: Arc::clone(&self.aggregator),
        };
        let images = pages.into_iter().map(PageInput::into_image).collect();
        tokio::spawn(worker.run(job.id.clone(), filename.to_string(), images));

        Ok(SubmittedJob {
            job_id: job.id,
            status: JobStatus::Processing,
        })
    }

    pub fn status(&self, job_id: &str) -> Result<JobStatusView, ServiceError> {
        self.job(job_id).map(|job| JobStatusView::from(&job))
    }

    /// Page results recorded so far; the final ordered set once completed.
    pub fn results(&self, job_id: &str) -> Result<Vec<PageResult>, ServiceError> {
        self.job(job_id).map(|job| job.results)
    }

    pub fn delete(&self, job_id: &str) -> Result<(), ServiceError> {
        if self.store.remove(job_id).is_none() {
            return Err(ServiceError::NotFound(job_id.to_string()));
        }
        log::info!("Deleted job {}", job_id);
        Ok(())
    }

    /// Removes finished jobs older than the retention period.
    pub fn cleanup(&self) -> CleanupReport {
        self.store.cleanup_older_than(self.retention)
    }

    pub fn list(&self) -> JobListing {
        let jobs: Vec<JobStatusView> = self
            .store
            .get_all()
            .iter()
            .map(JobStatusView::from)
            .collect();
        let active_jobs = jobs.iter().filter(|j| !j.status.is_terminal()).count();
        JobListing {
            total_jobs: jobs.len(),
            active_jobs,
            jobs,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.store.broadcaster().subscribe()
    }

    pub fn start_retention_sweeper(&self, interval: Duration) -> RetentionSweeper {
        RetentionSweeper::spawn(Arc::clone(&self.store), self.retention, interval)
    }

    fn job(&self, job_id: &str) -> Result<Job, ServiceError> {
        self.store
            .get(job_id)
            .ok_or_else(|| ServiceError::NotFound(job_id.to_string()))
    }
}
