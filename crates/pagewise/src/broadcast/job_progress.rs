//! Job progress broadcaster for real-time job status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::tracker::{Job, JobStatus};

/// Snapshot of a job published after every accepted mutation.
///
/// Page results are omitted (they can be large); observers fetch them
/// from the store once the job is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    /// Unique job identifier.
    pub job_id: String,
    /// Original filename being processed.
    pub filename: String,
    /// Status after the mutation.
    pub status: JobStatus,
    /// Completion percentage after the mutation.
    pub progress_percentage: f64,
    pub processed_pages: usize,
    pub total_pages: usize,
    pub current_page: usize,
    /// Phase label.
    pub step: String,
    /// Human-readable message describing current activity.
    pub message: String,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobProgressEvent {
    /// Creates an event reflecting the current state of `job`.
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            filename: job.filename.clone(),
            status: job.status,
            progress_percentage: job.progress_percentage,
            processed_pages: job.processed_pages,
            total_pages: job.total_pages,
            current_page: job.current_page,
            step: job.current_step.clone(),
            message: job.step_description.clone(),
            timestamp: Utc::now(),
            error: job.error.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Broadcasts job progress events for streaming.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new job progress broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: JobProgressEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(1024)
    }
}
