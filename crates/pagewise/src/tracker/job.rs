//! The per-document job record and its progress state machine.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::pipeline::PageResult;

use super::percent;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Preparing,
    Processing,
    VectorStore,
    Finalizing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Position along the forward path. `Failed` sits outside it.
    fn rank(self) -> u8 {
        match self {
            JobStatus::Preparing => 0,
            JobStatus::Processing => 1,
            JobStatus::VectorStore => 2,
            JobStatus::Finalizing => 3,
            JobStatus::Completed => 4,
            JobStatus::Failed => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self -> next` is a legal move.
    ///
    /// Moves only go forward; intermediate states may be skipped. `Failed`
    /// is reachable from every non-terminal state.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobStatus::Failed => true,
            _ => next.rank() > self.rank(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Preparing => "preparing",
            JobStatus::Processing => "processing",
            JobStatus::VectorStore => "vector_store",
            JobStatus::Finalizing => "finalizing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Default step label shown while in this status.
    pub fn step_label(self) -> &'static str {
        match self {
            JobStatus::Preparing => "Preparing",
            JobStatus::Processing => "Processing pages",
            JobStatus::VectorStore => "Building search index",
            JobStatus::Finalizing => "Finalizing",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An itemized page failure. `page` is 1-indexed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageErrorEntry {
    pub page: usize,
    pub error: String,
}

/// One submitted document's end-to-end processing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub filename: String,
    pub total_pages: usize,
    pub status: JobStatus,
    pub processed_pages: usize,
    /// 1-indexed number of the highest page completed so far.
    pub current_page: usize,
    pub progress_percentage: f64,
    pub current_step: String,
    pub step_description: String,
    pub errors: Vec<PageErrorEntry>,
    pub results: Vec<PageResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Pages whose completion has already been applied.
    #[serde(skip)]
    completed: HashSet<usize>,
    /// Partial progress of pages still in flight, in `[0, 1)`.
    #[serde(skip)]
    in_flight: HashMap<usize, f64>,
}

impl Job {
    pub fn new(filename: &str, total_pages: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            total_pages,
            status: JobStatus::Preparing,
            processed_pages: 0,
            current_page: 0,
            progress_percentage: 0.0,
            current_step: JobStatus::Preparing.step_label().to_string(),
            step_description: "Job accepted".to_string(),
            errors: Vec::new(),
            results: Vec::new(),
            error: None,
            start_time: Utc::now(),
            end_time: None,
            completed: HashSet::new(),
            in_flight: HashMap::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Seconds between start and end, once the job is terminal.
    pub fn duration(&self) -> Option<f64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds() as f64 / 1000.0)
    }

    /// Moves to a non-terminal status. Use [`Job::complete`] and
    /// [`Job::fail`] for terminal ones.
    pub fn transition(&mut self, next: JobStatus, description: &str) -> Result<(), TrackerError> {
        if next.is_terminal() || !self.status.can_transition_to(next) {
            return Err(TrackerError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.current_step = next.step_label().to_string();
        self.step_description = description.to_string();
        self.raise_progress(percent::status_floor(next));
        Ok(())
    }

    /// Records intra-page progress for a page still in flight.
    ///
    /// Returns false when the update is ignored (terminal job, unknown or
    /// already completed page).
    pub fn record_substep(&mut self, page_index: usize, fraction: f64) -> bool {
        if self.is_finished()
            || page_index >= self.total_pages
            || self.completed.contains(&page_index)
        {
            return false;
        }

        let fraction = fraction.clamp(0.0, percent::MAX_IN_FLIGHT_FRACTION);
        let entry = self.in_flight.entry(page_index).or_insert(0.0);
        if fraction <= *entry {
            return false;
        }
        *entry = fraction;
        self.raise_progress(self.page_band_progress());
        true
    }

    /// Applies a page completion exactly once.
    ///
    /// Returns false if the page was already applied, is out of range, or
    /// the job is terminal.
    pub fn record_page(&mut self, page_index: usize, result: PageResult) -> bool {
        if self.is_finished() || page_index >= self.total_pages {
            return false;
        }
        if !self.completed.insert(page_index) {
            return false;
        }

        self.in_flight.remove(&page_index);
        self.processed_pages += 1;
        self.current_page = self.current_page.max(page_index + 1);
        self.step_description = format!(
            "Processed page {} ({} of {})",
            page_index + 1,
            self.processed_pages,
            self.total_pages
        );

        if let Some(ref error) = result.error {
            self.errors.push(PageErrorEntry {
                page: page_index + 1,
                error: error.clone(),
            });
        }
        self.results.push(result);
        self.raise_progress(self.page_band_progress());
        true
    }

    /// Terminal success: results are replaced by the final ordered sequence.
    pub fn complete(&mut self, results: Vec<PageResult>) -> Result<(), TrackerError> {
        if !self.status.can_transition_to(JobStatus::Completed) {
            return Err(TrackerError::InvalidTransition {
                from: self.status,
                to: JobStatus::Completed,
            });
        }

        self.status = JobStatus::Completed;
        self.current_step = JobStatus::Completed.step_label().to_string();
        self.step_description = "Processing completed successfully".to_string();
        self.results = results;
        self.in_flight.clear();
        self.progress_percentage = percent::COMPLETE;
        self.end_time = Some(Utc::now());
        Ok(())
    }

    /// Terminal failure: progress is frozen at its last value.
    pub fn fail(&mut self, error: &str) -> Result<(), TrackerError> {
        if !self.status.can_transition_to(JobStatus::Failed) {
            return Err(TrackerError::InvalidTransition {
                from: self.status,
                to: JobStatus::Failed,
            });
        }

        self.status = JobStatus::Failed;
        self.current_step = JobStatus::Failed.step_label().to_string();
        self.step_description = "Processing failed".to_string();
        self.error = Some(error.to_string());
        self.in_flight.clear();
        self.end_time = Some(Utc::now());
        Ok(())
    }

    fn page_band_progress(&self) -> f64 {
        let partial: f64 = self.in_flight.values().sum();
        percent::page_band(self.processed_pages as f64 + partial, self.total_pages)
    }

    fn raise_progress(&mut self, candidate: f64) {
        let capped = candidate.min(percent::FINALIZING);
        if capped > self.progress_percentage {
            self.progress_percentage = capped;
        }
    }
}
