//! In-memory keyed store of job records.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::broadcast::{JobProgressBroadcaster, JobProgressEvent};
use crate::error::TrackerError;
use crate::pipeline::PageResult;

use super::job::{Job, JobStatus};

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub removed: usize,
    pub remaining: usize,
}

/// Keyed store of [`Job`] records.
///
/// Every mutation runs under the write lock and is applied to the record
/// as a whole, so readers only ever see a fully applied update. Reads hand
/// out cloned snapshots. Each accepted mutation is published on the
/// broadcaster while the lock is still held, keeping event order equal to
/// mutation order.
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
    broadcaster: JobProgressBroadcaster,
}

impl JobStore {
    pub fn new() -> Self {
        Self::with_broadcaster(JobProgressBroadcaster::default())
    }

    pub fn with_broadcaster(broadcaster: JobProgressBroadcaster) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            broadcaster,
        }
    }

    pub fn broadcaster(&self) -> &JobProgressBroadcaster {
        &self.broadcaster
    }

    fn read_jobs(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_jobs(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Creates a job in `preparing` and returns its snapshot.
    pub fn create(&self, filename: &str, total_pages: usize) -> Job {
        let job = Job::new(filename, total_pages);
        let snapshot = job.clone();
        self.insert(job);
        snapshot
    }

    /// Inserts (or replaces) a job record.
    pub fn insert(&self, job: Job) {
        let mut jobs = self.write_jobs();
        self.broadcaster.send(JobProgressEvent::from_job(&job));
        jobs.insert(job.id.clone(), job);
    }

    /// Applies `f` to the job atomically and publishes the new state when
    /// `f` reports that it changed something.
    fn mutate<R>(
        &self,
        job_id: &str,
        f: impl FnOnce(&mut Job) -> Result<R, TrackerError>,
        changed: impl FnOnce(&R) -> bool,
    ) -> Result<R, TrackerError> {
        let mut jobs = self.write_jobs();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| TrackerError::NotFound(job_id.to_string()))?;

        let outcome = f(job)?;
        if changed(&outcome) {
            self.broadcaster.send(JobProgressEvent::from_job(job));
        }
        Ok(outcome)
    }

    pub fn transition(
        &self,
        job_id: &str,
        status: JobStatus,
        description: &str,
    ) -> Result<(), TrackerError> {
        self.mutate(job_id, |job| job.transition(status, description), |_| true)
    }

    pub fn record_substep(
        &self,
        job_id: &str,
        page_index: usize,
        fraction: f64,
    ) -> Result<bool, TrackerError> {
        self.mutate(
            job_id,
            |job| Ok(job.record_substep(page_index, fraction)),
            |applied| *applied,
        )
    }

    pub fn record_page(
        &self,
        job_id: &str,
        page_index: usize,
        result: PageResult,
    ) -> Result<bool, TrackerError> {
        self.mutate(
            job_id,
            |job| Ok(job.record_page(page_index, result)),
            |applied| *applied,
        )
    }

    pub fn complete(&self, job_id: &str, results: Vec<PageResult>) -> Result<(), TrackerError> {
        self.mutate(job_id, |job| job.complete(results), |_| true)?;
        log::info!("Job {} completed", job_id);
        Ok(())
    }

    pub fn fail(&self, job_id: &str, error: &str) -> Result<(), TrackerError> {
        self.mutate(job_id, |job| job.fail(error), |_| true)?;
        log::error!("Job {} failed: {}", job_id, error);
        Ok(())
    }

    /// Returns a snapshot of a job.
    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.read_jobs().get(job_id).cloned()
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.read_jobs().contains_key(job_id)
    }

    /// Returns all jobs sorted by start time (newest first).
    pub fn get_all(&self) -> Vec<Job> {
        let mut result: Vec<Job> = self.read_jobs().values().cloned().collect();
        result.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        result
    }

    /// Removes a job regardless of its status.
    pub fn remove(&self, job_id: &str) -> Option<Job> {
        self.write_jobs().remove(job_id)
    }

    pub fn len(&self) -> usize {
        self.read_jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_jobs().is_empty()
    }

    /// Returns (active, completed, failed) counts.
    pub fn counts(&self) -> (usize, usize, usize) {
        let jobs = self.read_jobs();
        let mut active = 0;
        let mut completed = 0;
        let mut failed = 0;

        for job in jobs.values() {
            match job.status {
                JobStatus::Completed => completed += 1,
                JobStatus::Failed => failed += 1,
                _ => active += 1,
            }
        }

        (active, completed, failed)
    }

    /// Removes terminal jobs whose end time is more than `max_age` ago.
    pub fn cleanup_older_than(&self, max_age: Duration) -> CleanupReport {
        self.cleanup_older_than_at(max_age, Utc::now())
    }

    /// Same as [`JobStore::cleanup_older_than`] with an explicit reference time.
    pub fn cleanup_older_than_at(&self, max_age: Duration, now: DateTime<Utc>) -> CleanupReport {
        let mut jobs = self.write_jobs();
        let before = jobs.len();

        jobs.retain(|_, job| {
            if !job.is_finished() {
                return true;
            }
            let finished_at = job.end_time.unwrap_or(job.start_time);
            now - finished_at <= max_age
        });

        let report = CleanupReport {
            removed: before - jobs.len(),
            remaining: jobs.len(),
        };
        if report.removed > 0 {
            log::info!(
                "Removed {} expired jobs, {} remaining",
                report.removed,
                report.remaining
            );
        }
        report
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
