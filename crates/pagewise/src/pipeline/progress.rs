use std::sync::Arc;

use crate::tracker::JobStore;

/// Stage boundaries crossed by a page while its pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSubstep {
    Enhanced,
    Extracted,
    Analyzed,
}

impl PageSubstep {
    /// Share of the page's work done once this boundary is crossed.
    pub fn fraction(self) -> f64 {
        match self {
            PageSubstep::Enhanced => 1.0 / 3.0,
            PageSubstep::Extracted => 2.0 / 3.0,
            PageSubstep::Analyzed => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageSubstep::Enhanced => "enhanced",
            PageSubstep::Extracted => "extracted",
            PageSubstep::Analyzed => "analyzed",
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn substep(&self, page_index: usize, step: PageSubstep);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn substep(&self, _page_index: usize, _step: PageSubstep) {}
}

/// Bridges pipeline substeps into a job record held by the store.
pub struct TrackerProgress {
    store: Arc<JobStore>,
    job_id: String,
}

impl TrackerProgress {
    pub fn new(store: Arc<JobStore>, job_id: &str) -> Self {
        Self {
            store,
            job_id: job_id.to_string(),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl ProgressReporter for TrackerProgress {
    fn substep(&self, page_index: usize, step: PageSubstep) {
        if let Err(e) = self
            .store
            .record_substep(&self.job_id, page_index, step.fraction())
        {
            log::debug!(
                "Dropped {} substep for page {} of job {}: {}",
                step.as_str(),
                page_index + 1,
                self.job_id,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::JobStatus;

    #[test]
    fn test_fractions_increase() {
        assert!(PageSubstep::Enhanced.fraction() < PageSubstep::Extracted.fraction());
        assert!(PageSubstep::Extracted.fraction() < PageSubstep::Analyzed.fraction());
        assert_eq!(PageSubstep::Analyzed.fraction(), 1.0);
    }

    #[test]
    fn test_tracker_progress_moves_job() {
        let store = Arc::new(JobStore::new());
        let job = store.create("scan.pdf", 2);
        store
            .transition(&job.id, JobStatus::Processing, "")
            .unwrap();

        let progress = TrackerProgress::new(Arc::clone(&store), &job.id);
        progress.substep(0, PageSubstep::Extracted);

        let snapshot = store.get(&job.id).unwrap();
        assert!(snapshot.progress_percentage > 10.0);
        assert_eq!(snapshot.processed_pages, 0);
    }

    #[test]
    fn test_tracker_progress_ignores_missing_job() {
        let store = Arc::new(JobStore::new());
        let progress = TrackerProgress::new(store, "gone");
        progress.substep(0, PageSubstep::Enhanced);
    }
}
