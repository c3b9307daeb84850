//! Background orchestration of one job from `processing` to a terminal
//! state.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::aggregate::BatchAggregator;
use crate::error::TrackerError;
use crate::pipeline::{PageResult, PageSubstep, ProgressReporter, TrackerProgress};
use crate::scheduler::{panic_payload, PageSink, Scheduler};
use crate::stage::PageImage;
use crate::tracker::{JobStatus, JobStore};

/// Routes scheduler events into the job's record.
struct StoreSink {
    progress: TrackerProgress,
}

impl ProgressReporter for StoreSink {
    fn substep(&self, page_index: usize, step: PageSubstep) {
        self.progress.substep(page_index, step);
    }
}

impl PageSink for StoreSink {
    fn page_completed(&self, page_index: usize, result: &PageResult) {
        let job_id = self.progress.job_id();
        match self
            .progress
            .store()
            .record_page(job_id, page_index, result.clone())
        {
            Ok(true) => log::debug!("Job {} page {} recorded", job_id, page_index + 1),
            Ok(false) => log::warn!(
                "Job {} ignored completion of page {}",
                job_id,
                page_index + 1
            ),
            Err(e) => log::warn!("Job {} page {} not recorded: {}", job_id, page_index + 1, e),
        }
    }
}

pub(crate) struct JobWorker {
    pub store: Arc<JobStore>,
    pub scheduler: Arc<Scheduler>,
    pub aggregator: Arc<BatchAggregator>,
}

impl JobWorker {
    pub async fn run(self, job_id: String, filename: String, pages: Vec<PageImage>) {
        let run = self.orchestrate(&job_id, &filename, pages);
        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                // Usually the job was deleted while running.
                log::warn!("Job {} stopped: {}", job_id, e);
            }
            Err(panic) => {
                let message = match panic_payload(panic.as_ref()) {
                    Some(payload) => format!("Job processing panicked: {}", payload),
                    None => "Job processing panicked".to_string(),
                };
                log::error!("Job {} failed: {}", job_id, message);
                if let Err(e) = self.store.fail(&job_id, &message) {
                    log::warn!("Job {} could not be marked failed: {}", job_id, e);
                }
            }
        }
    }

    async fn orchestrate(
        &self,
        job_id: &str,
        filename: &str,
        pages: Vec<PageImage>,
    ) -> Result<(), TrackerError> {
        let total = pages.len();
        self.store.transition(
            job_id,
            JobStatus::Processing,
            &format!("Processing {} pages", total),
        )?;

        let sink = Arc::new(StoreSink {
            progress: TrackerProgress::new(Arc::clone(&self.store), job_id),
        });
        let mut results = match self.scheduler.process_pages(pages, sink).await {
            Ok(results) => results,
            Err(e) => return self.store.fail(job_id, &e.to_string()),
        };

        if results.iter().any(PageResult::has_text) {
            self.store.transition(
                job_id,
                JobStatus::VectorStore,
                "Building search index",
            )?;
            let created = match results.as_mut_slice() {
                [single] => self.aggregator.index_page(single).await,
                all => {
                    let document_id = batch_document_id(filename, job_id);
                    self.aggregator.aggregate(all, &document_id).await
                }
            };
            if !created {
                log::warn!("Job {} finished without a search artifact", job_id);
            }
        }

        self.store
            .transition(job_id, JobStatus::Finalizing, "Finalizing results")?;
        self.store.complete(job_id, results)
    }
}

/// Id of the combined artifact: `<filename stem>_<first 8 chars of job id>`.
pub(crate) fn batch_document_id(filename: &str, job_id: &str) -> String {
    let stem = std::path::Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() {
        "document".to_string()
    } else {
        stem
    };
    let prefix: String = job_id.chars().filter(|c| *c != '-').take(8).collect();
    format!("{}_{}", stem, prefix)
}
