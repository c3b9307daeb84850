//! Bounded-concurrency fan-out of page pipelines.
//!
//! Every page gets its own task. A task holds a permit from a fair
//! semaphore for the whole duration of its pipeline run, so at most
//! `concurrency_limit` pages are in flight and waiting pages are admitted
//! in submission order. Results arrive in completion order and are sorted
//! by page index once all runs have finished.

pub mod gauge;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::pipeline::{PagePipeline, PageResult, PageSubstep, ProgressReporter};
use crate::stage::PageImage;

pub use gauge::{ActiveRunGauge, ActiveRunGuard};

/// Receives one completion event per page, success or failure.
pub trait PageSink: ProgressReporter {
    fn page_completed(&self, page_index: usize, result: &PageResult);
}

/// Sink that discards every event.
pub struct NoopSink;

impl ProgressReporter for NoopSink {
    fn substep(&self, _page_index: usize, _step: PageSubstep) {}
}

impl PageSink for NoopSink {
    fn page_completed(&self, _page_index: usize, _result: &PageResult) {}
}

pub struct Scheduler {
    pipeline: Arc<PagePipeline>,
    config: SchedulerConfig,
    gauge: Arc<ActiveRunGauge>,
}

impl Scheduler {
    pub fn new(pipeline: Arc<PagePipeline>, config: SchedulerConfig) -> Self {
        Self {
            pipeline,
            config,
            gauge: Arc::new(ActiveRunGauge::new()),
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.config.concurrency_limit()
    }

    /// In-flight runs across every call sharing this scheduler, so its
    /// peak may exceed the per-call limit when jobs overlap. Each call logs
    /// its own peak.
    pub fn gauge(&self) -> &ActiveRunGauge {
        &self.gauge
    }

    /// Processes every page and returns one result per page, ordered by
    /// page index.
    pub async fn process_pages(
        &self,
        pages: Vec<PageImage>,
        sink: Arc<dyn PageSink>,
    ) -> Result<Vec<PageResult>, SchedulerError> {
        if pages.is_empty() {
            return Err(SchedulerError::EmptyInput);
        }

        let total = pages.len();
        let limit = self.config.concurrency_limit();
        log::info!(
            "Scheduling {} pages with concurrency limit {}",
            total,
            limit
        );

        let semaphore = Arc::new(Semaphore::new(limit));
        let call_gauge = Arc::new(ActiveRunGauge::new());
        let mut runs = JoinSet::new();

        for (page_index, image) in pages.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let pipeline = Arc::clone(&self.pipeline);
            let gauge = Arc::clone(&self.gauge);
            let call_gauge = Arc::clone(&call_gauge);
            let sink = Arc::clone(&sink);

            runs.spawn(async move {
                let image_name = image.file_name();
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        let _active = gauge.enter();
                        let _call_active = call_gauge.enter();
                        let run = pipeline.run_page(&image, page_index, sink.as_ref());
                        match AssertUnwindSafe(run).catch_unwind().await {
                            Ok(Ok(result)) => result,
                            Ok(Err(defect)) => {
                                log::error!("Page {} aborted: {}", page_index + 1, defect);
                                PageResult::defect(page_index, &image_name, &defect.to_string())
                            }
                            Err(panic) => {
                                let message = panic_message(panic.as_ref());
                                log::error!("Page {} panicked: {}", page_index + 1, message);
                                PageResult::defect(page_index, &image_name, &message)
                            }
                        }
                    }
                    Err(e) => PageResult::defect(page_index, &image_name, &e.to_string()),
                };

                sink.page_completed(page_index, &result);
                result
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = runs.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    runs.abort_all();
                    return Err(SchedulerError::Runtime(e.to_string()));
                }
            }
        }

        results.sort_by_key(|r| r.page_index);
        log::info!(
            "Finished {} pages (peak {} in flight)",
            results.len(),
            call_gauge.peak()
        );
        Ok(results)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    match panic_payload(panic) {
        Some(message) => format!("page pipeline panicked: {}", message),
        None => "page pipeline panicked".to_string(),
    }
}

/// Text carried by a panic, when it is a string.
pub(crate) fn panic_payload(panic: &(dyn Any + Send)) -> Option<&str> {
    let literal: Option<&str> = panic.downcast_ref::<&str>().copied();
    literal.or_else(|| panic.downcast_ref::<String>().map(String::as_str))
}
