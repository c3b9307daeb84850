//! Test harness wiring a `JobService` around fake backends.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use pagewise::stage::PassthroughEnhancer;
use pagewise::{
    ArtifactIndex, Config, FileArtifactIndex, JobService, JobStatusView, PageInput, PagePipeline, TextChunker,
};

use super::stages::{FakeExtractor, FirstLineAnalyzer, MemoryIndex};

/// Owns the temp directory, the fake extractor and the in-memory index
/// shared by every service it builds.
pub struct TestHarness {
    temp_dir: TempDir,
    pub extractor: Arc<FakeExtractor>,
    pub index: Arc<MemoryIndex>,
}

impl TestHarness {
    pub fn new(extractor: FakeExtractor) -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
            extractor: Arc::new(extractor),
            index: Arc::new(MemoryIndex::default()),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn pipeline(&self) -> PagePipeline {
        PagePipeline::new(
            Arc::new(PassthroughEnhancer),
            self.extractor.clone(),
            Arc::new(FirstLineAnalyzer),
        )
    }

    /// Service backed by the in-memory index.
    pub fn service(&self, config: &Config) -> JobService {
        JobService::from_config(config, self.pipeline(), self.index.clone())
            .expect("Failed to build service")
    }

    /// Service backed by a caller-supplied index.
    pub fn service_with_index(&self, config: &Config, index: Arc<dyn ArtifactIndex>) -> JobService {
        JobService::from_config(config, self.pipeline(), index).expect("Failed to build service")
    }

    /// Service backed by a file index under the temp directory.
    pub fn service_with_file_index(&self, config: &Config) -> (JobService, Arc<FileArtifactIndex>) {
        let index = Arc::new(FileArtifactIndex::new(
            self.path().join("index"),
            TextChunker::new(200, 20),
        ));
        let service = JobService::from_config(config, self.pipeline(), index.clone())
            .expect("Failed to build service");
        (service, index)
    }

    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }
}

/// `page1.png` .. `pageN.png`
pub fn page_inputs(count: usize) -> Vec<PageInput> {
    (0..count)
        .map(|i| PageInput::new(format!("/scans/page{}.png", i + 1)))
        .collect()
}

/// Polls until the job is completed or failed.
pub async fn wait_for_terminal(service: &JobService, job_id: &str) -> JobStatusView {
    for _ in 0..2000 {
        let status = service.status(job_id).expect("job should exist");
        if status.status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} did not finish in time", job_id);
}
