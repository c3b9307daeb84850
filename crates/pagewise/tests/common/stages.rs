//! Fake stage backends with scripted outcomes and concurrency counters.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use pagewise::error::IndexError;
use pagewise::index::{ArtifactIndex, ArtifactSummary};
use pagewise::{ActionItem, AnalysisBundle, AnalysisRequest, PageImage, Stage, StageError, Summary};

/// What the fake extractor does for one page.
#[derive(Debug, Clone)]
pub enum PageScript {
    Text(&'static str),
    Fail(&'static str),
    Defect(&'static str),
    Panic(&'static str),
}

/// Extractor whose per-page outcome and latency are scripted by file name.
///
/// Tracks how many calls are running at once and the highest such count.
#[derive(Default)]
pub struct FakeExtractor {
    scripts: HashMap<String, PageScript>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, file: &str, script: PageScript) -> Self {
        self.scripts.insert(file.to_string(), script);
        self
    }

    pub fn delay(mut self, file: &str, delay: Duration) -> Self {
        self.delays.insert(file.to_string(), delay);
        self
    }

    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Stage<PageImage, String> for FakeExtractor {
    fn name(&self) -> &'static str {
        "fake_ocr"
    }

    async fn run(&self, input: &PageImage) -> Result<String, StageError> {
        let name = input.file_name();
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(&name)
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        match self.scripts.get(&name) {
            Some(PageScript::Text(text)) => Ok(text.to_string()),
            Some(PageScript::Fail(message)) => Err(StageError::failed(*message)),
            Some(PageScript::Defect(message)) => Err(StageError::defect(*message)),
            Some(PageScript::Panic(message)) => panic!("{}", message),
            None => Ok(String::new()),
        }
    }
}

/// Analyzer that summarizes a page by its first line.
pub struct FirstLineAnalyzer;

#[async_trait]
impl Stage<AnalysisRequest, AnalysisBundle> for FirstLineAnalyzer {
    fn name(&self) -> &'static str {
        "first_line"
    }

    async fn run(&self, input: &AnalysisRequest) -> Result<AnalysisBundle, StageError> {
        let first_line = input.text.lines().next().unwrap_or_default();
        Ok(AnalysisBundle::new(
            Summary::from_text(first_line, &input.text),
            serde_json::json!({ "title": first_line }),
            vec![ActionItem::new("File document")],
            &input.document_type,
            &input.document_id,
        ))
    }
}

/// Index that records builds in memory.
#[derive(Default)]
pub struct MemoryIndex {
    builds: Mutex<Vec<(String, String)>>,
}

impl MemoryIndex {
    pub fn builds(&self) -> Vec<(String, String)> {
        self.builds.lock().unwrap().clone()
    }
}

impl ArtifactIndex for MemoryIndex {
    fn build(&self, document_id: &str, text: &str) -> Result<ArtifactSummary, IndexError> {
        self.builds
            .lock()
            .unwrap()
            .push((document_id.to_string(), text.to_string()));
        Ok(ArtifactSummary {
            document_id: document_id.to_string(),
            chunk_count: 1,
        })
    }
}

/// Index whose every build panics.
pub struct PanickingIndex {
    pub message: &'static str,
}

impl ArtifactIndex for PanickingIndex {
    fn build(&self, _document_id: &str, _text: &str) -> Result<ArtifactSummary, IndexError> {
        panic!("{}", self.message)
    }
}
