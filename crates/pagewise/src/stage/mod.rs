//! Per-stage capability contract shared by the page pipeline and its
//! backends.
//!
//! A stage receives an artifact by reference and returns either a new
//! artifact or a [`StageError`]. Backends are injected as trait objects so
//! the orchestration core never constructs clients itself.

pub mod passthrough;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StageError;
use crate::pipeline::AnalysisBundle;

pub use passthrough::PassthroughEnhancer;

/// Content-type label handed to analysis when no classifier refines it.
pub const GENERAL_DOCUMENT_TYPE: &str = "general";

/// Reference to a page image produced or consumed by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    pub path: PathBuf,
}

impl PageImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without directories, used in page results.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// File name without extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "page".to_string())
    }
}

/// Input of the content-analysis stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub text: String,
    pub document_type: String,
    pub document_id: String,
}

/// A single enrichment step.
#[async_trait]
pub trait Stage<I, O>: Send + Sync
where
    I: Sync,
    O: Send,
{
    /// Short name used in logs, spans and error messages.
    fn name(&self) -> &'static str;

    async fn run(&self, input: &I) -> Result<O, StageError>;
}

pub type Enhancer = Arc<dyn Stage<PageImage, PageImage>>;
pub type Extractor = Arc<dyn Stage<PageImage, String>>;
pub type Analyzer = Arc<dyn Stage<AnalysisRequest, AnalysisBundle>>;

/// Runs a stage, converting an elapsed deadline into an expected failure.
pub async fn invoke<S, I, O>(
    stage: &S,
    input: &I,
    deadline: Option<Duration>,
) -> Result<O, StageError>
where
    S: Stage<I, O> + ?Sized,
    I: Sync,
    O: Send,
{
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, stage.run(input)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(StageError::failed(format!(
                "{} timed out after {}s",
                stage.name(),
                limit.as_secs_f64()
            ))),
        },
        None => stage.run(input).await,
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;

    #[test]
    fn test_page_image_names() {
        let image = PageImage::new("/tmp/uploads/scan_page1.png");
        assert_eq!(image.file_name(), "scan_page1.png");
        assert_eq!(image.stem(), "scan_page1");
        assert_eq!(image.path(), Path::new("/tmp/uploads/scan_page1.png"));
    }

    #[tokio::test]
    async fn test_invoke_without_deadline() {
        let stage = ScriptedExtractor::new(vec![("a.png", Ok("text"))]);
        let text: String = invoke(&stage, &PageImage::new("a.png"), None)
            .await
            .unwrap();
        assert_eq!(text, "text");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_timeout_is_expected_failure() {
        let stage = SlowStage;
        let err = invoke::<_, PageImage, String>(
            &stage,
            &PageImage::new("a.png"),
            Some(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

        assert!(!err.is_defect());
        assert!(err.to_string().contains("slow_ocr timed out"));
    }
}
