//! Combines per-page text into one document-level artifact.

use std::sync::Arc;

use crate::index::ArtifactIndex;
use crate::pipeline::PageResult;

pub const PAGE_SEPARATOR: &str = "\n\n--- PAGE SEPARATOR ---\n\n";

pub struct BatchAggregator {
    index: Arc<dyn ArtifactIndex>,
}

impl BatchAggregator {
    pub fn new(index: Arc<dyn ArtifactIndex>) -> Self {
        Self { index }
    }

    /// Page texts in page order. Pages with no text at all are left out;
    /// whitespace-only text is kept as extracted.
    pub fn combined_text(results: &[PageResult]) -> Option<String> {
        let mut ordered: Vec<&PageResult> = results
            .iter()
            .filter(|r| !r.ocr_text.is_empty())
            .collect();
        if ordered.is_empty() {
            return None;
        }
        ordered.sort_by_key(|r| r.page_index);
        Some(
            ordered
                .iter()
                .map(|r| r.ocr_text.as_str())
                .collect::<Vec<_>>()
                .join(PAGE_SEPARATOR),
        )
    }

    /// Builds the combined artifact and marks every analysis bundle with it.
    ///
    /// Returns false when no page has text or the index rejects the build.
    /// A panicking index is a defect and propagates to the caller.
    /// Running it again over the same results leaves them unchanged.
    pub async fn aggregate(&self, results: &mut [PageResult], document_id: &str) -> bool {
        let Some(combined) = Self::combined_text(results) else {
            log::debug!("No page text for document {}, skipping artifact", document_id);
            return false;
        };

        if !self.build(document_id, combined).await {
            return false;
        }

        for result in results.iter_mut() {
            if let Some(bundle) = result.analysis.bundle_mut() {
                bundle.artifact_created = true;
                bundle.document_id = document_id.to_string();
            }
        }
        true
    }

    /// Builds an artifact for one page's own text under its own id.
    pub async fn index_page(&self, result: &mut PageResult) -> bool {
        let Some(document_id) = result.document_id.clone() else {
            return false;
        };
        if !result.has_text() || !self.build(&document_id, result.ocr_text.clone()).await {
            return false;
        }
        if let Some(bundle) = result.analysis.bundle_mut() {
            bundle.artifact_created = true;
        }
        true
    }

    async fn build(&self, document_id: &str, text: String) -> bool {
        let index = Arc::clone(&self.index);
        let id = document_id.to_string();
        match tokio::task::spawn_blocking(move || index.build(&id, &text)).await {
            Ok(Ok(summary)) => {
                log::info!(
                    "Created artifact for document {} ({} chunks)",
                    summary.document_id,
                    summary.chunk_count
                );
                true
            }
            Ok(Err(e)) => {
                log::error!("Artifact build failed for document {}: {}", document_id, e);
                false
            }
            Err(e) if e.is_panic() => {
                log::error!("Artifact build for document {} panicked", document_id);
                std::panic::resume_unwind(e.into_panic())
            }
            Err(e) => {
                log::error!("Artifact build task for document {} failed: {}", document_id, e);
                false
            }
        }
    }
}
