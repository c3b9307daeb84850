use std::time::Duration;

use tracing::{debug, info_span, warn, Instrument};

use crate::error::StageError;
use crate::stage::{
    invoke, AnalysisRequest, Analyzer, Enhancer, Extractor, PageImage, GENERAL_DOCUMENT_TYPE,
};

use super::error::PageDefect;
use super::progress::{PageSubstep, ProgressReporter};
use super::result::{PageAnalysis, PageResult};

/// Optional deadline per stage. `None` lets a stage run unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimeouts {
    pub enhance: Option<Duration>,
    pub extract: Option<Duration>,
    pub analyze: Option<Duration>,
}

impl StageTimeouts {
    /// Same deadline for every stage.
    pub fn uniform(limit: Option<Duration>) -> Self {
        Self {
            enhance: limit,
            extract: limit,
            analyze: limit,
        }
    }
}

/// Runs enhance, extract-text and analyze for one page.
pub struct PagePipeline {
    enhancer: Enhancer,
    extractor: Extractor,
    analyzer: Analyzer,
    timeouts: StageTimeouts,
}

impl PagePipeline {
    pub fn new(enhancer: Enhancer, extractor: Extractor, analyzer: Analyzer) -> Self {
        Self {
            enhancer,
            extractor,
            analyzer,
            timeouts: StageTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> StageTimeouts {
        self.timeouts
    }

    /// Runs the pipeline for a single page.
    ///
    /// Expected stage failures are folded into the returned result. A
    /// [`StageError::Defect`] from any stage aborts the page.
    pub async fn run_page<P>(
        &self,
        input: &PageImage,
        page_index: usize,
        progress: &P,
    ) -> Result<PageResult, PageDefect>
    where
        P: ProgressReporter + ?Sized,
    {
        let span = info_span!("page_pipeline", page = page_index + 1, image = %input.file_name());
        self.run_stages(input, page_index, progress)
            .instrument(span)
            .await
    }

    async fn run_stages<P>(
        &self,
        input: &PageImage,
        page_index: usize,
        progress: &P,
    ) -> Result<PageResult, PageDefect>
    where
        P: ProgressReporter + ?Sized,
    {
        let mut result = PageResult::new(page_index, &input.file_name());

        // Step 1: Enhance
        let enhanced = invoke(self.enhancer.as_ref(), input, self.timeouts.enhance)
            .instrument(info_span!("enhance", stage = self.enhancer.name()))
            .await;
        let source = match enhanced {
            Ok(image) => {
                if image.path != input.path {
                    result.enhanced_image = Some(image.file_name());
                }
                image
            }
            Err(StageError::Defect(message)) => {
                return Err(PageDefect::new(self.enhancer.name(), message));
            }
            Err(e) => {
                warn!("Enhancement failed for page {}, using original: {}", page_index + 1, e);
                input.clone()
            }
        };
        progress.substep(page_index, PageSubstep::Enhanced);

        // Step 2: Extract text
        let extracted = invoke(self.extractor.as_ref(), &source, self.timeouts.extract)
            .instrument(info_span!("extract_text", stage = self.extractor.name()))
            .await;
        match extracted {
            Ok(text) => result.ocr_text = text,
            Err(StageError::Defect(message)) => {
                return Err(PageDefect::new(self.extractor.name(), message));
            }
            Err(e) => {
                warn!("Text extraction failed for page {}: {}", page_index + 1, e);
                result.ocr_error = Some(e.to_string());
            }
        }
        progress.substep(page_index, PageSubstep::Extracted);

        // Step 3: Analyze
        if result.has_text() {
            let document_id = document_id_for(input);
            let request = AnalysisRequest {
                text: result.ocr_text.clone(),
                document_type: GENERAL_DOCUMENT_TYPE.to_string(),
                document_id: document_id.clone(),
            };
            let analyzed = invoke(self.analyzer.as_ref(), &request, self.timeouts.analyze)
                .instrument(info_span!("analyze", stage = self.analyzer.name()))
                .await;
            result.analysis = match analyzed {
                Ok(bundle) => PageAnalysis::Completed(bundle),
                Err(StageError::Defect(message)) => {
                    return Err(PageDefect::new(self.analyzer.name(), message));
                }
                Err(e) => {
                    warn!("Analysis failed for page {}: {}", page_index + 1, e);
                    PageAnalysis::Failed {
                        error: e.to_string(),
                    }
                }
            };
            result.document_id = Some(document_id);
        } else {
            debug!("Page {} has no text, skipping analysis", page_index + 1);
        }
        progress.substep(page_index, PageSubstep::Analyzed);

        Ok(result)
    }
}

/// `<image stem>_<8 hex chars>`
fn document_id_for(image: &PageImage) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", image.stem(), &suffix[..8])
}
