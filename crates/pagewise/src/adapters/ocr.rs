use std::path::Path;

use async_trait::async_trait;

use crate::config::OcrConfig;
use crate::error::StageError;
use crate::stage::{PageImage, Stage};

/// Text extraction through libtesseract.
#[derive(Debug, Clone)]
pub struct TesseractExtractor {
    languages: String,
    dpi: u32,
}

impl TesseractExtractor {
    pub fn new(config: &OcrConfig) -> Self {
        let languages = if config.languages.is_empty() {
            "eng".to_string()
        } else {
            config.languages.join("+")
        };
        Self {
            languages,
            dpi: config.dpi,
        }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }

    fn extract_file(&self, path: &Path) -> Result<String, StageError> {
        let _span = tracing::info_span!("adapter.ocr").entered();

        let image_data = std::fs::read(path).map_err(|e| {
            StageError::failed(format!("Failed to read '{}': {}", path.display(), e))
        })?;

        let mut lt = leptess::LepTess::new(None, &self.languages)
            .map_err(|e| StageError::failed(format!("Failed to initialize Tesseract: {}", e)))?;
        lt.set_image_from_mem(&image_data)
            .map_err(|e| StageError::failed(format!("Failed to set image for OCR: {}", e)))?;
        lt.set_source_resolution(self.dpi as i32);

        lt.get_utf8_text()
            .map_err(|e| StageError::failed(format!("OCR failed: {}", e)))
    }
}

#[async_trait]
impl Stage<PageImage, String> for TesseractExtractor {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn run(&self, input: &PageImage) -> Result<String, StageError> {
        let extractor = self.clone();
        let path = input.path.clone();
        let text = tokio::task::spawn_blocking(move || extractor.extract_file(&path))
            .await
            .map_err(|e| StageError::defect(format!("OCR task failed: {}", e)))??;
        Ok(text.trim().to_string())
    }
}
