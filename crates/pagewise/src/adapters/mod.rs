//! Production stage backends.

pub mod analysis;
pub mod enhance;
#[cfg(feature = "tesseract")]
pub mod ocr;

use std::sync::Arc;

use crate::config::Config;
use crate::stage::{Enhancer, PassthroughEnhancer};

pub use analysis::OllamaAnalyzer;
pub use enhance::ImageEnhancer;
#[cfg(feature = "tesseract")]
pub use ocr::TesseractExtractor;

/// Image enhancer when enabled, a passthrough otherwise.
pub fn enhancer_for(config: &Config) -> Enhancer {
    if config.enhancement.enabled {
        Arc::new(ImageEnhancer::new(
            &config.processed_directory,
            &config.enhancement,
        ))
    } else {
        Arc::new(PassthroughEnhancer)
    }
}
