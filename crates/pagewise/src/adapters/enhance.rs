use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::config::EnhancementConfig;
use crate::error::StageError;
use crate::stage::{PageImage, Stage};

const SHARPEN_SIGMA: f32 = 1.0;
const SHARPEN_THRESHOLD: i32 = 2;

/// Prepares scans for text extraction: grayscale, upscale small pages,
/// boost contrast, sharpen. The result is written as PNG next to the
/// other processed pages.
#[derive(Debug, Clone)]
pub struct ImageEnhancer {
    output_directory: PathBuf,
    upscale_below: u32,
    contrast: f32,
}

impl ImageEnhancer {
    pub fn new<P: AsRef<Path>>(output_directory: P, config: &EnhancementConfig) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
            upscale_below: config.upscale_below,
            contrast: config.contrast,
        }
    }

    /// `<stem>_<8 hex>_enhanced.png`, unique per run so same-named pages
    /// never share an output file.
    fn output_path(&self, input: &PageImage) -> PathBuf {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        self.output_directory
            .join(format!("{}_{}_enhanced.png", input.stem(), &suffix[..8]))
    }

    fn enhance_file(&self, input: &Path, output: &Path) -> Result<(), StageError> {
        let _span = tracing::info_span!("adapter.enhance").entered();

        let img = image::open(input)
            .map_err(|e| StageError::failed(format!("Failed to load image: {}", e)))?;
        let img = self.enhance(img);

        std::fs::create_dir_all(&self.output_directory).map_err(|e| {
            StageError::failed(format!(
                "Failed to create '{}': {}",
                self.output_directory.display(),
                e
            ))
        })?;
        img.save_with_format(output, ImageFormat::Png)
            .map_err(|e| StageError::failed(format!("Failed to write enhanced image: {}", e)))
    }

    fn enhance(&self, img: DynamicImage) -> DynamicImage {
        let mut img = img.grayscale();

        let (width, height) = img.dimensions();
        let shorter = width.min(height);
        if shorter > 0 && shorter < self.upscale_below {
            let scale = self.upscale_below as f64 / shorter as f64;
            let new_width = (width as f64 * scale).round() as u32;
            let new_height = (height as f64 * scale).round() as u32;
            img = img.resize(new_width, new_height, FilterType::Lanczos3);
        }

        img.adjust_contrast(self.contrast)
            .unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD)
    }
}

#[async_trait]
impl Stage<PageImage, PageImage> for ImageEnhancer {
    fn name(&self) -> &'static str {
        "enhance"
    }

    async fn run(&self, input: &PageImage) -> Result<PageImage, StageError> {
        let output = self.output_path(input);
        let enhancer = self.clone();
        let source = input.path.clone();
        let target = output.clone();

        tokio::task::spawn_blocking(move || enhancer.enhance_file(&source, &target))
            .await
            .map_err(|e| StageError::defect(format!("enhancement task failed: {}", e)))??;

        log::debug!("Enhanced {} -> {}", input.path.display(), output.display());
        Ok(PageImage::new(output))
    }
}
