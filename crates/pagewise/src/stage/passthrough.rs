use async_trait::async_trait;

use crate::error::StageError;

use super::{PageImage, Stage};

/// Enhancer used when image enhancement is disabled; hands back the
/// original image unchanged.
pub struct PassthroughEnhancer;

#[async_trait]
impl Stage<PageImage, PageImage> for PassthroughEnhancer {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    async fn run(&self, input: &PageImage) -> Result<PageImage, StageError> {
        Ok(input.clone())
    }
}
