use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::stage::PageImage;

/// Image types a page may be submitted as.
pub const SUPPORTED_PAGE_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/tiff",
    "image/bmp",
];

/// One page of a submitted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInput {
    pub path: PathBuf,
}

impl PageInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks that the file name maps to a supported image type.
    pub fn validate(&self) -> Result<(), ServiceError> {
        let mime = mime_guess::from_path(&self.path).first();
        match mime {
            Some(mime) if SUPPORTED_PAGE_TYPES.contains(&mime.essence_str()) => Ok(()),
            Some(mime) => Err(ServiceError::InvalidInput(format!(
                "unsupported page type {} for '{}'",
                mime.essence_str(),
                self.path.display()
            ))),
            None => Err(ServiceError::InvalidInput(format!(
                "cannot determine page type of '{}'",
                self.path.display()
            ))),
        }
    }

    pub fn into_image(self) -> PageImage {
        PageImage::new(self.path)
    }
}

/// Validates a whole submission; the first bad page rejects it.
pub fn validate_pages(pages: &[PageInput]) -> Result<(), ServiceError> {
    if pages.is_empty() {
        return Err(ServiceError::InvalidInput(
            "a document needs at least one page".to_string(),
        ));
    }
    pages.iter().try_for_each(PageInput::validate)
}
