//! Document-level searchable artifacts.

pub mod chunker;
pub mod file_index;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

pub use chunker::TextChunker;
pub use file_index::{FileArtifactIndex, StoredArtifact};

/// What was persisted for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub document_id: String,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_size_bytes: u64,
    pub document_ids: Vec<String>,
}

/// Persists a searchable artifact built from a document's text.
///
/// Building the same document id twice replaces the earlier artifact.
/// Implementations may block; callers on the async runtime should use
/// `spawn_blocking`.
pub trait ArtifactIndex: Send + Sync {
    fn build(&self, document_id: &str, text: &str) -> Result<ArtifactSummary, IndexError>;
}

/// Rejects ids that could escape the storage directory.
pub fn validate_document_id(document_id: &str) -> Result<(), IndexError> {
    let valid = !document_id.is_empty()
        && !document_id.starts_with('.')
        && document_id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(IndexError::InvalidDocumentId(document_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_validation() {
        assert!(validate_document_id("scan_page1_1a2b3c4d").is_ok());
        assert!(validate_document_id("report-2024.v2").is_ok());
        assert!(validate_document_id("").is_err());
        assert!(validate_document_id("../etc/passwd").is_err());
        assert!(validate_document_id("a/b").is_err());
        assert!(validate_document_id(".hidden").is_err());
    }
}
