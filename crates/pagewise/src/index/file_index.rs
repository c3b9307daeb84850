use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

use super::chunker::TextChunker;
use super::{validate_document_id, ArtifactIndex, ArtifactSummary, IndexStats};

const ARTIFACT_EXTENSION: &str = "json";

/// On-disk form of a document artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub document_id: String,
    pub created_at: DateTime<Utc>,
    pub text_length: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub chunks: Vec<String>,
}

/// Stores chunked document text as `{document_id}.json` files.
pub struct FileArtifactIndex {
    storage_directory: PathBuf,
    chunker: TextChunker,
}

impl FileArtifactIndex {
    pub fn new<P: AsRef<Path>>(storage_directory: P, chunker: TextChunker) -> Self {
        Self {
            storage_directory: storage_directory.as_ref().to_path_buf(),
            chunker,
        }
    }

    pub fn storage_directory(&self) -> &Path {
        &self.storage_directory
    }

    fn artifact_path(&self, document_id: &str) -> PathBuf {
        self.storage_directory
            .join(format!("{}.{}", document_id, ARTIFACT_EXTENSION))
    }

    fn ensure_directory(&self) -> Result<(), IndexError> {
        fs::create_dir_all(&self.storage_directory).map_err(|e| IndexError::CreateDirectory {
            path: self.storage_directory.clone(),
            source: e,
        })
    }

    /// Loads a stored artifact, `None` if the document was never indexed.
    pub fn load(&self, document_id: &str) -> Result<Option<StoredArtifact>, IndexError> {
        validate_document_id(document_id)?;
        let path = self.artifact_path(document_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|e| IndexError::ReadArtifact {
            path: path.clone(),
            source: e,
        })?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Removes a document's artifact. Returns false if there was none.
    pub fn delete(&self, document_id: &str) -> Result<bool, IndexError> {
        validate_document_id(document_id)?;
        let path = self.artifact_path(document_id);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("Deleted artifact for document {}", document_id);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(IndexError::DeleteArtifact { path, source: e }),
        }
    }

    /// Ids of every stored document, sorted.
    pub fn list_documents(&self) -> Result<Vec<String>, IndexError> {
        Ok(self
            .artifact_files()?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    pub fn stats(&self) -> Result<IndexStats, IndexError> {
        let files = self.artifact_files()?;
        let total_size_bytes: u64 = files.iter().map(|(_, size)| size).sum();
        let document_ids: Vec<String> = files.into_iter().map(|(id, _)| id).collect();
        Ok(IndexStats {
            total_documents: document_ids.len(),
            total_size_bytes,
            document_ids,
        })
    }

    fn artifact_files(&self) -> Result<Vec<(String, u64)>, IndexError> {
        if !self.storage_directory.exists() {
            return Ok(Vec::new());
        }
        let read_err = |e| IndexError::ReadArtifact {
            path: self.storage_directory.clone(),
            source: e,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.storage_directory).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXTENSION) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push((id.to_string(), size));
        }
        files.sort();
        Ok(files)
    }
}

impl ArtifactIndex for FileArtifactIndex {
    fn build(&self, document_id: &str, text: &str) -> Result<ArtifactSummary, IndexError> {
        validate_document_id(document_id)?;
        self.ensure_directory()?;

        let chunks = self.chunker.split(text);
        let artifact = StoredArtifact {
            document_id: document_id.to_string(),
            created_at: Utc::now(),
            text_length: text.chars().count(),
            chunk_size: self.chunker.chunk_size(),
            chunk_overlap: self.chunker.chunk_overlap(),
            chunks,
        };
        let encoded = serde_json::to_vec_pretty(&artifact)?;

        // Write beside the target and rename so readers never see a partial file.
        let path = self.artifact_path(document_id);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, encoded).map_err(|e| IndexError::WriteArtifact {
            path: staging.clone(),
            source: e,
        })?;
        fs::rename(&staging, &path).map_err(|e| IndexError::WriteArtifact {
            path: path.clone(),
            source: e,
        })?;

        log::info!(
            "Indexed document {} ({} chunks)",
            document_id,
            artifact.chunks.len()
        );
        Ok(ArtifactSummary {
            document_id: document_id.to_string(),
            chunk_count: artifact.chunks.len(),
        })
    }
}
