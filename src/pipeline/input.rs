//! Input resolution: validate a user-supplied path and load its contents.
//!
//! Existence is checked before anything else so a typo in the path surfaces
//! as [`TriageError::NotFound`] without a single network call being made.

use crate::error::TriageError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Plain document text plus where it came from. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub source: Option<PathBuf>,
}

impl Document {
    /// Wrap text that has no file of origin.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
        }
    }

    /// Wrap text extracted from `source`.
    pub fn with_source(text: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            source: Some(source.into()),
        }
    }

    /// Load an already-extracted UTF-8 text file, skipping OCR.
    pub async fn from_text_file(path: impl AsRef<Path>) -> Result<Self, TriageError> {
        let path = resolve_local(path.as_ref())?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| map_read_error(&path, e))?;
        debug!("Loaded {} chars of text from {}", text.len(), path.display());
        Ok(Self::with_source(text, path))
    }

    /// Character count of the text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Validate that a local path exists.
pub fn resolve_local(path: &Path) -> Result<PathBuf, TriageError> {
    if !path.exists() {
        return Err(TriageError::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(path.to_path_buf())
}

/// Read the raw bytes of a local document.
pub async fn read_document_bytes(path: &Path) -> Result<Vec<u8>, TriageError> {
    let path = resolve_local(path)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| map_read_error(&path, e))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

fn map_read_error(path: &Path, e: std::io::Error) -> TriageError {
    match e.kind() {
        ErrorKind::NotFound => TriageError::NotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => TriageError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => TriageError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    }
}
