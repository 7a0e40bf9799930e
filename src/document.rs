//! Staged document handling: file identity and PDF text extraction.
//!
//! A staged document is the transient working copy of the user's upload. Its
//! bytes live in memory for the lifetime of one staging and are dropped when
//! the file is removed or replaced.

use crate::error::{IndexingError, IndexResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The value used to decide whether two file selections refer to the same
/// document.
///
/// Name plus byte length. The name alone is not enough: two different files
/// with the same name must trigger re-indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    /// File name, without directory components.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
}

impl FileIdentity {
    /// Create a new file identity.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// File size in mebibytes, for display.
    #[must_use]
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / 1024.0 / 1024.0
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2} MB)", self.name, self.size_mb())
    }
}

/// Text content of one PDF page.
#[derive(Debug, Clone)]
pub struct PageText {
    /// 1-based page number.
    pub number: u32,
    /// Extracted text.
    pub text: String,
}

/// A staged document: identity plus the raw bytes of the working copy.
#[derive(Debug, Clone)]
pub struct StagedDocument {
    identity: FileIdentity,
    bytes: Vec<u8>,
}

impl StagedDocument {
    /// Create a staged document from raw bytes and a file name.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let size = bytes.len() as u64;
        Self {
            identity: FileIdentity::new(name, size),
            bytes,
        }
    }

    /// Stage a document from the filesystem.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, bytes))
    }

    /// Identity of this document.
    #[must_use]
    pub const fn identity(&self) -> &FileIdentity {
        &self.identity
    }

    /// Raw bytes of the working copy.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Extract per-page text from the PDF.
    ///
    /// Pages that yield only whitespace are skipped. Returns
    /// [`IndexingError::EmptyDocument`] when no page has extractable text.
    pub fn extract_pages(&self) -> IndexResult<Vec<PageText>> {
        let doc = lopdf::Document::load_mem(&self.bytes)
            .map_err(|e| IndexingError::pdf(e.to_string()))?;

        let mut pages = Vec::new();
        for (&number, _) in &doc.get_pages() {
            let text = doc
                .extract_text(&[number])
                .map_err(|e| IndexingError::pdf(format!("page {number}: {e}")))?;
            if !text.trim().is_empty() {
                pages.push(PageText { number, text });
            }
        }

        if pages.is_empty() {
            return Err(IndexingError::EmptyDocument);
        }

        tracing::debug!(
            name = %self.identity.name,
            pages = pages.len(),
            "extracted document text"
        );
        Ok(pages)
    }

    /// Number of pages in the PDF, for the staged-file preview.
    pub fn page_count(&self) -> IndexResult<usize> {
        let doc = lopdf::Document::load_mem(&self.bytes)
            .map_err(|e| IndexingError::pdf(e.to_string()))?;
        Ok(doc.get_pages().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality() {
        let a = FileIdentity::new("report.pdf", 1024);
        let b = FileIdentity::new("report.pdf", 1024);
        let c = FileIdentity::new("report.pdf", 2048);
        let d = FileIdentity::new("other.pdf", 1024);

        assert_eq!(a, b);
        // Same name, different content length: a different document.
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_identity_display() {
        let id = FileIdentity::new("report.pdf", 2 * 1024 * 1024);
        assert_eq!(id.to_string(), "report.pdf (2.00 MB)");
    }

    #[test]
    fn test_staged_document_identity_from_bytes() {
        let doc = StagedDocument::new("report.pdf", vec![0u8; 512]);
        assert_eq!(doc.identity().name, "report.pdf");
        assert_eq!(doc.identity().size, 512);
        assert_eq!(doc.bytes().len(), 512);
    }

    #[test]
    fn test_extract_rejects_malformed_pdf() {
        let doc = StagedDocument::new("bad.pdf", b"not a pdf".to_vec());
        let err = doc.extract_pages().unwrap_err();
        assert!(matches!(err, IndexingError::Pdf(_)));
    }
}
