//! Text extraction from files.
//!
//! Real deployments plug in extractors for PDF, DOCX or OCR output; the
//! engine only sees the [`TextExtractor`] trait.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{Result, RetrievalError};

/// Turns a file into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Whether this extractor handles the given file.
    fn supports(&self, path: &Path) -> bool;

    /// Extract the file's text.
    async fn extract(&self, path: &Path) -> Result<String>;
}

/// Extensions read verbatim by [`PlainTextExtractor`].
const PLAIN_TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "csv", "json", "log"];

/// Reads UTF-8 text files as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                PLAIN_TEXT_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    async fn extract(&self, path: &Path) -> Result<String> {
        if !self.supports(path) {
            return Err(RetrievalError::Extraction {
                path: path.to_path_buf(),
                reason: "unsupported file type".to_string(),
            });
        }

        let bytes = tokio::fs::read(path).await?;
        String::from_utf8(bytes).map_err(|e| RetrievalError::Extraction {
            path: path.to_path_buf(),
            reason: format!("not valid UTF-8: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn supports_known_extensions() {
        let extractor = PlainTextExtractor;
        assert!(extractor.supports(Path::new("notes.txt")));
        assert!(extractor.supports(Path::new("README.MD")));
        assert!(!extractor.supports(Path::new("report.pdf")));
        assert!(!extractor.supports(Path::new("Makefile")));
    }

    #[tokio::test]
    async fn reads_text_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lunch.md");
        tokio::fs::write(&path, "Team lunch notes").await.unwrap();

        let text = PlainTextExtractor.extract(&path).await.unwrap();
        assert_eq!(text, "Team lunch notes");
    }

    #[tokio::test]
    async fn rejects_binary_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob.txt");
        tokio::fs::write(&path, [0xff, 0xfe, 0x00]).await.unwrap();

        let err = PlainTextExtractor.extract(&path).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Extraction { .. }));
    }

    #[tokio::test]
    async fn rejects_unsupported_type() {
        let err = PlainTextExtractor
            .extract(Path::new("scan.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Extraction { .. }));
    }
}
