//! Per-document text extraction.
//!
//! Converts one source file into plain UTF-8 text. Extraction failures are
//! per-document and recoverable: the orchestrator records them and moves on
//! to the next file. A document that yields only whitespace is treated the
//! same as a failed extraction.

use std::path::Path;

/// Extraction error. Scoped to a single source document; never fatal to a
/// run (the pipeline skips the document and continues).
#[derive(Debug)]
pub enum ExtractError {
    /// The file could not be read.
    Read(String),
    /// The PDF parser rejected the content.
    Pdf(String),
    /// Extraction produced no text after trimming whitespace.
    Empty,
    /// The file extension maps to no known extractor.
    Unsupported(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Read(e) => write!(f, "read failed: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Empty => write!(f, "no text extracted"),
            ExtractError::Unsupported(ext) => write!(f, "unsupported file type: {}", ext),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract plain text from a source document, dispatching on extension.
pub fn extract_document(path: &Path) -> Result<String, ExtractError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let text = match ext.as_str() {
        "pdf" => {
            let bytes = std::fs::read(path).map_err(|e| ExtractError::Read(e.to_string()))?;
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| ExtractError::Pdf(e.to_string()))?
        }
        "txt" | "md" => {
            std::fs::read_to_string(path).map_err(|e| ExtractError::Read(e.to_string()))?
        }
        other => return Err(ExtractError::Unsupported(other.to_string())),
    };

    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }

    Ok(text)
}

/// Document name used for citation: the filename stem.
pub fn doc_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extension_returns_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("ruling.docx");
        std::fs::write(&path, b"whatever").unwrap();
        let err = extract_document(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("ruling.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        let err = extract_document(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn missing_file_returns_read_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("missing.txt");
        let err = extract_document(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Read(_)));
    }

    #[test]
    fn whitespace_only_text_is_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("blank.txt");
        std::fs::write(&path, "  \n\t  \n").unwrap();
        let err = extract_document(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Empty));
    }

    #[test]
    fn plain_text_extracts() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("judgment_2023.txt");
        std::fs::write(&path, "The tribunal finds for the claimant.").unwrap();
        let text = extract_document(&path).unwrap();
        assert_eq!(text, "The tribunal finds for the claimant.");
        assert_eq!(doc_name(&path), "judgment_2023");
    }
}
