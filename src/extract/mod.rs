//! Text extraction from uploaded documents.
//!
//! Converts PDF, TXT, and Markdown files into plain text plus structural
//! metadata for the ingestion pipeline.

mod metadata;

pub use metadata::{
    analyze_structure, content_hash, detect_technical_terms, DocumentMetadata, DocumentStructure,
};

use crate::error::{Result, WerkbankError};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Text,
    Markdown,
}

impl FileType {
    /// Detect the file type from a filename extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(FileType::Pdf)
        } else if lower.ends_with(".txt") {
            Some(FileType::Text)
        } else if lower.ends_with(".md") {
            Some(FileType::Markdown)
        } else {
            None
        }
    }

    /// The canonical extension for this type.
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Pdf => ".pdf",
            FileType::Text => ".txt",
            FileType::Markdown => ".md",
        }
    }
}

/// Result of extracting text from an uploaded file.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Extract plain text and metadata from uploaded file bytes.
///
/// Fails with [`WerkbankError::UnsupportedFormat`] for unknown extensions and
/// [`WerkbankError::Extraction`] when the file cannot be decoded. Extraction
/// errors abort the whole upload; there is no partial result.
pub fn extract(bytes: &[u8], filename: &str) -> Result<ExtractedDocument> {
    let file_type = FileType::from_filename(filename)
        .ok_or_else(|| WerkbankError::UnsupportedFormat(filename.to_string()))?;

    let text = match file_type {
        FileType::Pdf => extract_pdf(bytes)?,
        FileType::Text | FileType::Markdown => decode_text(bytes),
    };

    if text.trim().is_empty() {
        return Err(WerkbankError::Extraction(format!(
            "no text content in {}",
            filename
        )));
    }

    let metadata = DocumentMetadata::from_text(&text, filename, file_type.extension());
    debug!(
        "Extracted {} characters ({} words) from {}",
        metadata.character_count, metadata.word_count, filename
    );

    Ok(ExtractedDocument { text, metadata })
}

/// Extract text from PDF bytes, page by page, with cleanup heuristics.
fn extract_pdf(bytes: &[u8]) -> Result<String> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| WerkbankError::Extraction(format!("PDF parse error: {}", e)))?;

    // Form feeds separate pages in the extractor output; a PDF without them
    // is treated as a single page.
    let mut parts = Vec::new();
    for (page_num, page) in raw.split('\u{0c}').enumerate() {
        let cleaned = clean_pdf_text(page);
        if !cleaned.is_empty() {
            parts.push(format!("--- Page {} ---\n{}", page_num + 1, cleaned));
        }
    }

    let full_text = parts.join("\n\n");
    info!("Extracted {} characters from PDF", full_text.len());
    Ok(full_text)
}

/// Clean up common PDF extraction artifacts.
///
/// The OCR corrections (`|` to `I`, `0` to `O`) and digit stripping can
/// corrupt legitimate digits and pipes in source text. This is a known
/// tradeoff of the heuristics, not something to patch per-document.
fn clean_pdf_text(text: &str) -> String {
    static FOOTER_RE: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();
    let footer_re =
        FOOTER_RE.get_or_init(|| Regex::new(r"Page \d+ of \d+").expect("invalid footer pattern"));
    let whitespace_re =
        WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("invalid whitespace pattern"));

    // Remove "Page N of M" footers and standalone page-number lines before
    // newlines are collapsed away.
    let text = footer_re.replace_all(text, "");
    let text: String = text
        .lines()
        .filter(|line| {
            let t = line.trim();
            t.is_empty() || !t.chars().all(|c| c.is_ascii_digit())
        })
        .collect::<Vec<_>>()
        .join("\n");

    let text = whitespace_re.replace_all(&text, " ");
    let text = text.replace('|', "I").replace('0', "O");

    text.trim().to_string()
}

/// Decode text file bytes as UTF-8, falling back to Latin-1.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // Latin-1 maps every byte to the same code point, so this cannot fail.
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_filename("manual.pdf"), Some(FileType::Pdf));
        assert_eq!(FileType::from_filename("NOTES.TXT"), Some(FileType::Text));
        assert_eq!(
            FileType::from_filename("readme.md"),
            Some(FileType::Markdown)
        );
        assert_eq!(FileType::from_filename("report.docx"), None);
        assert_eq!(FileType::from_filename("archive"), None);
    }

    #[test]
    fn test_unsupported_format_rejected() {
        let err = extract(b"irrelevant", "report.docx").unwrap_err();
        assert!(matches!(err, WerkbankError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_extract_text_file() {
        let doc = extract(b"Spindle maintenance guide for the CNC lathe.", "guide.txt").unwrap();
        assert_eq!(doc.text, "Spindle maintenance guide for the CNC lathe.");
        assert_eq!(doc.metadata.file_type, ".txt");
        assert!(doc
            .metadata
            .technical_terms
            .iter()
            .any(|t| t == "maintenance"));
    }

    #[test]
    fn test_extract_latin1_fallback() {
        // 0xE9 is 'é' in Latin-1 but invalid standalone UTF-8.
        let bytes = b"caf\xe9 maintenance notes";
        let doc = extract(bytes, "notes.txt").unwrap();
        assert!(doc.text.starts_with("café"));
    }

    #[test]
    fn test_empty_file_fails_extraction() {
        let err = extract(b"   \n  ", "empty.txt").unwrap_err();
        assert!(matches!(err, WerkbankError::Extraction(_)));
    }

    #[test]
    fn test_invalid_pdf_fails_extraction() {
        let err = extract(b"not a pdf at all", "broken.pdf").unwrap_err();
        assert!(matches!(err, WerkbankError::Extraction(_)));
    }

    #[test]
    fn test_clean_pdf_text_removes_footers_and_page_numbers() {
        let cleaned = clean_pdf_text("Spindle alignment\nPage 3 of 12\n42\nprocedure follows");
        assert!(!cleaned.contains("Page"));
        assert!(!cleaned.contains("42"));
        assert!(cleaned.contains("Spindle alignment"));
        assert!(cleaned.contains("procedure follows"));
    }

    #[test]
    fn test_clean_pdf_text_ocr_corrections() {
        // Pipe and zero glyph miscodings are rewritten even when the source
        // characters were legitimate.
        let cleaned = clean_pdf_text("va|ve O-ring");
        assert_eq!(cleaned, "vaIve O-ring");
        let cleaned = clean_pdf_text("model X");
        assert_eq!(cleaned, "model X");
    }

    #[test]
    fn test_clean_pdf_text_collapses_whitespace() {
        let cleaned = clean_pdf_text("too   many\n\n   spaces here");
        assert_eq!(cleaned, "too many spaces here");
    }
}
