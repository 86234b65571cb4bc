//! Document metadata extraction: technical terms and structural analysis.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Maximum number of technical terms to report per document.
const MAX_TECHNICAL_TERMS: usize = 20;

/// Keyword/regex categories for machine-tool vocabulary: machine types,
/// quality terms, materials, machining parameters, programming terms.
fn technical_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)\b(?:CNC|lathe|mill|drill|grinder|saw|press|welder|plasma|laser)\b",
            r"(?i)\b(?:tolerance|precision|accuracy|calibration|maintenance|repair)\b",
            r"(?i)\b(?:steel|aluminum|titanium|brass|copper|plastic|composite)\b",
            r"(?i)\b(?:rpm|feed rate|cutting speed|depth of cut|tool wear)\b",
            r"(?i)\b(?:G-code|M-code|programming|automation|robotics)\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid technical term pattern"))
        .collect()
    })
}

/// Detect machine-tool technical terms in text, capped at 20 distinct terms.
pub fn detect_technical_terms(text: &str) -> Vec<String> {
    let mut terms = BTreeSet::new();
    for pattern in technical_patterns() {
        for m in pattern.find_iter(text) {
            terms.insert(m.as_str().to_string());
        }
    }
    terms.into_iter().take(MAX_TECHNICAL_TERMS).collect()
}

/// Coarse structural markers of a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStructure {
    pub has_toc: bool,
    pub has_chapters: bool,
    pub has_sections: bool,
    pub has_diagrams: bool,
    pub has_tables: bool,
    pub paragraph_count: usize,
    pub list_count: usize,
}

/// Analyze document structure and organization.
pub fn analyze_structure(text: &str) -> DocumentStructure {
    static CHAPTER_RE: OnceLock<Regex> = OnceLock::new();
    static SECTION_RE: OnceLock<Regex> = OnceLock::new();
    let chapter_re =
        CHAPTER_RE.get_or_init(|| Regex::new(r"(?i)^Chapter \d+").expect("invalid chapter pattern"));
    let section_re =
        SECTION_RE.get_or_init(|| Regex::new(r"^\d+\.\d+").expect("invalid section pattern"));

    let lines: Vec<&str> = text.lines().collect();

    DocumentStructure {
        has_toc: lines
            .iter()
            .take(50)
            .any(|l| l.to_lowercase().contains("table of contents")),
        has_chapters: lines.iter().any(|l| chapter_re.is_match(l)),
        has_sections: lines.iter().any(|l| section_re.is_match(l)),
        has_diagrams: lines.iter().any(|l| {
            let lower = l.to_lowercase();
            lower.contains("figure") || lower.contains("diagram")
        }),
        has_tables: lines.iter().any(|l| l.to_lowercase().contains("table")),
        paragraph_count: lines.iter().filter(|l| l.trim().len() > 50).count(),
        list_count: lines
            .iter()
            .filter(|l| {
                let t = l.trim_start();
                t.starts_with('-')
                    || t.starts_with('\u{2022}')
                    || t.starts_with('*')
                    || t.starts_with("1.")
                    || t.starts_with("2.")
            })
            .count(),
    }
}

/// Metadata emitted alongside extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub file_type: String,
    pub extraction_date: DateTime<Utc>,
    /// SHA-256 over the extracted text, for idempotent re-ingestion detection.
    pub content_hash: String,
    pub word_count: usize,
    pub character_count: usize,
    pub estimated_pages: usize,
    pub technical_terms: Vec<String>,
    pub structure: DocumentStructure,
}

impl DocumentMetadata {
    /// Build metadata for extracted text.
    pub fn from_text(text: &str, filename: &str, file_type: &str) -> Self {
        Self {
            filename: filename.to_string(),
            file_type: file_type.to_string(),
            extraction_date: Utc::now(),
            content_hash: content_hash(text),
            word_count: text.split_whitespace().count(),
            character_count: text.len(),
            estimated_pages: (text.len() / 2000).max(1),
            technical_terms: detect_technical_terms(text),
            structure: analyze_structure(text),
        }
    }
}

/// SHA-256 hex digest of text content.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
