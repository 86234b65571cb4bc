//! Text chunking for document ingestion.
//!
//! Splits long text into overlapping segments along semantic boundaries,
//! preferring sentence ends, then paragraph breaks, then word breaks.

use crate::error::{Result, WerkbankError};
use crate::extract::detect_technical_terms;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default target chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Coarse content-type label for a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    /// The whole text fit in one chunk.
    Single,
    Procedure,
    Specification,
    Safety,
    Maintenance,
    Overview,
    General,
    /// Emitted when splitting failed and the text was returned whole.
    Fallback,
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChunkType::Single => "single",
            ChunkType::Procedure => "procedure",
            ChunkType::Specification => "specification",
            ChunkType::Safety => "safety",
            ChunkType::Maintenance => "maintenance",
            ChunkType::Overview => "overview",
            ChunkType::General => "general",
            ChunkType::Fallback => "fallback",
        };
        write!(f, "{}", s)
    }
}

/// A bounded segment of a source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Trimmed text content.
    pub content: String,
    /// 0-based position within the document.
    pub ordinal: usize,
    /// Byte offset of the untrimmed span start in the source text.
    pub start: usize,
    /// Byte offset of the untrimmed span end in the source text.
    pub end: usize,
    pub chunk_type: ChunkType,
    /// Whether this chunk reaches the end of the source text.
    pub is_complete: bool,
    pub word_count: usize,
    pub has_technical_terms: bool,
}

/// Split text into overlapping chunks along semantic boundaries.
///
/// Never fails: if splitting hits an internal error the whole text is
/// returned as one chunk tagged [`ChunkType::Fallback`] so that ingestion can
/// proceed.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    match split_inner(text, chunk_size, overlap) {
        Ok(chunks) => {
            info!("Split text into {} chunks", chunks.len());
            chunks
        }
        Err(e) => {
            warn!("Chunking failed, returning text as a single chunk: {}", e);
            vec![Chunk {
                content: text.to_string(),
                ordinal: 0,
                start: 0,
                end: text.len(),
                chunk_type: ChunkType::Fallback,
                is_complete: true,
                word_count: text.split_whitespace().count(),
                has_technical_terms: !detect_technical_terms(text).is_empty(),
            }]
        }
    }
}

fn split_inner(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(WerkbankError::Chunking("chunk_size must be > 0".into()));
    }

    let len = text.len();
    if len <= chunk_size {
        return Ok(vec![Chunk {
            content: text.to_string(),
            ordinal: 0,
            start: 0,
            end: len,
            chunk_type: ChunkType::Single,
            is_complete: true,
            word_count: text.split_whitespace().count(),
            has_technical_terms: !detect_technical_terms(text).is_empty(),
        }]);
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut ordinal = 0usize;

    while start < len {
        // Logical end of the window; may run past the text, which marks the
        // final chunk and terminates the scan via the overlap step below.
        let mut end = start + chunk_size;

        if end < len {
            end = floor_char_boundary(text, end);
            if let Some(boundary) = find_sentence_boundary(text, start, end) {
                end = boundary;
            } else if let Some(boundary) = find_paragraph_boundary(text, start, end) {
                end = boundary;
            } else if let Some(boundary) = find_word_boundary(text, start, end) {
                end = boundary;
            }
            // No boundary found: keep the raw cut, mid-word split allowed.
        }

        let slice_end = end.min(len);
        let span = text.get(start..slice_end).ok_or_else(|| {
            WerkbankError::Chunking(format!("invalid span {}..{}", start, slice_end))
        })?;

        let content = span.trim();
        if !content.is_empty() {
            chunks.push(Chunk {
                content: content.to_string(),
                ordinal,
                start,
                end: slice_end,
                chunk_type: classify_chunk(content),
                is_complete: end >= len,
                word_count: content.split_whitespace().count(),
                has_technical_terms: !detect_technical_terms(content).is_empty(),
            });
            ordinal += 1;
        }

        // Forward progress even when the overlap would stall the scan.
        start = ceil_char_boundary(text, (start + 1).max(end.saturating_sub(overlap)));
    }

    Ok(chunks)
}

/// Rightmost sentence end in `[start, end)`.
///
/// A candidate followed by whitespace and an uppercase letter yields the
/// position after the punctuation; otherwise the punctuation position itself
/// is used, which guards against splitting inside abbreviations.
fn find_sentence_boundary(text: &str, start: usize, end: usize) -> Option<usize> {
    let window = text.get(start..end)?;
    let rel = window.rfind(['.', '!', '?'])?;
    let pos = start + rel;
    if pos <= start {
        return None;
    }

    let bytes = text.as_bytes();
    if pos + 2 < text.len()
        && bytes[pos + 1].is_ascii_whitespace()
        && bytes[pos + 2].is_ascii_uppercase()
    {
        Some(pos + 1)
    } else {
        Some(pos)
    }
}

/// Rightmost paragraph break (double newline) in `[start, end)`.
fn find_paragraph_boundary(text: &str, start: usize, end: usize) -> Option<usize> {
    let window = text.get(start..end)?;
    let rel = window.rfind("\n\n")?;
    let pos = start + rel;
    (pos > start).then_some(pos + 2)
}

/// Rightmost space in `[start, end)`.
fn find_word_boundary(text: &str, start: usize, end: usize) -> Option<usize> {
    let window = text.get(start..end)?;
    let rel = window.rfind(' ')?;
    let pos = start + rel;
    (pos > start).then_some(pos)
}

/// Classify chunk content by keyword vocabulary. First matching category
/// wins; the check order is fixed and changing it silently changes
/// classification outcomes.
pub fn classify_chunk(content: &str) -> ChunkType {
    let lower = content.to_lowercase();

    const PROCEDURE: &[&str] = &["procedure", "step", "instruction", "how to"];
    const SPECIFICATION: &[&str] = &["specification", "parameter", "setting", "configuration"];
    const SAFETY: &[&str] = &["warning", "caution", "danger", "safety"];
    const MAINTENANCE: &[&str] = &["maintenance", "service", "repair", "troubleshooting"];
    const OVERVIEW: &[&str] = &["overview", "introduction", "description"];

    let contains_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if contains_any(PROCEDURE) {
        ChunkType::Procedure
    } else if contains_any(SPECIFICATION) {
        ChunkType::Specification
    } else if contains_any(SAFETY) {
        ChunkType::Safety
    } else if contains_any(MAINTENANCE) {
        ChunkType::Maintenance
    } else if contains_any(OVERVIEW) {
        ChunkType::Overview
    } else {
        ChunkType::General
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut i = index;
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return index;
    }
    let mut i = index;
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_one_complete_chunk() {
        // Any text at or under the chunk size comes back as exactly one
        // complete chunk equal to the input, the empty string included.
        let chunks = split("", 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "");
        assert_eq!(chunks[0].chunk_type, ChunkType::Single);
        assert!(chunks[0].is_complete);

        let chunks = split("   \n\t  ", 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "   \n\t  ");
        assert!(chunks[0].is_complete);
    }

    #[test]
    fn test_short_text_single_chunk() {
        let text = "Check coolant levels daily.";
        let chunks = split(text, 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert_eq!(chunks[0].chunk_type, ChunkType::Single);
        assert!(chunks[0].is_complete);
        assert_eq!(chunks[0].ordinal, 0);
    }

    #[test]
    fn test_example_sentence_boundary_split() {
        let text = "CNC machines require daily maintenance. Always wear safety glasses. \
                    Check coolant levels weekly.";
        let chunks = split(text, 40, 5);

        assert_eq!(chunks.len(), 3);
        // Chunk 0 ends exactly after the first sentence boundary, not at the
        // raw 40-char cut.
        assert_eq!(chunks[0].content, "CNC machines require daily maintenance.");
        assert_eq!(chunks[0].end, 39);
        assert!(!chunks[0].is_complete);
        assert!(chunks[2].is_complete);
    }

    #[test]
    fn test_ordinals_strictly_increasing() {
        let text = "word ".repeat(300);
        let chunks = split(&text, 100, 20);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal, i);
        }
    }

    #[test]
    fn test_offsets_reconstruct_source_text() {
        let text = "Mount the workpiece securely. Set the spindle speed to the listed value. \
                    Engage the feed slowly and watch the chip formation. Stop immediately if \
                    the tool chatters. Deburr all edges after the final pass.";
        let chunks = split(text, 60, 10);
        assert!(chunks.len() > 1);

        // Every chunk's span maps back into the source, spans are ordered,
        // and taking each chunk's non-overlapping prefix rebuilds the text.
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks.last().unwrap().end, text.len());
        let mut rebuilt = String::new();
        for pair in chunks.windows(2) {
            rebuilt.push_str(&text[pair[0].start..pair[1].start]);
        }
        rebuilt.push_str(&text[chunks.last().unwrap().start..]);
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_forward_progress_with_large_overlap() {
        // Overlap nearly as large as the chunk size must not stall the scan.
        let text = "abcdefghij".repeat(20);
        let chunks = split(&text, 20, 19);
        assert!(!chunks.is_empty());
        for pair in chunks.windows(2) {
            assert!(pair[1].start > pair[0].start);
        }
    }

    #[test]
    fn test_mid_word_cut_when_no_boundary() {
        let text = "x".repeat(120);
        let chunks = split(&text, 50, 10);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].content.len(), 50);
    }

    #[test]
    fn test_paragraph_boundary_preferred_over_word() {
        let text = format!("{}\n\n{}", "alpha beta gamma delta", "epsilon zeta eta theta iota");
        let chunks = split(&text, 30, 5);
        // First chunk ends at the paragraph break, not at the raw cut.
        assert_eq!(chunks[0].content, "alpha beta gamma delta");
    }

    #[test]
    fn test_classification_order() {
        assert_eq!(
            classify_chunk("Step 1: follow this procedure"),
            ChunkType::Procedure
        );
        assert_eq!(
            classify_chunk("Spindle speed parameter table"),
            ChunkType::Specification
        );
        assert_eq!(classify_chunk("WARNING: hot surface"), ChunkType::Safety);
        assert_eq!(
            classify_chunk("Monthly maintenance checklist"),
            ChunkType::Maintenance
        );
        assert_eq!(
            classify_chunk("Introduction to the control panel"),
            ChunkType::Overview
        );
        assert_eq!(classify_chunk("The machine is green."), ChunkType::General);
        // First match wins: "step" appears before the safety vocabulary is
        // consulted.
        assert_eq!(
            classify_chunk("step away for safety"),
            ChunkType::Procedure
        );
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "Kühlmittel täglich prüfen und Späne entfernen. ".repeat(30);
        let chunks = split(&text, 100, 20);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.content.is_empty());
        }
    }

    #[test]
    fn test_technical_term_flag() {
        let text = format!(
            "{} {}",
            "The CNC lathe spindle runs at high rpm during roughing cuts today.",
            "Plain filler words continue here with nothing special about them at all."
        );
        let chunks = split(&text, 70, 10);
        assert!(chunks[0].has_technical_terms);
    }
}
