//! RAG pipeline types and orchestration.

mod engine;

pub use engine::RagEngine;

use crate::completion::TokenUsage;
use serde::{Deserialize, Serialize};

/// Category of an ingested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[default]
    Manual,
    Faq,
    Troubleshooting,
    Training,
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(DocumentType::Manual),
            "faq" => Ok(DocumentType::Faq),
            "troubleshooting" => Ok(DocumentType::Troubleshooting),
            "training" => Ok(DocumentType::Training),
            _ => Err(format!("Unknown document type: {}", s)),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentType::Manual => write!(f, "manual"),
            DocumentType::Faq => write!(f, "faq"),
            DocumentType::Troubleshooting => write!(f, "troubleshooting"),
            DocumentType::Training => write!(f, "training"),
        }
    }
}

/// A document submitted for ingestion.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub title: String,
    pub content: String,
    pub document_type: DocumentType,
    pub machine_type: Option<String>,
}

/// Outcome of a document ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Success,
    Error,
}

/// A chunk that failed to embed or store.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkFailure {
    pub index: usize,
    pub cause: String,
}

/// Ingestion report returned for every document, including partial failures.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub status: IngestStatus,
    pub title: String,
    pub document_type: DocumentType,
    pub machine_type: Option<String>,
    pub chunks_created: usize,
    pub vectors_stored: usize,
    pub failures: Vec<ChunkFailure>,
    pub message: Option<String>,
}

/// Source document cited in a response.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub title: String,
    pub score: f32,
    pub excerpt: String,
}

/// A generated answer with its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub response: String,
    pub model: String,
    pub usage: TokenUsage,
    pub confidence: f32,
    pub sources: Vec<SourceRef>,
}

/// Health snapshot of the pipeline's backends.
#[derive(Debug, Clone, Serialize)]
pub struct RagHealth {
    pub vector_index_enabled: bool,
    pub embedding_backend: bool,
    pub completion_enabled: bool,
}

impl RagHealth {
    /// Overall status string for reporting: healthy when everything is
    /// configured, degraded otherwise.
    pub fn status(&self) -> &'static str {
        if self.vector_index_enabled && self.completion_enabled {
            "healthy"
        } else {
            "degraded"
        }
    }
}
