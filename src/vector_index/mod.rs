//! Vector index abstraction over a remote similarity-search service.
//!
//! The index is the sole owner of stored vectors; the pipeline holds no local
//! cache. Records live in namespaces and carry denormalized document metadata
//! for filtering and citation.

mod pinecone;

pub use pinecone::PineconeIndex;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exact-match conjunction over metadata fields.
pub type MetadataFilter = BTreeMap<String, String>;

/// Denormalized document/chunk metadata stored alongside each vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub title: String,
    pub document_type: String,
    pub machine_type: String,
    pub chunk_index: usize,
    pub chunk_type: String,
    /// Chunk text truncated to the storage cap, used for context assembly
    /// and citations without a round trip to the relational store.
    pub chunk_text: String,
}

/// A vector with id and metadata, as stored in the index.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// One similarity-search result.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    pub metadata: Option<RecordMetadata>,
}

/// Trait for remote vector index backends.
///
/// When the backend is not configured, `is_enabled` returns false and every
/// operation fails fast with `ServiceUnavailable` without a network attempt;
/// callers branch on `is_enabled` to choose degraded behavior.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Whether the backend is configured and usable.
    fn is_enabled(&self) -> bool;

    /// Store records, batching internally as needed. Returns the number of
    /// records written.
    async fn upsert(&self, records: &[VectorRecord], namespace: &str) -> Result<usize>;

    /// Top-k cosine similarity search, descending by score, with an optional
    /// exact-match metadata filter.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>>;

    /// Delete records by id.
    async fn delete(&self, ids: &[String], namespace: &str) -> Result<()>;
}
