//! Werkbank - Machine Tool Support Knowledge Base
//!
//! A RAG pipeline for machine tool customer support: ingests technical
//! documentation (PDF, TXT, Markdown) into a remote vector index and answers
//! support questions with retrieval-augmented generation.
//!
//! The name "Werkbank" is German for "workbench."
//!
//! # Overview
//!
//! Werkbank allows you to:
//! - Extract text and structural metadata from technical documents
//! - Chunk text along sentence, paragraph, and word boundaries
//! - Embed chunks with remote providers and a deterministic local fallback
//! - Store and query vectors in a remote index with metadata filtering
//! - Answer support questions with cited sources and confidence scores
//!
//! Every backend is optional: without API keys the pipeline degrades to
//! canned low-confidence answers instead of failing, so the surface stays
//! usable during setup and in air-gapped environments.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `extract` - Text extraction from uploaded documents
//! - `chunking` - Boundary-aware text chunking
//! - `embedding` - Embedding generation with a fallback chain
//! - `vector_index` - Remote vector index abstraction
//! - `completion` - LLM completion clients
//! - `rag` - RAG engine coordinating the pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use werkbank::config::Settings;
//! use werkbank::rag::{DocumentType, IngestRequest, RagEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let engine = RagEngine::from_settings(&settings);
//!
//!     let report = engine
//!         .process_document(&IngestRequest {
//!             title: "lathe-manual".to_string(),
//!             content: "Lubricate the ways daily.".to_string(),
//!             document_type: DocumentType::Manual,
//!             machine_type: Some("lathe".to_string()),
//!         })
//!         .await;
//!     println!("Stored {} vectors", report.vectors_stored);
//!
//!     let answer = engine
//!         .generate_rag_response("How often should I lubricate?", None, None, &[])
//!         .await;
//!     println!("{}", answer.response);
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod rag;
pub mod vector_index;

pub use error::{Result, WerkbankError};
