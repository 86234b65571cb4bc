//! RAG engine coordinating chunking, embedding, retrieval, and completion.

use super::{
    ChunkFailure, IngestReport, IngestRequest, IngestStatus, RagHealth, RagResponse, SourceRef,
};
use crate::chunking::{self, Chunk};
use crate::completion::{ChatMessage, CompletionClient, GroqCompletionClient, TokenUsage};
use crate::config::Settings;
use crate::embedding::{Embedder, EmbeddingService};
use crate::error::Result;
use crate::vector_index::{
    MetadataFilter, PineconeIndex, RecordMetadata, VectorIndex, VectorRecord,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Marker model name for answers produced without retrieval or an LLM.
const FALLBACK_MODEL: &str = "rag-fallback";
/// Marker model name for answers produced after an unexpected failure.
const ERROR_MODEL: &str = "error-fallback";

/// The main RAG engine.
///
/// Every public operation is infallible at the surface: ingestion reports
/// partial failures per chunk, and query answering degrades to canned
/// responses instead of surfacing errors to the caller.
pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    completion: Arc<dyn CompletionClient>,
    chunk_size: usize,
    chunk_overlap: usize,
    context_limit: usize,
    history_limit: usize,
    namespace: String,
}

impl RagEngine {
    /// Create an engine with explicit components.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        completion: Arc<dyn CompletionClient>,
        settings: &Settings,
    ) -> Self {
        Self {
            embedder,
            index,
            completion,
            chunk_size: settings.chunking.chunk_size,
            chunk_overlap: settings.chunking.chunk_overlap,
            context_limit: settings.rag.context_limit,
            history_limit: settings.rag.history_limit,
            namespace: settings.vector_index.namespace.clone(),
        }
    }

    /// Create an engine wired to the configured backends.
    pub fn from_settings(settings: &Settings) -> Self {
        let embedder = Arc::new(EmbeddingService::from_settings(&settings.embedding));
        let index = Arc::new(PineconeIndex::from_settings(&settings.vector_index));
        let completion = Arc::new(GroqCompletionClient::from_settings(&settings.completion));
        Self::new(embedder, index, completion, settings)
    }

    /// Chunk, embed, and store a document.
    ///
    /// Never fails as a whole: chunks that cannot be embedded or stored are
    /// recorded in the report while the rest proceed.
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn process_document(&self, request: &IngestRequest) -> IngestReport {
        let chunks = chunking::split(&request.content, self.chunk_size, self.chunk_overlap);

        if chunks.is_empty() {
            return IngestReport {
                status: IngestStatus::Error,
                title: request.title.clone(),
                document_type: request.document_type,
                machine_type: request.machine_type.clone(),
                chunks_created: 0,
                vectors_stored: 0,
                failures: Vec::new(),
                message: Some("Failed to chunk document".to_string()),
            };
        }

        if !self.index.is_enabled() {
            info!(
                chunks = chunks.len(),
                "Vector index not configured, skipping storage"
            );
            return IngestReport {
                status: IngestStatus::Success,
                title: request.title.clone(),
                document_type: request.document_type,
                machine_type: request.machine_type.clone(),
                chunks_created: chunks.len(),
                vectors_stored: 0,
                failures: Vec::new(),
                message: Some("Vector index not configured, chunks were not stored".to_string()),
            };
        }

        let mut vectors_stored = 0;
        let mut failures = Vec::new();
        for chunk in &chunks {
            match self.store_chunk(request, chunk).await {
                Ok(()) => vectors_stored += 1,
                Err(e) => {
                    warn!(chunk = chunk.ordinal, "Failed to store chunk: {}", e);
                    failures.push(ChunkFailure {
                        index: chunk.ordinal,
                        cause: e.to_string(),
                    });
                }
            }
        }

        info!(
            chunks = chunks.len(),
            stored = vectors_stored,
            "Document processed"
        );

        IngestReport {
            status: IngestStatus::Success,
            title: request.title.clone(),
            document_type: request.document_type,
            machine_type: request.machine_type.clone(),
            chunks_created: chunks.len(),
            vectors_stored,
            failures,
            message: None,
        }
    }

    async fn store_chunk(&self, request: &IngestRequest, chunk: &Chunk) -> Result<()> {
        let values = self.embedder.embed(&chunk.content).await?;
        let record = VectorRecord {
            id: vector_id(&request.title, chunk.ordinal, &chunk.content),
            values,
            metadata: RecordMetadata {
                title: request.title.clone(),
                document_type: request.document_type.to_string(),
                machine_type: request
                    .machine_type
                    .clone()
                    .unwrap_or_else(|| "general".to_string()),
                chunk_index: chunk.ordinal,
                chunk_type: chunk.chunk_type.to_string(),
                chunk_text: truncate_chars(&chunk.content, 500),
            },
        };
        self.index.upsert(&[record], &self.namespace).await?;
        Ok(())
    }

    /// Answer a query with retrieved context and conversation history.
    ///
    /// Degrades instead of failing: when the index or the LLM is not
    /// configured a canned low-confidence answer is returned, and unexpected
    /// failures produce an apology response.
    #[instrument(skip(self, history), fields(query = %query))]
    pub async fn generate_rag_response(
        &self,
        query: &str,
        machine_type: Option<&str>,
        context_limit: Option<usize>,
        history: &[ChatMessage],
    ) -> RagResponse {
        if !self.index.is_enabled() || !self.completion.is_enabled() {
            return degraded_response(query, machine_type);
        }

        match self
            .answer(query, machine_type, context_limit, history)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("RAG answer failed: {}", e);
                error_response(query)
            }
        }
    }

    async fn answer(
        &self,
        query: &str,
        machine_type: Option<&str>,
        context_limit: Option<usize>,
        history: &[ChatMessage],
    ) -> Result<RagResponse> {
        let top_k = context_limit.unwrap_or(self.context_limit);
        let query_vector = self.embedder.embed(query).await?;

        let filter = machine_type.map(|mt| {
            let mut f = MetadataFilter::new();
            f.insert("machine_type".to_string(), mt.to_string());
            f
        });

        let matches = self
            .index
            .query(&query_vector, top_k, &self.namespace, filter.as_ref())
            .await?;

        let mut context_parts = Vec::new();
        let mut sources = Vec::new();
        for m in &matches {
            if let Some(metadata) = &m.metadata {
                context_parts.push(format!("[{}]\n{}", metadata.title, metadata.chunk_text));
                sources.push(SourceRef {
                    title: metadata.title.clone(),
                    score: m.score,
                    excerpt: excerpt(&metadata.chunk_text),
                });
            }
        }

        let context = if context_parts.is_empty() {
            "No relevant documents found.".to_string()
        } else {
            context_parts.join("\n\n")
        };

        // History is bounded to the most recent turns, oldest dropped first.
        let start = history.len().saturating_sub(self.history_limit);
        let mut messages: Vec<ChatMessage> = history[start..].to_vec();
        messages.push(ChatMessage::user(query));

        let result = self.completion.complete(&messages, Some(&context)).await?;

        Ok(RagResponse {
            response: result.text,
            model: result.model,
            usage: result.usage,
            confidence: result.confidence,
            sources,
        })
    }

    /// Report which backends are configured.
    pub fn health_check(&self) -> RagHealth {
        RagHealth {
            vector_index_enabled: self.index.is_enabled(),
            embedding_backend: self.embedder.has_remote_backend(),
            completion_enabled: self.completion.is_enabled(),
        }
    }
}

/// Canned answer when retrieval or completion backends are not configured.
fn degraded_response(query: &str, machine_type: Option<&str>) -> RagResponse {
    let mut response = format!("I understand you're asking about: '{}'. ", query);
    if let Some(mt) = machine_type {
        response.push_str(&format!("This relates to {} machines. ", mt));
    }
    response.push_str(
        "I'm currently in a simplified mode because the vector index or AI services are not \
         configured. Please configure your API keys to enable full RAG functionality.",
    );

    let prompt_tokens = query.split_whitespace().count() as u32;
    let completion_tokens = response.split_whitespace().count() as u32;
    RagResponse {
        response,
        model: FALLBACK_MODEL.to_string(),
        usage: TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        },
        confidence: 0.3,
        sources: Vec::new(),
    }
}

/// Canned answer when an unexpected failure occurs mid-pipeline.
fn error_response(query: &str) -> RagResponse {
    RagResponse {
        response: format!(
            "I apologize, but I'm experiencing technical difficulties. Your query was: '{}'. \
             Please try again later.",
            query
        ),
        model: ERROR_MODEL.to_string(),
        usage: TokenUsage::default(),
        confidence: 0.1,
        sources: Vec::new(),
    }
}

/// Stable vector id derived from document title, chunk ordinal, and a short
/// content fingerprint.
fn vector_id(title: &str, ordinal: usize, content: &str) -> String {
    format!("{}_{}_{}", title, ordinal, content_fingerprint(content))
}

/// Four-digit deterministic fingerprint of chunk content.
fn content_fingerprint(content: &str) -> u32 {
    let digest = Sha256::digest(content.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) % 10_000
}

/// Truncate on a char boundary without allocating beyond the cap.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Citation excerpt, capped at 200 chars with an ellipsis marker.
fn excerpt(text: &str) -> String {
    if text.chars().count() > 200 {
        format!("{}...", truncate_chars(text, 200))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionResult, ConfidenceStrategy, Role};
    use crate::error::WerkbankError;
    use crate::rag::DocumentType;
    use crate::vector_index::VectorMatch;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockEmbedder {
        fail_on_call: Option<usize>,
        calls: AtomicUsize,
    }

    impl MockEmbedder {
        fn new() -> Self {
            Self {
                fail_on_call: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing_on(call: usize) -> Self {
            Self {
                fail_on_call: Some(call),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_on_call {
                return Err(WerkbankError::Embedding("simulated failure".into()));
            }
            Ok(vec![0.5; 8])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.5; 8]).collect())
        }

        fn dimensions(&self) -> usize {
            8
        }

        fn has_remote_backend(&self) -> bool {
            true
        }
    }

    struct MockIndex {
        enabled: bool,
        matches: Vec<VectorMatch>,
        upserted: Mutex<Vec<String>>,
    }

    impl MockIndex {
        fn enabled_with(matches: Vec<VectorMatch>) -> Self {
            Self {
                enabled: true,
                matches,
                upserted: Mutex::new(Vec::new()),
            }
        }

        fn disabled() -> Self {
            Self {
                enabled: false,
                matches: Vec::new(),
                upserted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VectorIndex for MockIndex {
        fn is_enabled(&self) -> bool {
            self.enabled
        }

        async fn upsert(&self, records: &[VectorRecord], _namespace: &str) -> Result<usize> {
            let mut stored = self.upserted.lock().unwrap();
            for r in records {
                stored.push(r.id.clone());
            }
            Ok(records.len())
        }

        async fn query(
            &self,
            _vector: &[f32],
            _top_k: usize,
            _namespace: &str,
            _filter: Option<&MetadataFilter>,
        ) -> Result<Vec<VectorMatch>> {
            Ok(self.matches.clone())
        }

        async fn delete(&self, _ids: &[String], _namespace: &str) -> Result<()> {
            Ok(())
        }
    }

    struct MockCompletion {
        enabled: bool,
        last_context: Mutex<Option<String>>,
        last_messages: Mutex<Vec<ChatMessage>>,
    }

    impl MockCompletion {
        fn enabled() -> Self {
            Self {
                enabled: true,
                last_context: Mutex::new(None),
                last_messages: Mutex::new(Vec::new()),
            }
        }

        fn disabled() -> Self {
            Self {
                enabled: false,
                last_context: Mutex::new(None),
                last_messages: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for MockCompletion {
        fn is_enabled(&self) -> bool {
            self.enabled
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
            context: Option<&str>,
        ) -> Result<CompletionResult> {
            *self.last_context.lock().unwrap() = context.map(String::from);
            *self.last_messages.lock().unwrap() = messages.to_vec();
            let usage = TokenUsage {
                prompt_tokens: 50,
                completion_tokens: 40,
                total_tokens: 90,
            };
            Ok(CompletionResult {
                text: "Check the coolant reservoir and top up as needed.".to_string(),
                model: "llama-3.1-8b-instant".to_string(),
                confidence: ConfidenceStrategy::Usage.score("", &usage),
                usage,
            })
        }
    }

    fn engine_with(
        embedder: MockEmbedder,
        index: Arc<MockIndex>,
        completion: Arc<MockCompletion>,
    ) -> RagEngine {
        RagEngine::new(Arc::new(embedder), index, completion, &Settings::default())
    }

    fn sample_request() -> IngestRequest {
        IngestRequest {
            title: "lathe-manual".to_string(),
            content: "Lubricate the ways daily. ".repeat(100),
            document_type: DocumentType::Manual,
            machine_type: Some("lathe".to_string()),
        }
    }

    fn sample_match(title: &str, text: &str, score: f32) -> VectorMatch {
        VectorMatch {
            id: format!("{}_0_1234", title),
            score,
            metadata: Some(RecordMetadata {
                title: title.to_string(),
                document_type: "manual".to_string(),
                machine_type: "lathe".to_string(),
                chunk_index: 0,
                chunk_type: "maintenance".to_string(),
                chunk_text: text.to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_process_document_stores_all_chunks() {
        let index = Arc::new(MockIndex::enabled_with(Vec::new()));
        let engine = engine_with(
            MockEmbedder::new(),
            index.clone(),
            Arc::new(MockCompletion::enabled()),
        );

        let report = engine.process_document(&sample_request()).await;
        assert_eq!(report.status, IngestStatus::Success);
        assert!(report.chunks_created > 1);
        assert_eq!(report.vectors_stored, report.chunks_created);
        assert!(report.failures.is_empty());
        assert_eq!(
            index.upserted.lock().unwrap().len(),
            report.chunks_created
        );
    }

    #[tokio::test]
    async fn test_process_document_partial_failure() {
        let index = Arc::new(MockIndex::enabled_with(Vec::new()));
        let engine = engine_with(
            MockEmbedder::failing_on(2),
            index,
            Arc::new(MockCompletion::enabled()),
        );

        // 2000 boundary-free chars with size 500 / overlap 50 yields starts
        // at 0, 450, 900, 1350, 1800: exactly five chunks.
        let request = IngestRequest {
            title: "mill-manual".to_string(),
            content: "x".repeat(2000),
            document_type: DocumentType::Manual,
            machine_type: None,
        };
        let report = engine.process_document(&request).await;
        assert_eq!(report.status, IngestStatus::Success);
        assert_eq!(report.chunks_created, 5);
        assert_eq!(report.vectors_stored, 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 2);
    }

    #[tokio::test]
    async fn test_process_document_empty_content_stores_single_chunk() {
        let index = Arc::new(MockIndex::enabled_with(Vec::new()));
        let engine = engine_with(
            MockEmbedder::new(),
            index.clone(),
            Arc::new(MockCompletion::enabled()),
        );

        let request = IngestRequest {
            title: "empty".to_string(),
            content: String::new(),
            document_type: DocumentType::Manual,
            machine_type: None,
        };
        let report = engine.process_document(&request).await;
        assert_eq!(report.status, IngestStatus::Success);
        assert_eq!(report.chunks_created, 1);
        assert_eq!(report.vectors_stored, 1);
        assert_eq!(index.upserted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_process_document_long_whitespace_fails_chunking() {
        // Past the chunk size every window trims to nothing, so no chunk
        // survives and the report flags the document.
        let engine = engine_with(
            MockEmbedder::new(),
            Arc::new(MockIndex::enabled_with(Vec::new())),
            Arc::new(MockCompletion::enabled()),
        );

        let request = IngestRequest {
            title: "blank".to_string(),
            content: " ".repeat(2000),
            document_type: DocumentType::Manual,
            machine_type: None,
        };
        let report = engine.process_document(&request).await;
        assert_eq!(report.status, IngestStatus::Error);
        assert_eq!(report.chunks_created, 0);
        assert!(report.message.as_deref().unwrap().contains("chunk"));
    }

    #[tokio::test]
    async fn test_process_document_index_disabled() {
        let engine = engine_with(
            MockEmbedder::new(),
            Arc::new(MockIndex::disabled()),
            Arc::new(MockCompletion::enabled()),
        );

        let report = engine.process_document(&sample_request()).await;
        assert_eq!(report.status, IngestStatus::Success);
        assert!(report.chunks_created > 0);
        assert_eq!(report.vectors_stored, 0);
        assert!(report.message.is_some());
    }

    #[tokio::test]
    async fn test_response_with_context_and_sources() {
        let matches = vec![
            sample_match("lathe-manual", "Check coolant levels weekly.", 0.92),
            sample_match("mill-faq", "Replace the spindle belt yearly.", 0.80),
        ];
        let completion = Arc::new(MockCompletion::enabled());
        let engine = engine_with(
            MockEmbedder::new(),
            Arc::new(MockIndex::enabled_with(matches)),
            completion.clone(),
        );

        let response = engine
            .generate_rag_response("How often to check coolant?", None, None, &[])
            .await;
        assert_eq!(response.sources.len(), 2);
        assert_eq!(response.sources[0].title, "lathe-manual");
        assert!(response.confidence > 0.3);

        let ctx = completion.last_context.lock().unwrap().clone().unwrap();
        assert!(ctx.contains("[lathe-manual]\nCheck coolant levels weekly."));
        assert!(ctx.contains("[mill-faq]"));
    }

    #[tokio::test]
    async fn test_history_bounded_to_most_recent_turns() {
        let completion = Arc::new(MockCompletion::enabled());
        let engine = engine_with(
            MockEmbedder::new(),
            Arc::new(MockIndex::enabled_with(Vec::new())),
            completion.clone(),
        );

        // 14 prior turns against the default history limit of 10: the four
        // oldest must be dropped, the rest forwarded in order.
        let history: Vec<ChatMessage> = (0..14)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(format!("question {}", i))
                } else {
                    ChatMessage::assistant(format!("answer {}", i))
                }
            })
            .collect();

        engine
            .generate_rag_response("latest question", None, None, &history)
            .await;

        let sent = completion.last_messages.lock().unwrap().clone();
        assert_eq!(sent.len(), 11);
        assert_eq!(sent[0].content, "question 4");
        assert_eq!(sent[9].content, "answer 13");
        assert_eq!(sent[10].content, "latest question");
        assert_eq!(sent[10].role, Role::User);
    }

    #[tokio::test]
    async fn test_response_no_matches_uses_placeholder_context() {
        let completion = Arc::new(MockCompletion::enabled());
        let engine = engine_with(
            MockEmbedder::new(),
            Arc::new(MockIndex::enabled_with(Vec::new())),
            completion.clone(),
        );

        let response = engine
            .generate_rag_response("Unknown topic", None, None, &[])
            .await;
        assert!(response.sources.is_empty());
        let ctx = completion.last_context.lock().unwrap().clone().unwrap();
        assert_eq!(ctx, "No relevant documents found.");
    }

    #[tokio::test]
    async fn test_degraded_response_when_index_disabled() {
        let engine = engine_with(
            MockEmbedder::new(),
            Arc::new(MockIndex::disabled()),
            Arc::new(MockCompletion::enabled()),
        );

        let response = engine
            .generate_rag_response("coolant check", Some("lathe"), None, &[])
            .await;
        assert_eq!(response.model, FALLBACK_MODEL);
        assert_eq!(response.confidence, 0.3);
        assert!(response.response.contains("coolant check"));
        assert!(response.response.contains("This relates to lathe machines."));
        assert!(response.sources.is_empty());
        assert_eq!(
            response.usage.total_tokens,
            response.usage.prompt_tokens + response.usage.completion_tokens
        );
    }

    #[tokio::test]
    async fn test_degraded_response_when_completion_disabled() {
        let engine = engine_with(
            MockEmbedder::new(),
            Arc::new(MockIndex::enabled_with(Vec::new())),
            Arc::new(MockCompletion::disabled()),
        );

        let response = engine
            .generate_rag_response("coolant check", None, None, &[])
            .await;
        assert_eq!(response.model, FALLBACK_MODEL);
        assert!(!response.response.contains("This relates to"));
    }

    #[tokio::test]
    async fn test_error_response_on_pipeline_failure() {
        // Embedding fails on the first (query) call while both backends
        // report enabled, so the engine hits the error path.
        let engine = engine_with(
            MockEmbedder::failing_on(0),
            Arc::new(MockIndex::enabled_with(Vec::new())),
            Arc::new(MockCompletion::enabled()),
        );

        let response = engine
            .generate_rag_response("spindle noise", None, None, &[])
            .await;
        assert_eq!(response.model, ERROR_MODEL);
        assert_eq!(response.confidence, 0.1);
        assert!(response.response.contains("spindle noise"));
        assert_eq!(response.usage.total_tokens, 0);
    }

    #[tokio::test]
    async fn test_health_check() {
        let engine = engine_with(
            MockEmbedder::new(),
            Arc::new(MockIndex::disabled()),
            Arc::new(MockCompletion::enabled()),
        );
        let health = engine.health_check();
        assert!(!health.vector_index_enabled);
        assert!(health.embedding_backend);
        assert!(health.completion_enabled);
        assert_eq!(health.status(), "degraded");
    }

    #[test]
    fn test_vector_id_deterministic() {
        let a = vector_id("manual", 3, "some chunk text");
        let b = vector_id("manual", 3, "some chunk text");
        assert_eq!(a, b);
        assert!(a.starts_with("manual_3_"));
        assert_ne!(a, vector_id("manual", 3, "different text"));
    }

    #[test]
    fn test_excerpt_truncation() {
        let short = "brief note";
        assert_eq!(excerpt(short), short);

        let long = "x".repeat(300);
        let e = excerpt(&long);
        assert!(e.ends_with("..."));
        assert_eq!(e.chars().count(), 203);
    }
}
