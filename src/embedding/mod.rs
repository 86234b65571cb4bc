//! Embedding generation for semantic search and retrieval.
//!
//! Remote backends are tried in a fixed order with uniform error translation;
//! the single-text path degrades to a deterministic local embedding while the
//! batch path fails hard when every backend is exhausted.

mod hashed;
mod remote;

pub use hashed::{hashed_embedding, HashedEmbedder};
pub use remote::RemoteEmbedder;

use crate::config::EmbeddingSettings;
use crate::error::{Result, WerkbankError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Whether a remote backend is configured (false means only the
    /// deterministic fallback is available).
    fn has_remote_backend(&self) -> bool {
        false
    }
}

/// Outcome of one backend attempt in the fallback chain.
pub enum EmbedOutcome {
    Success(Vec<Vec<f32>>),
    /// Backend not configured or unreachable; try the next one.
    Unavailable,
    /// Backend responded but the result is unusable.
    Failure(WerkbankError),
}

/// Embedding service with an ordered backend fallback chain.
pub struct EmbeddingService {
    providers: Vec<RemoteEmbedder>,
    fallback: HashedEmbedder,
}

impl EmbeddingService {
    /// Create a service from an explicit provider chain.
    pub fn new(providers: Vec<RemoteEmbedder>, fallback: HashedEmbedder) -> Self {
        Self {
            providers,
            fallback,
        }
    }

    /// Build the standard Groq-then-OpenAI chain from settings, reading
    /// credentials from the configured environment variables.
    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        let timeout = Duration::from_secs(settings.timeout_seconds);
        let providers = vec![
            RemoteEmbedder::new(
                "groq",
                std::env::var(&settings.primary.api_key_env).ok(),
                &settings.primary.api_base,
                &settings.primary.model,
                settings.primary.dimensions,
                timeout,
            ),
            RemoteEmbedder::new(
                "openai",
                std::env::var(&settings.secondary.api_key_env).ok(),
                &settings.secondary.api_base,
                &settings.secondary.model,
                settings.secondary.dimensions,
                timeout,
            ),
        ];

        Self::new(providers, HashedEmbedder::new(settings.fallback_dimensions))
    }

    async fn try_providers(&self, texts: &[String]) -> Option<Vec<Vec<f32>>> {
        for provider in &self.providers {
            match provider.try_embed(texts).await {
                EmbedOutcome::Success(embeddings) => return Some(embeddings),
                EmbedOutcome::Unavailable => {
                    debug!("Embedding backend {} unavailable", provider.provider());
                }
                EmbedOutcome::Failure(e) => {
                    warn!("Embedding backend {} failed: {}", provider.provider(), e);
                }
            }
        }
        None
    }
}

#[async_trait]
impl Embedder for EmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        if let Some(embeddings) = self.try_providers(&texts).await {
            return embeddings
                .into_iter()
                .next()
                .ok_or_else(|| WerkbankError::Embedding("empty embedding response".into()));
        }

        debug!("No remote embedding backend reachable, using deterministic fallback");
        Ok(self.fallback.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match self.try_providers(texts).await {
            Some(embeddings) => Ok(embeddings),
            None => Err(WerkbankError::NoEmbeddingBackend),
        }
    }

    fn dimensions(&self) -> usize {
        self.providers
            .iter()
            .find(|p| p.is_configured())
            .map(|p| p.dimensions())
            .unwrap_or_else(|| self.fallback.dimensions())
    }

    fn has_remote_backend(&self) -> bool {
        self.providers.iter().any(|p| p.is_configured())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured_service() -> EmbeddingService {
        let timeout = Duration::from_secs(1);
        EmbeddingService::new(
            vec![
                RemoteEmbedder::new("groq", None, "http://localhost", "m", 1024, timeout),
                RemoteEmbedder::new("openai", None, "http://localhost", "m", 1536, timeout),
            ],
            HashedEmbedder::new(1024),
        )
    }

    #[tokio::test]
    async fn test_single_text_falls_back_to_hashed() {
        let service = unconfigured_service();
        let vector = service.embed("spindle vibration").await.unwrap();
        assert_eq!(vector, hashed_embedding("spindle vibration", 1024));
    }

    #[tokio::test]
    async fn test_batch_path_fails_without_backend() {
        let service = unconfigured_service();
        let err = service
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, WerkbankError::NoEmbeddingBackend));
    }

    #[tokio::test]
    async fn test_empty_batch_is_ok() {
        let service = unconfigured_service();
        assert!(service.embed_batch(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_dimensions_without_backends_use_fallback() {
        let service = unconfigured_service();
        assert_eq!(service.dimensions(), 1024);
        assert!(!service.has_remote_backend());
    }
}
