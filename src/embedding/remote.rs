//! Remote embedding backends over OpenAI-compatible APIs.

use super::EmbedOutcome;
use crate::error::WerkbankError;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Embedding client for one OpenAI-compatible provider (Groq, OpenAI).
///
/// A missing credential leaves the client unconfigured; calls then report
/// [`EmbedOutcome::Unavailable`] so the fallback chain can move on.
pub struct RemoteEmbedder {
    provider: String,
    client: Option<Client<OpenAIConfig>>,
    model: String,
    dimensions: usize,
}

impl RemoteEmbedder {
    /// Create a remote embedder. `api_key = None` disables the backend.
    pub fn new(
        provider: &str,
        api_key: Option<String>,
        api_base: &str,
        model: &str,
        dimensions: usize,
        timeout: Duration,
    ) -> Self {
        let client = api_key.map(|key| {
            let http_client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client");
            Client::with_config(OpenAIConfig::new().with_api_key(key).with_api_base(api_base))
                .with_http_client(http_client)
        });

        Self {
            provider: provider.to_string(),
            client,
            model: model.to_string(),
            dimensions,
        }
    }

    /// Provider name for logging and health reporting.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Whether a credential was supplied for this backend.
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Embedding dimensionality of this backend's model.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Attempt to embed a batch of texts.
    ///
    /// Transport and API errors are reported as `Unavailable` rather than
    /// surfaced, so the caller can chain to the next backend. A malformed
    /// success response is a `Failure`.
    pub async fn try_embed(&self, texts: &[String]) -> EmbedOutcome {
        let Some(client) = &self.client else {
            return EmbedOutcome::Unavailable;
        };

        let request = match CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(texts.to_vec()))
            .build()
        {
            Ok(req) => req,
            Err(e) => {
                return EmbedOutcome::Failure(WerkbankError::Embedding(format!(
                    "failed to build embedding request: {}",
                    e
                )))
            }
        };

        match client.embeddings().create(request).await {
            Ok(response) => {
                // Sort by index to ensure correct order.
                let mut data: Vec<_> = response.data.into_iter().collect();
                data.sort_by_key(|e| e.index);

                if data.len() != texts.len() {
                    return EmbedOutcome::Failure(WerkbankError::Embedding(format!(
                        "{} returned {} embeddings for {} inputs",
                        self.provider,
                        data.len(),
                        texts.len()
                    )));
                }

                debug!(
                    "Generated {} embeddings using {}",
                    data.len(),
                    self.provider
                );
                EmbedOutcome::Success(data.into_iter().map(|e| e.embedding).collect())
            }
            Err(e) => {
                warn!("{} embedding failed: {}", self.provider, e);
                EmbedOutcome::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_backend_is_unavailable() {
        let embedder = RemoteEmbedder::new(
            "groq",
            None,
            "https://api.groq.com/openai/v1",
            "llama-text-embed-v2",
            1024,
            Duration::from_secs(30),
        );
        assert!(!embedder.is_configured());
        let outcome = embedder.try_embed(&["test".to_string()]).await;
        assert!(matches!(outcome, EmbedOutcome::Unavailable));
    }
}
