//! Groq chat completion backend.
//!
//! Speaks the OpenAI-compatible chat API against Groq's endpoint. When no
//! API key is configured the client stays disabled and callers get a
//! `ServiceUnavailable` error so the pipeline can degrade instead of failing.

use super::{
    ChatMessage, CompletionClient, CompletionResult, ConfidenceStrategy, Role, TokenUsage,
    SYSTEM_PROMPT,
};
use crate::config::CompletionSettings;
use crate::error::{Result, WerkbankError};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Completion client for Groq's OpenAI-compatible chat endpoint.
pub struct GroqCompletionClient {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    strategy: ConfidenceStrategy,
}

impl GroqCompletionClient {
    pub fn new(
        api_key: Option<String>,
        api_base: &str,
        model: &str,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
        strategy: ConfidenceStrategy,
    ) -> Self {
        let client = api_key.filter(|k| !k.is_empty()).map(|key| {
            let http_client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client");
            let config = OpenAIConfig::new()
                .with_api_base(api_base)
                .with_api_key(key);
            Client::with_config(config).with_http_client(http_client)
        });

        Self {
            client,
            model: model.to_string(),
            max_tokens,
            temperature,
            strategy,
        }
    }

    /// Build a client from settings, reading the API key from the configured
    /// environment variable.
    pub fn from_settings(settings: &CompletionSettings) -> Self {
        let api_key = std::env::var(&settings.api_key_env).ok();
        let strategy = settings
            .confidence
            .parse()
            .unwrap_or(ConfidenceStrategy::Usage);
        Self::new(
            api_key,
            &settings.api_base,
            &settings.model,
            settings.max_tokens,
            settings.temperature,
            Duration::from_secs(settings.timeout_seconds),
            strategy,
        )
    }

    /// Model name this client sends requests for.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl CompletionClient for GroqCompletionClient {
    fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    #[instrument(skip(self, messages, context), fields(model = %self.model))]
    async fn complete(
        &self,
        messages: &[ChatMessage],
        context: Option<&str>,
    ) -> Result<CompletionResult> {
        let client = self.client.as_ref().ok_or_else(|| {
            WerkbankError::ServiceUnavailable("Completion API key is not configured".into())
        })?;

        let system_content = match context {
            Some(ctx) => format!("{}\n\nContext Information:\n{}", SYSTEM_PROMPT, ctx),
            None => SYSTEM_PROMPT.to_string(),
        };

        let mut request_messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_content)
                .build()
                .map_err(|e| WerkbankError::Completion(e.to_string()))?
                .into(),
        ];

        for message in messages {
            let built: ChatCompletionRequestMessage = match message.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(|e| WerkbankError::Completion(e.to_string()))?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(|e| WerkbankError::Completion(e.to_string()))?
                    .into(),
                // System content is owned by this client, skip caller copies.
                Role::System => continue,
            };
            request_messages.push(built);
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .build()
            .map_err(|e| WerkbankError::Completion(e.to_string()))?;

        let response = client.chat().create(request).await.map_err(|e| {
            warn!("Completion request failed: {}", e);
            WerkbankError::ServiceUnavailable(format!("Completion request failed: {}", e))
        })?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| WerkbankError::Completion("Empty response from model".into()))?;

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let confidence = self.strategy.score(&text, &usage);
        debug!(
            tokens = usage.total_tokens,
            confidence, "Completion received"
        );

        Ok(CompletionResult {
            text,
            model: response.model,
            usage,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured() -> GroqCompletionClient {
        GroqCompletionClient::new(
            None,
            "https://api.groq.com/openai/v1",
            "llama-3.1-8b-instant",
            1000,
            0.7,
            Duration::from_secs(10),
            ConfidenceStrategy::Usage,
        )
    }

    #[test]
    fn test_disabled_without_api_key() {
        assert!(!unconfigured().is_enabled());

        let empty_key = GroqCompletionClient::new(
            Some(String::new()),
            "https://api.groq.com/openai/v1",
            "llama-3.1-8b-instant",
            1000,
            0.7,
            Duration::from_secs(10),
            ConfidenceStrategy::Usage,
        );
        assert!(!empty_key.is_enabled());
    }

    #[tokio::test]
    async fn test_complete_unavailable_without_api_key() {
        let client = unconfigured();
        let messages = vec![ChatMessage::user("How do I align the spindle?")];
        let err = client.complete(&messages, None).await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
