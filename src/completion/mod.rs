//! LLM completion client abstraction.

mod groq;

pub use groq::GroqCompletionClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Fixed system prompt for the support assistant role.
pub const SYSTEM_PROMPT: &str = "You are an expert AI assistant for machine tool technical \
support. You help customers with troubleshooting, maintenance, and operation of manufacturing \
equipment.";

/// Message role in a chat transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn in a chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token usage reported by the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A completion with usage and confidence metadata.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
    pub confidence: f32,
}

/// Confidence scoring strategy.
///
/// Two formulas ship side by side: the token-usage ratio is used for the
/// primary backend path and the text heuristic for responses whose usage
/// accounting is synthetic. They are alternatives, not one merged rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceStrategy {
    Usage,
    Heuristic,
}

impl ConfidenceStrategy {
    /// Score a response under this strategy.
    pub fn score(&self, text: &str, usage: &TokenUsage) -> f32 {
        match self {
            ConfidenceStrategy::Usage => usage_confidence(usage),
            ConfidenceStrategy::Heuristic => text_confidence(text),
        }
    }
}

impl std::str::FromStr for ConfidenceStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usage" => Ok(ConfidenceStrategy::Usage),
            "heuristic" => Ok(ConfidenceStrategy::Heuristic),
            _ => Err(format!("Unknown confidence strategy: {}", s)),
        }
    }
}

/// Confidence from token usage: more substantial completions score higher,
/// clamped to [0.3, 0.9] and rounded to two decimals. Absent usage scores 0.5.
pub fn usage_confidence(usage: &TokenUsage) -> f32 {
    if usage.total_tokens == 0 {
        return 0.5;
    }
    let confidence = (0.3 + usage.completion_tokens as f32 / 50.0 * 0.1).min(0.9);
    (confidence * 100.0).round() / 100.0
}

/// Confidence from response text: near-empty responses score 0.1, hedging
/// phrases force 0.3, long answers 0.8, everything else 0.6.
pub fn text_confidence(text: &str) -> f32 {
    if text.trim().len() < 10 {
        return 0.1;
    }
    if text.contains("I don't know") || text.contains("I'm not sure") {
        return 0.3;
    }
    if text.len() > 100 {
        return 0.8;
    }
    0.6
}

/// Trait for LLM completion backends.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Whether the backend is configured.
    fn is_enabled(&self) -> bool;

    /// Send a chat transcript, optionally with retrieved context appended to
    /// the system prompt, and return the completion.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        context: Option<&str>,
    ) -> Result<CompletionResult>;
}
