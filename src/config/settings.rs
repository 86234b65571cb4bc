//! Configuration settings for Werkbank.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub vector_index: VectorIndexSettings,
    pub completion: CompletionSettings,
    pub rag: RagSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.werkbank".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Document chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: crate::chunking::DEFAULT_CHUNK_SIZE,
            chunk_overlap: crate::chunking::DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// One remote embedding provider in the fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingProviderSettings {
    /// Base URL of the OpenAI-compatible embeddings endpoint.
    pub api_base: String,
    /// Embedding model name.
    pub model: String,
    /// Vector dimensionality produced by the model.
    pub dimensions: usize,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for EmbeddingProviderSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-text-embed-v2".to_string(),
            dimensions: 1024,
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

/// Embedding generation settings.
///
/// Providers are tried in order (primary, then secondary) with a local
/// hash-based embedder as the final fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub primary: EmbeddingProviderSettings,
    pub secondary: EmbeddingProviderSettings,
    /// Dimensionality of the local hash-based fallback embedder.
    pub fallback_dimensions: usize,
    /// Request timeout for remote providers.
    pub timeout_seconds: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            primary: EmbeddingProviderSettings::default(),
            secondary: EmbeddingProviderSettings {
                api_base: "https://api.openai.com/v1".to_string(),
                model: "text-embedding-ada-002".to_string(),
                dimensions: 1536,
                api_key_env: "OPENAI_API_KEY".to_string(),
            },
            fallback_dimensions: 1024,
            timeout_seconds: 30,
        }
    }
}

/// Remote vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexSettings {
    /// Index host URL. When unset, read from `index_host_env`.
    pub index_host: Option<String>,
    /// Environment variable holding the index host URL.
    pub index_host_env: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Default namespace for upserts and queries.
    pub namespace: String,
    /// Maximum records per upsert request.
    pub max_batch_size: usize,
    /// Request timeout.
    pub timeout_seconds: u64,
}

impl Default for VectorIndexSettings {
    fn default() -> Self {
        Self {
            index_host: None,
            index_host_env: "PINECONE_INDEX_HOST".to_string(),
            api_key_env: "PINECONE_API_KEY".to_string(),
            namespace: "default".to_string(),
            max_batch_size: 100,
            timeout_seconds: 30,
        }
    }
}

/// LLM completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Base URL of the OpenAI-compatible chat endpoint.
    pub api_base: String,
    /// Chat model name.
    pub model: String,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout.
    pub timeout_seconds: u64,
    /// Confidence scoring strategy (usage, heuristic).
    pub confidence: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            timeout_seconds: 60,
            confidence: "usage".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

/// RAG orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Maximum retrieved chunks assembled into the prompt context.
    pub context_limit: usize,
    /// Maximum prior conversation turns forwarded to the model.
    pub history_limit: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            context_limit: 3,
            history_limit: 10,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::WerkbankError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("werkbank")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }
}
