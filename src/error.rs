//! Error types for Werkbank.

use thiserror::Error;

/// Library-level error type for Werkbank operations.
#[derive(Error, Debug)]
pub enum WerkbankError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported file format: {0}. Supported formats: .pdf, .txt, .md")]
    UnsupportedFormat(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Chunking failed: {0}")]
    Chunking(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("No embedding backend available. Check API keys for Groq or OpenAI.")]
    NoEmbeddingBackend,

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Completion failed: {0}")]
    Completion(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl WerkbankError {
    /// Whether this error maps to a client-side (4xx) failure.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            WerkbankError::UnsupportedFormat(_)
                | WerkbankError::Extraction(_)
                | WerkbankError::InvalidInput(_)
        )
    }

    /// Whether this error indicates a missing or unreachable backend (503).
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            WerkbankError::ServiceUnavailable(_) | WerkbankError::NoEmbeddingBackend
        )
    }
}

/// Result type alias for Werkbank operations.
pub type Result<T> = std::result::Result<T, WerkbankError>;
