//! Configuration module for Werkbank.
//!
//! Handles loading and saving application settings from a TOML file.

mod settings;

pub use settings::{
    ChunkingSettings, CompletionSettings, EmbeddingProviderSettings, EmbeddingSettings,
    GeneralSettings, RagSettings, Settings, VectorIndexSettings,
};
