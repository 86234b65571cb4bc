//! Health command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagEngine;
use anyhow::Result;

fn check_mark(enabled: bool) -> &'static str {
    if enabled {
        "configured"
    } else {
        "not configured"
    }
}

/// Run the health command.
pub fn run_health(settings: Settings) -> Result<()> {
    let engine = RagEngine::from_settings(&settings);
    let health = engine.health_check();

    Output::header("Backend Status");
    Output::kv("Vector index", check_mark(health.vector_index_enabled));
    Output::kv("Remote embeddings", check_mark(health.embedding_backend));
    Output::kv("Completion model", check_mark(health.completion_enabled));
    println!();

    match health.status() {
        "healthy" => Output::success("All backends configured."),
        _ => {
            Output::warning("Running in degraded mode.");
            Output::info(&format!(
                "Set {} and {} (or {}) to enable full functionality.",
                settings.vector_index.api_key_env,
                settings.completion.api_key_env,
                settings.embedding.secondary.api_key_env
            ));
        }
    }

    Ok(())
}
