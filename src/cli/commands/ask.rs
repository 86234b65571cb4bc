//! Ask command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagEngine;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    query: &str,
    machine_type: Option<String>,
    context_limit: usize,
    settings: Settings,
) -> Result<()> {
    let engine = RagEngine::from_settings(&settings);

    let spinner = Output::spinner("Searching knowledge base...");
    let response = engine
        .generate_rag_response(query, machine_type.as_deref(), Some(context_limit), &[])
        .await;
    spinner.finish_and_clear();

    println!("\n{}\n", response.response);

    if !response.sources.is_empty() {
        Output::header("Sources");
        for source in &response.sources {
            Output::source(&source.title, source.score, &source.excerpt);
        }
        println!();
    }

    Output::kv("Model", &response.model);
    Output::kv("Confidence", &format!("{:.2}", response.confidence));
    Output::kv("Tokens", &response.usage.total_tokens.to_string());

    Ok(())
}
