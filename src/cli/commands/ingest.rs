//! Ingest command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::extract;
use crate::rag::{DocumentType, IngestRequest, IngestStatus, RagEngine};
use anyhow::Result;
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(
    file: &Path,
    title: Option<String>,
    doc_type: &str,
    machine_type: Option<String>,
    settings: Settings,
) -> Result<()> {
    let document_type: DocumentType = doc_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid file path: {}", file.display()))?;

    let title = title.unwrap_or_else(|| {
        file.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename)
            .to_string()
    });

    let bytes = std::fs::read(file)?;

    let spinner = Output::spinner("Extracting text...");
    let document = extract::extract(&bytes, filename)?;
    spinner.finish_and_clear();

    Output::info(&format!(
        "Extracted {} words ({} chars, ~{} pages)",
        document.metadata.word_count,
        document.metadata.character_count,
        document.metadata.estimated_pages
    ));

    let engine = RagEngine::from_settings(&settings);
    let request = IngestRequest {
        title,
        content: document.text,
        document_type,
        machine_type,
    };

    let spinner = Output::spinner("Chunking, embedding, and indexing...");
    let report = engine.process_document(&request).await;
    spinner.finish_and_clear();

    match report.status {
        IngestStatus::Success => {
            Output::success(&format!("Ingested '{}'", report.title));
            Output::kv("Chunks", &report.chunks_created.to_string());
            Output::kv("Vectors stored", &report.vectors_stored.to_string());
            if let Some(message) = &report.message {
                Output::warning(message);
            }
            for failure in &report.failures {
                Output::warning(&format!(
                    "Chunk {} failed: {}",
                    failure.index, failure.cause
                ));
            }
        }
        IngestStatus::Error => {
            Output::error(
                report
                    .message
                    .as_deref()
                    .unwrap_or("Ingestion failed"),
            );
            anyhow::bail!("Ingestion failed for '{}'", report.title);
        }
    }

    Ok(())
}
