//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for document ingestion and RAG queries.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::WerkbankError;
use crate::extract::{self, DocumentMetadata};
use crate::rag::{DocumentType, IngestReport, IngestRequest, RagEngine, RagHealth, RagResponse};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state.
struct AppState {
    engine: RagEngine,
    settings: Settings,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let engine = RagEngine::from_settings(&settings);

    let state = Arc::new(AppState { engine, settings });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/rag/documents/upload", post(upload))
        .route("/rag/documents/query", post(query))
        .route("/rag/documents/health", get(health))
        .route("/rag/documents/stats", get(stats))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Werkbank API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Upload", "POST /rag/documents/upload");
    Output::kv("Query", "POST /rag/documents/query");
    Output::kv("Health", "GET  /rag/documents/health");
    Output::kv("Stats", "GET  /rag/documents/stats");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

/// Parsed fields of the multipart upload form.
#[derive(Default)]
struct UploadForm {
    file_bytes: Option<Vec<u8>>,
    filename: Option<String>,
    title: Option<String>,
    document_type: Option<String>,
    machine_type: Option<String>,
}

#[derive(Serialize)]
struct FileInfo {
    filename: String,
    size: usize,
    text_length: usize,
    metadata: DocumentMetadata,
}

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    file_info: FileInfo,
    rag_processing: IngestReport,
    status: String,
}

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    machine_type: Option<String>,
    #[serde(default)]
    context_limit: Option<usize>,
}

#[derive(Serialize)]
struct HealthResponse {
    #[serde(flatten)]
    health: RagHealth,
    overall_status: &'static str,
}

#[derive(Serialize)]
struct StatsResponse {
    service_status: HealthResponse,
    namespace: String,
    chunk_size: usize,
    chunk_overlap: usize,
    message: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_status(e: &WerkbankError) -> StatusCode {
    if e.is_user_error() {
        StatusCode::BAD_REQUEST
    } else if e.is_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// === Handlers ===

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut form = UploadForm::default();

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().unwrap_or_default().to_string();
                match name.as_str() {
                    "file" => {
                        form.filename = field.file_name().map(String::from);
                        match field.bytes().await {
                            Ok(bytes) => form.file_bytes = Some(bytes.to_vec()),
                            Err(e) => {
                                return (
                                    StatusCode::BAD_REQUEST,
                                    Json(ErrorResponse {
                                        error: format!("Failed to read file field: {}", e),
                                    }),
                                )
                                    .into_response();
                            }
                        }
                    }
                    "title" => form.title = field.text().await.ok(),
                    "document_type" => form.document_type = field.text().await.ok(),
                    "machine_type" => form.machine_type = field.text().await.ok(),
                    // use_smart_chunking is accepted for API compatibility;
                    // boundary-aware chunking is always on.
                    _ => {
                        let _ = field.text().await;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!("Invalid multipart body: {}", e),
                    }),
                )
                    .into_response();
            }
        }
    }

    let (Some(bytes), Some(filename)) = (form.file_bytes, form.filename) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Missing file field".to_string(),
            }),
        )
            .into_response();
    };

    let Some(title) = form.title.filter(|t| !t.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Missing title field".to_string(),
            }),
        )
            .into_response();
    };

    let document_type = match form
        .document_type
        .as_deref()
        .unwrap_or("manual")
        .parse::<DocumentType>()
    {
        Ok(dt) => dt,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: e })).into_response();
        }
    };

    info!("Processing upload: {}", filename);
    let size = bytes.len();
    let document = match extract::extract(&bytes, &filename) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Extraction failed for {}: {}", filename, e);
            return (
                error_status(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    let request = IngestRequest {
        title,
        content: document.text.clone(),
        document_type,
        machine_type: form.machine_type.filter(|m| !m.trim().is_empty()),
    };
    let report = state.engine.process_document(&request).await;

    let status = match report.status {
        crate::rag::IngestStatus::Success => "success",
        crate::rag::IngestStatus::Error => "error",
    };

    (
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Document successfully processed and stored in RAG system".to_string(),
            file_info: FileInfo {
                filename,
                size,
                text_length: document.text.len(),
                metadata: document.metadata,
            },
            rag_processing: report,
            status: status.to_string(),
        }),
    )
        .into_response()
}

async fn query(
    State(state): State<Arc<AppState>>,
    Form(req): Form<QueryRequest>,
) -> Json<RagResponse> {
    // Degradation happens inside the engine; a query always gets an answer.
    let response = state
        .engine
        .generate_rag_response(
            &req.query,
            req.machine_type.as_deref(),
            req.context_limit,
            &[],
        )
        .await;
    Json(response)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.engine.health_check();
    let overall_status = health.status();
    Json(HealthResponse {
        health,
        overall_status,
    })
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let health = state.engine.health_check();
    let overall_status = health.status();
    Json(StatsResponse {
        service_status: HealthResponse {
            health,
            overall_status,
        },
        namespace: state.settings.vector_index.namespace.clone(),
        chunk_size: state.settings.chunking.chunk_size,
        chunk_overlap: state.settings.chunking.chunk_overlap,
        message: "Detailed index metrics require a Pinecone stats query",
    })
}
