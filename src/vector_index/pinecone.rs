//! Pinecone serverless REST client.

use super::{MetadataFilter, RecordMetadata, VectorIndex, VectorMatch, VectorRecord};
use crate::config::VectorIndexSettings;
use crate::error::{Result, WerkbankError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Remote vector index backed by a Pinecone serverless index.
pub struct PineconeIndex {
    client: reqwest::Client,
    api_key: Option<String>,
    index_host: Option<String>,
    max_batch_size: usize,
}

impl PineconeIndex {
    /// Create a client. The index is disabled unless both the API key and the
    /// index host are present.
    pub fn new(
        api_key: Option<String>,
        index_host: Option<String>,
        max_batch_size: usize,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            index_host: index_host.filter(|h| !h.is_empty()),
            max_batch_size: max_batch_size.max(1),
        }
    }

    /// Build a client from settings, reading the credential from the
    /// configured environment variable.
    pub fn from_settings(settings: &VectorIndexSettings) -> Self {
        let api_key = std::env::var(&settings.api_key_env).ok();
        let index_host = settings
            .index_host
            .clone()
            .or_else(|| std::env::var(&settings.index_host_env).ok());

        Self::new(
            api_key,
            index_host,
            settings.max_batch_size,
            Duration::from_secs(settings.timeout_seconds),
        )
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.api_key.as_deref(), self.index_host.as_deref()) {
            (Some(key), Some(host)) => Ok((key, host)),
            _ => Err(WerkbankError::ServiceUnavailable(
                "vector index is not configured".into(),
            )),
        }
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let (key, host) = self.credentials()?;
        let url = format!("{}/{}", host.trim_end_matches('/'), path);

        let response = self
            .client
            .post(&url)
            .header("Api-Key", key)
            .json(body)
            .send()
            .await
            .map_err(|e| WerkbankError::VectorIndex(format!("request to {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(WerkbankError::VectorIndex(format!(
                "{} returned {}: {}",
                path, status, detail
            )));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| WerkbankError::VectorIndex(format!("invalid response from {}: {}", path, e)))
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    #[allow(dead_code)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a MetadataFilter>,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<RecordMetadata>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
    namespace: &'a str,
}

#[derive(Deserialize, Default)]
struct DeleteResponse {}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn is_enabled(&self) -> bool {
        self.api_key.is_some() && self.index_host.is_some()
    }

    async fn upsert(&self, records: &[VectorRecord], namespace: &str) -> Result<usize> {
        self.credentials()?;

        // The backend caps payload size, so large writes are batched.
        for batch in records.chunks(self.max_batch_size) {
            let request = UpsertRequest {
                vectors: batch,
                namespace,
            };
            let _: UpsertResponse = self.post("vectors/upsert", &request).await?;
            debug!("Upserted {} vectors to namespace {}", batch.len(), namespace);
        }

        info!(
            "Successfully upserted {} vectors to namespace {}",
            records.len(),
            namespace
        );
        Ok(records.len())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            namespace,
            filter,
            include_metadata: true,
        };
        let response: QueryResponse = self.post("query", &request).await?;

        debug!("Query returned {} matches", response.matches.len());
        Ok(response
            .matches
            .into_iter()
            .map(|m| VectorMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata,
            })
            .collect())
    }

    async fn delete(&self, ids: &[String], namespace: &str) -> Result<()> {
        let request = DeleteRequest { ids, namespace };
        let _: DeleteResponse = self.post("vectors/delete", &request).await?;
        info!(
            "Deleted {} vectors from namespace {}",
            ids.len(),
            namespace
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_index() -> PineconeIndex {
        PineconeIndex::new(None, None, 100, Duration::from_secs(1))
    }

    fn record() -> VectorRecord {
        VectorRecord {
            id: "doc_0_123".to_string(),
            values: vec![0.1, 0.2],
            metadata: RecordMetadata {
                title: "doc".to_string(),
                document_type: "manual".to_string(),
                machine_type: "general".to_string(),
                chunk_index: 0,
                chunk_type: "general".to_string(),
                chunk_text: "text".to_string(),
            },
        }
    }

    #[test]
    fn test_disabled_without_credentials() {
        assert!(!disabled_index().is_enabled());
        assert!(!PineconeIndex::new(
            Some("key".to_string()),
            None,
            100,
            Duration::from_secs(1)
        )
        .is_enabled());
        assert!(PineconeIndex::new(
            Some("key".to_string()),
            Some("https://idx.pinecone.io".to_string()),
            100,
            Duration::from_secs(1)
        )
        .is_enabled());
    }

    #[test]
    fn test_empty_credentials_treated_as_missing() {
        let index = PineconeIndex::new(
            Some(String::new()),
            Some(String::new()),
            100,
            Duration::from_secs(1),
        );
        assert!(!index.is_enabled());
    }

    // Disabled-index calls must fail fast with ServiceUnavailable and never
    // reach the network.
    #[tokio::test]
    async fn test_upsert_fails_fast_when_disabled() {
        let err = disabled_index()
            .upsert(&[record()], "default")
            .await
            .unwrap_err();
        assert!(matches!(err, WerkbankError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_query_fails_fast_when_disabled() {
        let err = disabled_index()
            .query(&[0.1, 0.2], 3, "default", None)
            .await
            .unwrap_err();
        assert!(matches!(err, WerkbankError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_delete_fails_fast_when_disabled() {
        let err = disabled_index()
            .delete(&["doc_0_123".to_string()], "default")
            .await
            .unwrap_err();
        assert!(matches!(err, WerkbankError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_query_request_wire_format() {
        let mut filter = MetadataFilter::new();
        filter.insert("machine_type".to_string(), "cnc".to_string());
        let request = QueryRequest {
            vector: &[0.5],
            top_k: 3,
            namespace: "default",
            filter: Some(&filter),
            include_metadata: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["topK"], 3);
        assert_eq!(json["includeMetadata"], true);
        assert_eq!(json["filter"]["machine_type"], "cnc");
    }
}
