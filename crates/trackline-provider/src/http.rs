use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use trackline_schema::{Event, EventId};

use crate::geojson::{decode_feature_collection, FeatureCollection};
use crate::{BatchLoader, SearchProvider};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VisualizeRequest<'a> {
    batch_id: &'a str,
    filter: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    batch_id: &'a str,
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    matching_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    detail: String,
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

async fn read_error(resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorEnvelope>(&text)
        .map(|e| e.detail)
        .unwrap_or(text);
    if status == StatusCode::NOT_FOUND {
        anyhow!("batch not found on server: {detail}")
    } else {
        anyhow!("server returned {status}: {detail}")
    }
}

/// Loads a batch from `POST /api/visualize`.
#[derive(Clone)]
pub struct HttpBatchLoader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBatchLoader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl BatchLoader for HttpBatchLoader {
    async fn load(&self, batch_id: &str, status_filter: &str) -> Result<Vec<Event>> {
        let resp = self
            .client
            .post(endpoint(&self.base_url, "/api/visualize"))
            .json(&VisualizeRequest {
                batch_id,
                filter: status_filter,
            })
            .send()
            .await
            .with_context(|| format!("requesting batch {batch_id}"))?;
        if !resp.status().is_success() {
            return Err(read_error(resp).await);
        }

        let collection: FeatureCollection = resp
            .json()
            .await
            .with_context(|| format!("decoding feature collection for batch {batch_id}"))?;
        let decoded = decode_feature_collection(collection);
        tracing::info!(
            batch_id,
            events = decoded.events.len(),
            skipped = decoded.skipped,
            "batch loaded over http"
        );
        Ok(decoded.events)
    }
}

/// Semantic search via `POST /api/ai-search`. The batch must have been
/// visualized first or the server answers 404.
#[derive(Clone)]
pub struct HttpSearchProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(&self, batch_id: &str, query: &str) -> Result<HashSet<EventId>> {
        let resp = self
            .client
            .post(endpoint(&self.base_url, "/api/ai-search"))
            .json(&SearchRequest { batch_id, query })
            .send()
            .await
            .context("sending search request")?;
        if !resp.status().is_success() {
            return Err(read_error(resp).await);
        }

        let parsed: SearchResponse = resp.json().await.context("decoding search response")?;
        tracing::debug!(batch_id, query, matches = parsed.matching_ids.len(), "search answered");
        Ok(parsed.matching_ids.into_iter().map(EventId::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_use_camel_case_batch_id() {
        let body = serde_json::to_value(VisualizeRequest {
            batch_id: "b1",
            filter: "all",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"batchId": "b1", "filter": "all"}));

        let body = serde_json::to_value(SearchRequest {
            batch_id: "b1",
            query: "debris",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"batchId": "b1", "query": "debris"}));
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(
            endpoint("http://localhost:8000/", "/api/visualize"),
            "http://localhost:8000/api/visualize"
        );
    }
}
