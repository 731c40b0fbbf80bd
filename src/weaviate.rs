//! Remote vector store access.
//!
//! [`VectorStore`] is the seam between the import pipeline and the service;
//! [`WeaviateClient`] implements it over the Weaviate REST API.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | list classes | `GET /v1/schema` |
//! | delete class | `DELETE /v1/schema/{class}` |
//! | create class | `POST /v1/schema` |
//! | add objects | `POST /v1/batch/objects` |
//! | count objects | `POST /v1/graphql` (`Aggregate { <class> { meta { count } } }`) |
//!
//! # Retry Strategy
//!
//! Only requests that time out or fail to connect are retried, up to
//! `batch.timeout_retries` times with backoff of 1s, 2s, 4s, ... (capped at
//! 2^5). Any HTTP error status fails immediately with the response body.
//!
//! Batch objects carry a deterministic id derived from the class, title and
//! year, so a retried batch overwrites what a timed-out attempt already
//! stored instead of duplicating it.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::config::{BatchConfig, WeaviateConfig};
use crate::models::MovieObject;
use crate::schema::ClassSchema;

/// Operations the loader issues against the remote collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of all classes currently defined.
    async fn list_classes(&self) -> Result<Vec<String>>;

    /// Drop a class and every object in it.
    async fn delete_class(&self, class: &str) -> Result<()>;

    async fn create_class(&self, schema: &ClassSchema) -> Result<()>;

    /// Insert objects in one request.
    ///
    /// Returns one entry per input object, in order: `Some(message)` when
    /// the service rejected that object. A transport or HTTP failure is an
    /// `Err` for the whole request.
    async fn add_objects(&self, class: &str, objects: &[MovieObject])
        -> Result<Vec<Option<String>>>;

    async fn count_objects(&self, class: &str) -> Result<u64>;
}

/// HTTP client for a Weaviate instance.
pub struct WeaviateClient {
    base_url: String,
    http: reqwest::Client,
    retries: u32,
}

impl WeaviateClient {
    /// Build a client from the endpoint settings.
    ///
    /// # Errors
    ///
    /// Fails when no URL is configured (`WEAVIATE_URL`) or a credential is
    /// not a valid header value.
    pub fn new(config: &WeaviateConfig, batch: &BatchConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            bail!("WEAVIATE_URL environment variable not set");
        }

        let mut headers = HeaderMap::new();
        if !config.api_key.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .context("WEAVIATE_API_KEY is not a valid header value")?;
            headers.insert(AUTHORIZATION, value);
        }
        if !config.openai_api_key.is_empty() {
            let value = HeaderValue::from_str(&config.openai_api_key)
                .context("OPENAI_API_KEY is not a valid header value")?;
            headers.insert("X-OpenAI-Api-Key", value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(batch.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: normalize_url(&config.url),
            http,
            retries: batch.timeout_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, retrying timeouts and connection failures.
    async fn send<F>(&self, what: &str, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_err = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(what, attempt, ?delay, "retrying request");
                tokio::time::sleep(delay).await;
            }

            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Weaviate {} failed with {}: {}", what, status, body_text);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_err = Some(anyhow::Error::new(e));
                    continue;
                }
                Err(e) => return Err(e).with_context(|| format!("Weaviate {} failed", what)),
            }
        }

        Err(last_err
            .unwrap_or_else(|| anyhow::anyhow!("request failed"))
            .context(format!(
                "Weaviate {} failed after {} retries",
                what, self.retries
            )))
    }
}

#[async_trait]
impl VectorStore for WeaviateClient {
    async fn list_classes(&self) -> Result<Vec<String>> {
        let url = self.url("/v1/schema");
        let resp = self.send("list schema", || self.http.get(&url)).await?;
        let dump: SchemaDump = resp.json().await.context("Invalid schema response")?;
        Ok(dump
            .classes
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.class)
            .collect())
    }

    async fn delete_class(&self, class: &str) -> Result<()> {
        let url = self.url(&format!("/v1/schema/{}", class));
        self.send("delete class", || self.http.delete(&url)).await?;
        Ok(())
    }

    async fn create_class(&self, schema: &ClassSchema) -> Result<()> {
        let url = self.url("/v1/schema");
        self.send("create class", || self.http.post(&url).json(schema))
            .await?;
        Ok(())
    }

    async fn add_objects(
        &self,
        class: &str,
        objects: &[MovieObject],
    ) -> Result<Vec<Option<String>>> {
        let url = self.url("/v1/batch/objects");
        let body = batch_body(class, objects);
        tracing::debug!(class, objects = objects.len(), "sending batch");
        let resp = self
            .send("batch insert", || self.http.post(&url).json(&body))
            .await?;
        let items: Vec<BatchItem> = resp.json().await.context("Invalid batch response")?;
        parse_batch_results(items, objects.len())
    }

    async fn count_objects(&self, class: &str) -> Result<u64> {
        let url = self.url("/v1/graphql");
        let body = json!({ "query": aggregate_query(class) });
        let resp = self
            .send("aggregate", || self.http.post(&url).json(&body))
            .await?;
        let json: Value = resp.json().await.context("Invalid aggregate response")?;
        parse_count(&json, class)
    }
}

#[derive(Deserialize)]
struct SchemaDump {
    #[serde(default)]
    classes: Option<Vec<ClassName>>,
}

#[derive(Deserialize)]
struct ClassName {
    class: String,
}

#[derive(Deserialize)]
struct BatchItem {
    #[serde(default)]
    result: Option<BatchItemResult>,
}

#[derive(Deserialize)]
struct BatchItemResult {
    #[serde(default)]
    errors: Option<ErrorList>,
}

#[derive(Deserialize)]
struct ErrorList {
    #[serde(default)]
    error: Vec<ErrorMessage>,
}

#[derive(Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Accept `host`, `host:port` or a full URL; `https` is assumed when the
/// scheme is omitted.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Stable object id: UUID v5 of `class/title/year` in the URL namespace.
pub fn object_id(class: &str, object: &MovieObject) -> Uuid {
    let name = format!("{}/{}/{}", class, object.title, object.year);
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
}

fn batch_body(class: &str, objects: &[MovieObject]) -> Value {
    let objects: Vec<Value> = objects
        .iter()
        .map(|o| {
            json!({
                "class": class,
                "id": object_id(class, o).to_string(),
                "properties": o
            })
        })
        .collect();
    json!({ "objects": objects })
}

fn parse_batch_results(items: Vec<BatchItem>, expected: usize) -> Result<Vec<Option<String>>> {
    if items.len() != expected {
        bail!(
            "Batch response has {} results for {} objects",
            items.len(),
            expected
        );
    }
    Ok(items
        .into_iter()
        .map(|item| {
            let messages: Vec<String> = item
                .result
                .and_then(|r| r.errors)
                .map(|e| e.error.into_iter().map(|m| m.message).collect())
                .unwrap_or_default();
            (!messages.is_empty()).then(|| messages.join("; "))
        })
        .collect())
}

fn aggregate_query(class: &str) -> String {
    format!("{{ Aggregate {{ {} {{ meta {{ count }} }} }} }}", class)
}

fn parse_count(json: &Value, class: &str) -> Result<u64> {
    if let Some(errors) = json.get("errors").and_then(|e| e.as_array()) {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
            .collect();
        if !errors.is_empty() {
            bail!("Aggregate query failed: {}", messages.join("; "));
        }
    }

    json.pointer(&format!("/data/Aggregate/{}/0/meta/count", class))
        .and_then(|c| c.as_u64())
        .ok_or_else(|| anyhow::anyhow!("Invalid aggregate response: missing meta.count"))
}
