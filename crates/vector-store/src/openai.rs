//! OpenAI-compatible `/embeddings` client.

use crate::embeddings::EmbeddingCapability;
use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpenAiEmbedderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimensions: Option<usize>,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl Default for OpenAiEmbedderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }
}

#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
    max_retries: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: OpenAiEmbedderConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(VectorStoreError::EmbeddingError(
                "missing OpenAI API key".to_string(),
            ));
        }
        if config.model.trim().is_empty() {
            return Err(VectorStoreError::EmbeddingError(
                "missing embedding model name".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", config.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| VectorStoreError::EmbeddingError("invalid OpenAI API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model,
            dimensions: config.dimensions,
            max_retries: config.max_retries.max(1),
        })
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn retry_backoff(attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(500 * (1 << capped))
    }
}

#[async_trait]
impl EmbeddingCapability for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimensions,
        };

        let mut attempt = 0usize;
        loop {
            let resp = self.client.post(&self.endpoint).json(&request).send().await;
            match resp {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: EmbeddingResponse = resp.json().await?;
                    return parsed
                        .data
                        .into_iter()
                        .next()
                        .map(|entry| entry.embedding)
                        .ok_or_else(|| {
                            VectorStoreError::EmbeddingError(
                                "embedding response contained no vectors".to_string(),
                            )
                        });
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if Self::should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        log::debug!("Embedding request got {status}, retry {attempt}");
                        tokio::time::sleep(Self::retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(VectorStoreError::EmbeddingError(format!(
                        "embeddings request failed ({status}): {body}"
                    )));
                }
                Err(err) if (err.is_timeout() || err.is_connect()) && attempt + 1 < self.max_retries => {
                    attempt += 1;
                    log::debug!("Embedding request error {err}, retry {attempt}");
                    tokio::time::sleep(Self::retry_backoff(attempt)).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn dimension(&self) -> Option<usize> {
        self.dimensions
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
