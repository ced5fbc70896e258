//! OpenAI-compatible `/chat/completions` client.

use crate::capability::{GenerationRequest, GenerationResponse, TextGeneration};
use crate::error::{GenerationError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpenAiChatConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl Default for OpenAiChatConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(120),
            max_retries: 3,
        }
    }
}

#[derive(Clone)]
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    model: String,
    max_retries: usize,
}

impl OpenAiChat {
    pub fn new(config: OpenAiChatConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::ApiError("missing OpenAI API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", config.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| GenerationError::ApiError("invalid OpenAI API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model,
            max_retries: config.max_retries.max(1),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn retry_backoff(attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(500 * (1 << capped))
    }
}

#[async_trait]
impl TextGeneration for OpenAiChat {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        let body = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_content,
                },
            ],
        };

        let mut attempt = 0usize;
        loop {
            let resp = self.client.post(&self.endpoint).json(&body).send().await?;
            let status = resp.status();
            if status.is_success() {
                let parsed: ChatResponse = resp.json().await?;
                let text = parsed
                    .choices
                    .into_iter()
                    .find_map(|choice| choice.message.content)
                    .unwrap_or_default();
                if text.trim().is_empty() {
                    return Err(GenerationError::EmptyResponse);
                }
                return Ok(GenerationResponse { text });
            }

            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt + 1 < self.max_retries {
                attempt += 1;
                log::debug!("Chat completion got {status}, retry {attempt}");
                tokio::time::sleep(Self::retry_backoff(attempt)).await;
                continue;
            }
            return Err(GenerationError::ApiError(format!("{status}: {text}")));
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_api_key() {
        assert!(matches!(
            OpenAiChat::new(OpenAiChatConfig::default()),
            Err(GenerationError::ApiError(_))
        ));
    }

    #[test]
    fn response_with_null_content_is_tolerated() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
