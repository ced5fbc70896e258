use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_content: String,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        user_content: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_content: user_content.into(),
            temperature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
}

/// Chat-style text generation. Output is untrusted: every caller validates
/// what comes back before using it.
#[async_trait]
pub trait TextGeneration: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse>;
}
