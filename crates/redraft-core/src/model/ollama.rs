//! Local Ollama backend.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ChatMessage, GenerationParams, ModelClient, ModelError, ModelReply, Usage};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Client for a locally hosted model served via Ollama's `/api/chat`.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
    // Ollama reports token counts on the final chunk; absent counts stay zero.
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ModelReply, ModelError> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let payload = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": params.temperature,
                "num_predict": params.max_tokens,
            },
        });

        debug!("POST {url} model={} messages={}", self.model, messages.len());
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|source| ModelError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|source| ModelError::Transport {
                    url: url.clone(),
                    source,
                })?;

        let text = parsed
            .message
            .map(|m| m.content)
            .ok_or_else(|| ModelError::Malformed("no message in chat response".into()))?;

        Ok(ModelReply {
            text,
            usage: Usage {
                prompt_tokens: parsed.prompt_eval_count,
                output_tokens: parsed.eval_count,
            },
        })
    }
}
