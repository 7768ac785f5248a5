//! OpenAI-style chat completions backend.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ChatMessage, GenerationParams, ModelClient, ModelError, ModelReply, Usage};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Client for any `/v1/chat/completions`-compatible endpoint.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl OpenAiClient {
    pub fn new(base_url: Option<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.into(),
            api_key,
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ModelReply, ModelError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let payload = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });

        debug!("POST {url} model={} messages={}", self.model, messages.len());
        let mut request = self.client.post(&url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|source| ModelError::Transport {
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

        let parsed: CompletionResponse =
            response
                .json()
                .await
                .map_err(|source| ModelError::Transport {
                    url: url.clone(),
                    source,
                })?;

        let text = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| ModelError::Malformed("no choices in completion response".into()))?;
        let usage = parsed.usage.unwrap_or_default();

        Ok(ModelReply {
            text,
            usage: Usage {
                prompt_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }
}
