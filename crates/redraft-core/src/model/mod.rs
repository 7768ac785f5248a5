//! Model-call abstraction.
//!
//! Everything above this layer sees one capability: given an ordered
//! list of role/content messages and generation parameters, produce a
//! text reply plus token usage. The concrete backend is chosen once at
//! process startup and injected, never branched on per call.

pub mod mock;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use mock::ScriptedModel;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// A wire-level role/content pair forwarded opaquely to the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Generation parameters forwarded to the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

/// Token usage reported by the provider. Zero when not reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub output_tokens: u64,
}

/// One complete model reply. No partial results on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub usage: Usage,
}

/// Failures of the model-call collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("transport error calling {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// Used by scripted test models to simulate provider failures.
    #[error("{0}")]
    Other(String),
}

/// The single injected model capability.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ModelReply, ModelError>;
}
