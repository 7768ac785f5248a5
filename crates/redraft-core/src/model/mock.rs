//! Scripted model client for deterministic tests and offline runs.
//!
//! The mock replays a queue of scripted results in order and records
//! every request it receives, so tests can assert on both the replies
//! an agent saw and the prompts it sent.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChatMessage, GenerationParams, ModelClient, ModelError, ModelReply, Usage};

/// One scripted outcome for a single `generate` call.
pub enum ScriptedResult {
    Reply(ModelReply),
    Error(String),
}

/// A recorded request, captured for later assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub params: GenerationParams,
}

struct Inner {
    script: Vec<ScriptedResult>,
    next: usize,
    requests: Vec<RecordedRequest>,
}

/// Model client that replays scripted results sequentially.
pub struct ScriptedModel {
    inner: Mutex<Inner>,
}

impl ScriptedModel {
    pub fn new(script: Vec<ScriptedResult>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                script,
                next: 0,
                requests: Vec::new(),
            }),
        }
    }

    /// Script a sequence of plain-text replies with the given usage.
    pub fn replies(texts: &[&str], usage: Usage) -> Self {
        Self::new(
            texts
                .iter()
                .map(|t| {
                    ScriptedResult::Reply(ModelReply {
                        text: t.to_string(),
                        usage,
                    })
                })
                .collect(),
        )
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ModelReply, ModelError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(RecordedRequest {
            messages: messages.to_vec(),
            params: *params,
        });
        let index = inner.next;
        inner.next += 1;
        match inner.script.get(index) {
            Some(ScriptedResult::Reply(reply)) => Ok(reply.clone()),
            Some(ScriptedResult::Error(msg)) => Err(ModelError::Other(msg.clone())),
            None => Err(ModelError::Other(format!(
                "scripted model exhausted after {index} calls"
            ))),
        }
    }
}
