//! Retrying wrapper around the model-call collaborator.
//!
//! Every agent call goes through [`Executor::call`]: a fixed total
//! attempt budget, immediate retry on failure, no backoff, no circuit
//! breaking across calls. Exhausting the budget produces a terminal
//! error naming the agent and the number of attempts made.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::Error;
use crate::model::{ChatMessage, GenerationParams, ModelClient, ModelReply};

/// Find the largest byte index <= `max` that is a UTF-8 char boundary.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut i = max;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn preview(text: &str) -> String {
    let end = floor_char_boundary(text, 120);
    text[..end].replace('\n', " ")
}

/// Shared agent-call executor.
#[derive(Clone)]
pub struct Executor {
    client: Arc<dyn ModelClient>,
    max_retries: u32,
}

impl Executor {
    pub fn new(client: Arc<dyn ModelClient>, max_retries: u32) -> Self {
        Self {
            client,
            max_retries: max_retries.max(1),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Invoke the model on behalf of `agent`, retrying up to the budget.
    ///
    /// The first successful reply is returned immediately, usage
    /// included (consumption is optional). Each call starts a fresh
    /// retry budget.
    pub async fn call(
        &self,
        agent: &str,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ModelReply, Error> {
        let mut attempts = 0;
        loop {
            debug!(
                "[{agent}] sending {} messages (temp={}, max_tokens={})",
                messages.len(),
                params.temperature,
                params.max_tokens
            );
            for msg in messages {
                debug!("  {}: {}...", msg.role, preview(&msg.content));
            }
            match self.client.generate(messages, params).await {
                Ok(reply) => {
                    info!("[{agent}] received response: {}...", preview(&reply.text));
                    return Ok(reply);
                }
                Err(e) => {
                    attempts += 1;
                    if attempts >= self.max_retries {
                        return Err(Error::RetriesExhausted {
                            agent: agent.to_string(),
                            attempts,
                            source: e,
                        });
                    }
                    error!(
                        "[{agent}] Error during LLM call: {e}. Retry {attempts}/{}",
                        self.max_retries
                    );
                }
            }
        }
    }
}
