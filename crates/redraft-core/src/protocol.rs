//! Message and exchange data model.
//!
//! These types are the stable contract between the task pipelines, the
//! tracer and anything reading the persisted `.jsonl` trace files. A
//! [`Message`] records a single attributed utterance; an [`Exchange`]
//! bundles the messages of one task together with token cost, latency
//! and the final verdict.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Who produced a message. No other values are accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Validator,
    System,
    Tool,
}

/// A single utterance within an exchange.
///
/// The id and timestamp are assigned at construction. Timestamps are
/// wall-clock only; ordering within an exchange comes from insertion
/// order, not from comparing timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub sender: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_args: Option<serde_json::Value>,
    pub ts: String,
}

impl Message {
    pub fn new(role: Role, sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            sender: sender.into(),
            content: content.into(),
            tool_name: None,
            tool_args: None,
            ts: Utc::now().to_rfc3339(),
        }
    }

    /// Attach tool invocation details. Meaningful only for [`Role::Tool`].
    pub fn with_tool(mut self, name: impl Into<String>, args: serde_json::Value) -> Self {
        self.tool_name = Some(name.into());
        self.tool_args = Some(args);
        self
    }
}

/// The recorded interaction history and metadata for one task.
///
/// Token costs start at zero and only accumulate. `latency_ms` is
/// stamped once by the tracer on the first finalize and never
/// recomputed. An exchange is owned by exactly one tracer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exchange {
    pub task_id: String,
    pub messages: Vec<Message>,
    pub cost_tokens_prompt: u64,
    pub cost_tokens_output: u64,
    pub latency_ms: Option<u64>,
    pub verdict: Option<String>,
}

impl Exchange {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            messages: Vec::new(),
            cost_tokens_prompt: 0,
            cost_tokens_output: 0,
            latency_ms: None,
            verdict: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_defaults() {
        let msg = Message::new(Role::User, "user", "hello");
        assert!(!msg.id.is_empty());
        assert!(!msg.ts.is_empty());
        assert!(msg.tool_name.is_none());
        assert!(msg.tool_args.is_none());
    }

    #[test]
    fn test_message_ids_unique() {
        let a = Message::new(Role::Agent, "a", "x");
        let b = Message::new(Role::Agent, "a", "x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_role_set_is_closed() {
        assert!(serde_json::from_str::<Role>("\"validator\"").is_ok());
        assert!(serde_json::from_str::<Role>("\"assistant\"").is_err());
    }

    #[test]
    fn test_tool_fields_omitted_when_absent() {
        let json = serde_json::to_string(&Message::new(Role::User, "user", "hi")).unwrap();
        assert!(!json.contains("tool_name"));
        assert!(!json.contains("tool_args"));

        let msg = Message::new(Role::Tool, "lookup", "done")
            .with_tool("lookup", serde_json::json!({"q": "phi"}));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"tool_name\":\"lookup\""));
    }

    #[test]
    fn test_exchange_preserves_insertion_order() {
        let mut ex = Exchange::new("t");
        for i in 0..20 {
            ex.messages
                .push(Message::new(Role::Agent, "a", format!("m{i}")));
        }
        let contents: Vec<&str> = ex.messages.iter().map(|m| m.content.as_str()).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("m{i}")).collect();
        assert_eq!(contents, expected);
    }

    #[test]
    fn test_exchange_roundtrip_exact() {
        let mut ex = Exchange::new("t-42");
        ex.messages.push(Message::new(Role::User, "user", "task"));
        ex.messages.push(
            Message::new(Role::Tool, "sanitizer", "ok")
                .with_tool("sanitize", serde_json::json!({"strict": true})),
        );
        ex.cost_tokens_prompt = 17;
        ex.cost_tokens_output = 5;
        ex.latency_ms = Some(120);
        ex.verdict = Some("pass".into());

        let line = serde_json::to_string(&ex).unwrap();
        let back: Exchange = serde_json::from_str(&line).unwrap();
        assert_eq!(back, ex);
    }

    #[test]
    fn test_unset_latency_and_verdict_serialize_as_null() {
        let value = serde_json::to_value(Exchange::new("t")).unwrap();
        assert!(value["latency_ms"].is_null());
        assert!(value["verdict"].is_null());
    }
}
