//! Reflective-improve pattern: a bounded critique-then-revise loop.
//!
//! A critic model reviews the current draft; if revision is required a
//! reviser model produces a replacement, and the cycle repeats up to
//! the revision budget. Every model call and draft version is logged
//! to a [`Tracer`], so the refinement leaves a complete, replayable
//! audit trail.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::executor::Executor;
use crate::model::{ChatMessage, GenerationParams};
use crate::protocol::{Message, Role};
use crate::tracer::Tracer;

/// Critique instruction for the reflection loop.
const CRITIQUE_PROMPT: &str = "You are a meticulous reviewer. Given the task description and draft, \
     list concrete issues (if any) and propose exact fixes. Return JSON \
     with fields: {\"issues\": [...], \"revise_required\": true/false, \
     \"patch\": \"...\"}.";

const REVISION_PROMPT: &str = "Apply the patch or produce a revised complete draft.";

/// Marker scanned for when the critique is not parseable JSON.
const NO_REVISION_MARKER: &str = "\"revise_required\": false";

/// Structured critique the critic is asked to emit.
#[derive(Debug, Deserialize)]
struct Critique {
    revise_required: bool,
    #[serde(default)]
    #[allow(dead_code)]
    issues: Vec<serde_json::Value>,
    #[serde(default)]
    #[allow(dead_code)]
    patch: Option<String>,
}

/// Strip markdown code fences from an LLM response to extract raw content.
/// Handles ```json, ```, and plain text (no fences).
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else {
        trimmed
    }
}

/// Decide whether the critique asks for a revision.
///
/// Strict JSON wins when the critique parses; otherwise fall back to a
/// case-insensitive scan for the no-revision marker. A critique that
/// signals neither way demands a revision, so malformed critic output
/// drives the loop to its bounded exit instead of stalling it.
fn revise_required(critique: &str) -> bool {
    match serde_json::from_str::<Critique>(strip_markdown_fences(critique)) {
        Ok(parsed) => parsed.revise_required,
        Err(e) => {
            debug!("Critique is not strict JSON ({e}), falling back to marker scan");
            !critique.to_lowercase().contains(NO_REVISION_MARKER)
        }
    }
}

/// Critique-and-revise driver.
pub struct Reflector {
    executor: Executor,
    trace_dir: PathBuf,
    max_revisions: u32,
    params: GenerationParams,
}

impl Reflector {
    pub fn new(
        executor: Executor,
        trace_dir: impl Into<PathBuf>,
        max_revisions: u32,
        params: GenerationParams,
    ) -> Self {
        Self {
            executor,
            trace_dir: trace_dir.into(),
            max_revisions,
            params,
        }
    }

    /// Improve `draft` through at most `max_revisions + 1` critique
    /// cycles, returning the most recently produced text.
    ///
    /// Terminal model failures propagate; tracer write failures never
    /// do. The loop always terminates.
    pub async fn improve(
        &self,
        task_id: &str,
        agent_name: &str,
        task_desc: &str,
        draft: &str,
    ) -> Result<String, Error> {
        let mut tracer = Tracer::new(task_id, &self.trace_dir)?;
        tracer.log(Message::new(Role::User, "user", task_desc));
        tracer.log(Message::new(Role::Agent, agent_name, draft));

        let mut current_draft = draft.to_string();
        for attempt in 0..=self.max_revisions {
            let critic_messages = vec![
                ChatMessage::system(CRITIQUE_PROMPT),
                ChatMessage::user(format!("TASK:\n{task_desc}\n\nDRAFT:\n{current_draft}\n")),
            ];
            let critique = self
                .executor
                .call("critic", &critic_messages, &self.params)
                .await?;
            tracer.log(Message::new(Role::Validator, "critic", &critique.text));

            if !revise_required(&critique.text) {
                tracer.finalize(
                    Some("pass"),
                    critique.usage.prompt_tokens,
                    critique.usage.output_tokens,
                );
                return Ok(current_draft);
            }

            let revision_messages = vec![
                ChatMessage::system(REVISION_PROMPT),
                ChatMessage::user(&critique.text),
            ];
            let reviser = format!("{agent_name}-reviser");
            let revised = self
                .executor
                .call(&reviser, &revision_messages, &self.params)
                .await?;
            tracer.log(Message::new(Role::Agent, &reviser, &revised.text));
            current_draft = revised.text;

            if attempt == self.max_revisions {
                tracer.finalize(
                    Some("pass_after_revise"),
                    critique.usage.prompt_tokens + revised.usage.prompt_tokens,
                    critique.usage.output_tokens + revised.usage.output_tokens,
                );
                return Ok(current_draft);
            }
        }

        // The loop above always returns from one of the terminal arms.
        Ok(current_draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScriptedModel, Usage};
    use crate::protocol::Exchange;
    use std::path::Path;
    use std::sync::Arc;

    const USAGE: Usage = Usage {
        prompt_tokens: 10,
        output_tokens: 4,
    };

    fn reflector(mock: Arc<ScriptedModel>, dir: &Path, max_revisions: u32) -> Reflector {
        Reflector::new(
            Executor::new(mock, 2),
            dir,
            max_revisions,
            GenerationParams::default(),
        )
    }

    fn last_snapshot(dir: &Path, task_id: &str) -> Exchange {
        let content = std::fs::read_to_string(dir.join(format!("{task_id}.jsonl"))).unwrap();
        serde_json::from_str(content.lines().last().unwrap()).unwrap()
    }

    #[test]
    fn test_strip_markdown_fences() {
        assert_eq!(strip_markdown_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_markdown_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_markdown_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_revise_required_strict_json() {
        assert!(!revise_required(
            r#"{"issues": [], "revise_required": false, "patch": ""}"#
        ));
        assert!(revise_required(
            r#"{"issues": ["x"], "revise_required": true, "patch": "fix"}"#
        ));
        // compact JSON has no marker substring but parses strictly
        assert!(!revise_required(r#"{"revise_required":false}"#));
    }

    #[test]
    fn test_revise_required_fallback_and_failsafe() {
        // not valid JSON, but the case-insensitive marker is present
        assert!(!revise_required(r#"sure! "REVISE_REQUIRED": FALSE"#));
        // neither parseable nor marked: fail-safe demands a revision
        assert!(revise_required("looks great to me"));
    }

    #[tokio::test]
    async fn test_pass_returns_original_draft() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(ScriptedModel::replies(
            &[r#"{"issues": [], "revise_required": false, "patch": ""}"#],
            USAGE,
        ));
        let out = reflector(mock.clone(), dir.path(), 1)
            .improve("t1", "write_article", "write about X", "the draft")
            .await
            .unwrap();

        assert_eq!(out, "the draft");
        assert_eq!(mock.calls(), 1);

        let snapshot = last_snapshot(dir.path(), "t1");
        assert_eq!(snapshot.verdict.as_deref(), Some("pass"));
        // user + initial draft + critique
        assert_eq!(snapshot.messages.len(), 3);
        assert_eq!(snapshot.messages[0].role, Role::User);
        assert_eq!(snapshot.messages[1].sender, "write_article");
        assert_eq!(snapshot.messages[2].role, Role::Validator);
        assert_eq!(snapshot.messages[2].sender, "critic");
        assert_eq!(snapshot.cost_tokens_prompt, 10);
        assert_eq!(snapshot.cost_tokens_output, 4);
    }

    #[tokio::test]
    async fn test_case_variant_marker_passes() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(ScriptedModel::replies(
            &[r#"Notes: "REVISE_REQUIRED": FALSE"#],
            USAGE,
        ));
        let out = reflector(mock, dir.path(), 1)
            .improve("t1b", "summarize", "summarize", "short summary")
            .await
            .unwrap();
        assert_eq!(out, "short summary");
        assert_eq!(last_snapshot(dir.path(), "t1b").verdict.as_deref(), Some("pass"));
    }

    #[tokio::test]
    async fn test_fenced_critique_parses() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(ScriptedModel::replies(
            &["```json\n{\"issues\": [], \"revise_required\": false}\n```"],
            USAGE,
        ));
        let out = reflector(mock.clone(), dir.path(), 1)
            .improve("t1c", "summarize", "summarize", "draft")
            .await
            .unwrap();
        assert_eq!(out, "draft");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_last_revision() {
        let dir = tempfile::tempdir().unwrap();
        // critic never approves; max_revisions = 1 gives two full cycles
        let mock = Arc::new(ScriptedModel::replies(
            &[
                r#"{"issues": ["a"], "revise_required": true, "patch": "p1"}"#,
                "revision one",
                r#"{"issues": ["b"], "revise_required": true, "patch": "p2"}"#,
                "revision two",
            ],
            USAGE,
        ));
        let out = reflector(mock.clone(), dir.path(), 1)
            .improve("t2", "write_article", "write about X", "the draft")
            .await
            .unwrap();

        assert_eq!(out, "revision two");
        assert_eq!(mock.calls(), 4);

        let snapshot = last_snapshot(dir.path(), "t2");
        assert_eq!(snapshot.verdict.as_deref(), Some("pass_after_revise"));
        // user, draft, critique1, revision1, critique2, revision2
        assert_eq!(snapshot.messages.len(), 6);
        assert_eq!(snapshot.messages[3].sender, "write_article-reviser");
        assert_eq!(snapshot.messages[5].content, "revision two");
        // final iteration's critique + revision usage only
        assert_eq!(snapshot.cost_tokens_prompt, 20);
        assert_eq!(snapshot.cost_tokens_output, 8);
    }

    #[tokio::test]
    async fn test_zero_revisions_pass() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(ScriptedModel::replies(
            &[r#"{"issues": [], "revise_required": false}"#],
            USAGE,
        ));
        let out = reflector(mock.clone(), dir.path(), 0)
            .improve("t3", "summarize", "summarize", "draft")
            .await
            .unwrap();
        assert_eq!(out, "draft");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_revisions_single_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(ScriptedModel::replies(
            &[
                r#"{"issues": ["x"], "revise_required": true, "patch": "p"}"#,
                "revised once",
            ],
            USAGE,
        ));
        let out = reflector(mock.clone(), dir.path(), 0)
            .improve("t4", "summarize", "summarize", "draft")
            .await
            .unwrap();
        assert_eq!(out, "revised once");
        // exactly one critique and one revision
        assert_eq!(mock.calls(), 2);
        let snapshot = last_snapshot(dir.path(), "t4");
        assert_eq!(snapshot.verdict.as_deref(), Some("pass_after_revise"));
        assert_eq!(snapshot.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_revision_prompt_carries_critique_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let critique = r#"{"issues": ["x"], "revise_required": true, "patch": "p"}"#;
        let mock = Arc::new(ScriptedModel::replies(&[critique, "revised"], USAGE));
        reflector(mock.clone(), dir.path(), 0)
            .improve("t5", "summarize", "summarize", "draft")
            .await
            .unwrap();
        let requests = mock.requests();
        assert_eq!(requests[1].messages[0].content, REVISION_PROMPT);
        assert_eq!(requests[1].messages[1].content, critique);
    }

    #[tokio::test]
    async fn test_empty_task_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(ScriptedModel::replies(&[], USAGE));
        let err = reflector(mock, dir.path(), 1)
            .improve("", "summarize", "summarize", "draft")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyTaskId));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        // budget of 2 in reflector(); both attempts fail
        let mock = Arc::new(ScriptedModel::new(vec![
            crate::model::mock::ScriptedResult::Error("down".into()),
            crate::model::mock::ScriptedResult::Error("down".into()),
        ]));
        let err = reflector(mock, dir.path(), 1)
            .improve("t6", "summarize", "summarize", "draft")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { .. }));
    }
}
