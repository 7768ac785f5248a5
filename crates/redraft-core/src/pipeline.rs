//! High-level task pipelines.
//!
//! Each pipeline runs a producing agent, then a second model pass that
//! validates the output, recording every stage through a [`Tracer`].
//! Agent failures propagate to the caller; trace persistence failures
//! never abort a task.

use std::path::PathBuf;

use tracing::info;

use crate::agents::{
    article_request, article_validation_request, refine_request, sanitize_request,
    sanitize_validation_request, summarize_request, summary_validation_request, AgentRegistry,
};
use crate::error::Error;
use crate::executor::Executor;
use crate::model::Usage;
use crate::protocol::{Message, Role};
use crate::reflect::Reflector;
use crate::tracer::Tracer;

/// Result of one pipeline run: the produced text and the validator's
/// assessment of it.
#[derive(Debug, Clone)]
pub struct TaskOutput {
    pub text: String,
    pub validation: String,
}

pub struct Pipelines {
    executor: Executor,
    registry: AgentRegistry,
    trace_dir: PathBuf,
    max_revisions: u32,
}

impl Pipelines {
    pub fn new(executor: Executor, trace_dir: impl Into<PathBuf>, max_revisions: u32) -> Self {
        Self {
            executor,
            registry: AgentRegistry::builtin(),
            trace_dir: trace_dir.into(),
            max_revisions,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Summarize a medical text, then validate the summary.
    pub async fn summarize(&self, task_id: &str, text: &str) -> Result<TaskOutput, Error> {
        let mut tracer = Tracer::new(task_id, &self.trace_dir)?;
        tracer.log(Message::new(Role::User, "user", text));

        let agent = self.registry.get("summarize")?;
        let summary = self
            .executor
            .call(&agent.name, &agent.messages(&summarize_request(text)), &agent.params)
            .await?;
        tracer.log(Message::new(Role::Agent, &agent.name, &summary.text));

        let validator = self.registry.get("summarize_validator")?;
        let validation = self
            .executor
            .call(
                &validator.name,
                &validator.messages(&summary_validation_request(text, &summary.text)),
                &validator.params,
            )
            .await?;
        tracer.log(Message::new(Role::Validator, &validator.name, &validation.text));

        let usage = add(summary.usage, validation.usage);
        tracer.finalize(Some("pass"), usage.prompt_tokens, usage.output_tokens);
        info!("Summarize task '{task_id}' complete");
        Ok(TaskOutput {
            text: summary.text,
            validation: validation.text,
        })
    }

    /// Write a research article, refine it through the reflective loop
    /// and a final editing pass, then validate the result.
    pub async fn write_and_refine(
        &self,
        task_id: &str,
        topic: &str,
        outline: Option<&str>,
    ) -> Result<TaskOutput, Error> {
        let mut tracer = Tracer::new(task_id, &self.trace_dir)?;
        tracer.log(Message::new(Role::User, "user", article_request(topic, outline)));

        let writer = self.registry.get("write_article")?;
        let draft = self
            .executor
            .call(
                &writer.name,
                &writer.messages(&article_request(topic, outline)),
                &writer.params,
            )
            .await?;
        tracer.log(Message::new(Role::Agent, &writer.name, &draft.text));

        // Reflective critique/revise pass; appends its own snapshots
        // under the same task id.
        let improved = Reflector::new(
            self.executor.clone(),
            &self.trace_dir,
            self.max_revisions,
            writer.params,
        )
        .improve(task_id, &writer.name, &format!("Write a research article on: {topic}"), &draft.text)
        .await?;

        let refiner = self.registry.get("refiner")?;
        let refined = self
            .executor
            .call(&refiner.name, &refiner.messages(&refine_request(&improved)), &refiner.params)
            .await?;
        tracer.log(Message::new(Role::Agent, &refiner.name, &refined.text));

        let validator = self.registry.get("validator")?;
        let validation = self
            .executor
            .call(
                &validator.name,
                &validator.messages(&article_validation_request(topic, &refined.text)),
                &validator.params,
            )
            .await?;
        tracer.log(Message::new(Role::Validator, &validator.name, &validation.text));

        let usage = add(add(draft.usage, refined.usage), validation.usage);
        tracer.finalize(Some("pass"), usage.prompt_tokens, usage.output_tokens);
        info!("Write-and-refine task '{task_id}' complete");
        Ok(TaskOutput {
            text: refined.text,
            validation: validation.text,
        })
    }

    /// Remove PHI from medical data, then validate the sanitization.
    pub async fn sanitize(&self, task_id: &str, medical_data: &str) -> Result<TaskOutput, Error> {
        let mut tracer = Tracer::new(task_id, &self.trace_dir)?;
        tracer.log(Message::new(Role::User, "user", medical_data));

        let agent = self.registry.get("sanitize_data")?;
        let sanitized = self
            .executor
            .call(
                &agent.name,
                &agent.messages(&sanitize_request(medical_data)),
                &agent.params,
            )
            .await?;
        tracer.log(Message::new(Role::Agent, &agent.name, &sanitized.text));

        let validator = self.registry.get("sanitize_data_validator")?;
        let validation = self
            .executor
            .call(
                &validator.name,
                &validator.messages(&sanitize_validation_request(medical_data, &sanitized.text)),
                &validator.params,
            )
            .await?;
        tracer.log(Message::new(Role::Validator, &validator.name, &validation.text));

        let usage = add(sanitized.usage, validation.usage);
        tracer.finalize(Some("pass"), usage.prompt_tokens, usage.output_tokens);
        info!("Sanitize task '{task_id}' complete");
        Ok(TaskOutput {
            text: sanitized.text,
            validation: validation.text,
        })
    }
}

fn add(a: Usage, b: Usage) -> Usage {
    Usage {
        prompt_tokens: a.prompt_tokens + b.prompt_tokens,
        output_tokens: a.output_tokens + b.output_tokens,
    }
}
