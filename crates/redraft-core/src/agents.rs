//! Task agents and their registry.
//!
//! Each agent is a prompt template plus generation parameters; the
//! retry contract lives in [`Executor`], so an agent's `execute` is a
//! single retried model call. Prompts are configuration data — the
//! generic execution contract does not interpret them.

use std::collections::HashMap;

use crate::error::Error;
use crate::executor::Executor;
use crate::model::{ChatMessage, GenerationParams};

/// A named system prompt with its generation parameters.
#[derive(Debug, Clone)]
pub struct PromptAgent {
    pub name: String,
    pub system_prompt: String,
    pub params: GenerationParams,
}

impl PromptAgent {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            params: GenerationParams {
                temperature,
                max_tokens,
            },
        }
    }

    /// Build the two-message conversation for one request.
    pub fn messages(&self, user_content: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(user_content),
        ]
    }

    /// Run this agent once through the retrying executor.
    pub async fn execute(&self, executor: &Executor, user_content: &str) -> Result<String, Error> {
        let reply = executor
            .call(&self.name, &self.messages(user_content), &self.params)
            .await?;
        Ok(reply.text)
    }
}

/// Registry of the built-in agents, keyed by name.
pub struct AgentRegistry {
    agents: HashMap<String, PromptAgent>,
}

impl AgentRegistry {
    /// The built-in agent set: three task agents, their validators, the
    /// article refiner and the generic validator.
    pub fn builtin() -> Self {
        let mut agents = HashMap::new();
        for agent in [
            PromptAgent::new(
                "summarize",
                "You are an AI assistant that summarizes medical texts.",
                0.7,
                300,
            ),
            PromptAgent::new("write_article", "You are an expert academic writer.", 0.7, 1000),
            PromptAgent::new(
                "sanitize_data",
                "You are an AI assistant that sanitizes medical data by removing \
                 Protected Health Information (PHI).",
                0.7,
                500,
            ),
            PromptAgent::new(
                "summarize_validator",
                "You are an AI assistant that validates summaries of medical texts \
                 for accuracy and completeness.",
                0.3,
                500,
            ),
            PromptAgent::new(
                "write_article_validator",
                "You are an AI assistant that validates research articles.",
                0.3,
                512,
            ),
            PromptAgent::new(
                "sanitize_data_validator",
                "You are an AI assistant that validates the sanitization of medical \
                 data by checking for the removal of Protected Health Information (PHI).",
                0.3,
                512,
            ),
            PromptAgent::new(
                "refiner",
                "You are an expert editor who refines and enhances research articles \
                 for clarity, coherence, and academic quality.",
                0.5,
                2048,
            ),
            PromptAgent::new(
                "validator",
                "You are an AI assistant that validates research articles for \
                 accuracy, completeness, and adherence to academic standards.",
                0.3,
                500,
            ),
        ] {
            agents.insert(agent.name.clone(), agent);
        }
        Self { agents }
    }

    /// Look up an agent by name. Unknown names are a caller error,
    /// reported immediately and never retried.
    pub fn get(&self, name: &str) -> Result<&PromptAgent, Error> {
        self.agents
            .get(name)
            .ok_or_else(|| Error::UnknownAgent(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.keys().map(|k| k.as_str()).collect()
    }
}

/// Request template for the summarize agent.
pub fn summarize_request(text: &str) -> String {
    format!("Please provide a concise summary of the following medical text:\n\n{text}\n\nSummary:")
}

/// Request template for the article writer, with an optional outline.
pub fn article_request(topic: &str, outline: Option<&str>) -> String {
    let mut content = format!("Write a research article on the following topic:\nTopic: {topic}\n\n");
    if let Some(outline) = outline {
        content.push_str(&format!("Outline:\n{outline}\n\n"));
    }
    content.push_str("Article:\n");
    content
}

/// Request template for the PHI sanitizer.
pub fn sanitize_request(medical_data: &str) -> String {
    format!("Remove all PHI from the following data:\n\n{medical_data}\n\nSanitized Data:")
}

/// Request template for the article refiner.
pub fn refine_request(draft: &str) -> String {
    format!(
        "Please refine the following research article draft to improve its \
         language, coherence, and overall quality:\n\n{draft}\n\nRefined Article:"
    )
}

/// Request template for summary validation.
pub fn summary_validation_request(original_text: &str, summary: &str) -> String {
    format!(
        "Given the original text and its summary, assess whether the summary \
         captures the key points accurately and completely.\n\
         Provide a brief analysis and rate the summary on a scale of 1 to 5, \
         where 5 indicates excellent quality.\n\n\
         Original Text:\n{original_text}\n\nSummary:\n{summary}\n\nValidation:"
    )
}

/// Request template for article validation.
pub fn article_validation_request(topic: &str, article: &str) -> String {
    format!(
        "Given the topic and the research article below, assess whether the \
         article comprehensively covers the topic, follows a logical structure, \
         and maintains academic standards.\n\
         Provide a brief analysis and rate the article on a scale of 1 to 5, \
         where 5 indicates excellent quality.\n\n\
         Topic: {topic}\n\nArticle:\n{article}\n\nValidation:"
    )
}

/// Request template for sanitization validation.
pub fn sanitize_validation_request(original_data: &str, sanitized_data: &str) -> String {
    format!(
        "Given the original data and the sanitized data, verify that all PHI \
         has been removed.\n\
         List any remaining PHI in the sanitized data and rate the sanitization \
         process on a scale of 1 to 5, where 5 indicates complete sanitization.\n\n\
         Original Data:\n{original_data}\n\nSanitized Data:\n{sanitized_data}\n\nValidation:"
    )
}
