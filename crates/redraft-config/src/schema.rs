use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub trace: TraceConfig,
    pub agents: AgentDefaults,
}

/// Which model backend to talk to. Chosen once at startup, never per call.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Openai,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    pub backend: Backend,
    /// Base URL of the provider API. Defaults depend on the backend.
    pub base_url: Option<String>,
    pub model: String,
    /// API key for OpenAI-style backends. Ollama ignores it.
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Openai,
            base_url: None,
            model: "gpt-4o".into(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceConfig {
    /// Directory where per-task `.jsonl` trace files are written.
    pub dir: String,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self { dir: "traces".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentDefaults {
    /// Total LLM attempt budget per agent call.
    pub max_retries: u32,
    /// Revision budget for the reflective-improve loop.
    pub max_revisions: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            max_retries: 2,
            max_revisions: 1,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.provider.backend, Backend::Openai);
        assert_eq!(config.trace.dir, "traces");
        assert_eq!(config.agents.max_retries, 2);
        assert_eq!(config.agents.max_revisions, 1);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"provider": {"backend": "ollama", "model": "llama3:8b"}}"#)
                .unwrap();
        assert_eq!(config.provider.backend, Backend::Ollama);
        assert_eq!(config.provider.model, "llama3:8b");
        assert_eq!(config.trace.dir, "traces");
    }

    #[test]
    fn test_roundtrip() {
        let mut config = Config::default();
        config.agents.max_revisions = 3;
        config.provider.api_key = Some("sk-test".into());
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.agents.max_revisions, 3);
        assert_eq!(back.provider.api_key.as_deref(), Some("sk-test"));
    }
}
