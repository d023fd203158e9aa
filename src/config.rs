use std::fmt;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_DOCS_DIR: &str = "docs";
pub const DEFAULT_MAX_TURNS: usize = 10;

pub const AGENT_NAME: &str = "Special Needs Care Giver";

pub const AGENT_INSTRUCTIONS: &str = "\
**Your Role**
You are a personal assistant for help of caregivers of special needs. Your primary goal is to provide accurate and helpful answers to the user.

**Ensure the followings:**
Always provide the users with a valid answer.
Give suggestions according to the conversation and interests of user.
Use appropriate tool when needed.
Only provide detailed answers when required.
Your tone should be helpful and human-like.
Do not make up answers.";

/// Everything needed to talk to the model. Built once at startup and shared
/// read-only by every request handler.
#[derive(Clone)]
pub struct AgentConfig {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub name: String,
    pub instructions: String,
    pub docs_dir: PathBuf,
    pub max_turns: usize,
    /// Send earlier transcript turns along with each new question.
    pub thread_history: bool,
}

impl AgentConfig {
    /// Defaults for everything except the credential, which must be present
    /// and non-blank.
    pub fn new(api_key: Option<String>) -> Result<Self, ConfigError> {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey(API_KEY_ENV))?;

        Ok(Self {
            model: DEFAULT_MODEL.to_string(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            name: AGENT_NAME.to_string(),
            instructions: AGENT_INSTRUCTIONS.to_string(),
            docs_dir: PathBuf::from(DEFAULT_DOCS_DIR),
            max_turns: DEFAULT_MAX_TURNS,
            thread_history: false,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_docs_dir(mut self, docs_dir: impl Into<PathBuf>) -> Self {
        self.docs_dir = docs_dir.into();
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Result<Self, ConfigError> {
        if max_turns == 0 {
            return Err(ConfigError::InvalidMaxTurns);
        }
        self.max_turns = max_turns;
        Ok(self)
    }

    pub fn with_thread_history(mut self, thread_history: bool) -> Self {
        self.thread_history = thread_history;
        self
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

// Keep the key out of logs.
impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("name", &self.name)
            .field("docs_dir", &self.docs_dir)
            .field("max_turns", &self.max_turns)
            .field("thread_history", &self.thread_history)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key() {
        assert_eq!(
            AgentConfig::new(None).unwrap_err(),
            ConfigError::MissingApiKey(API_KEY_ENV)
        );
        assert_eq!(
            AgentConfig::new(Some("   ".to_string())).unwrap_err(),
            ConfigError::MissingApiKey(API_KEY_ENV)
        );
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::new(Some("key".to_string())).unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.docs_dir, PathBuf::from("docs"));
        assert_eq!(config.max_turns, 10);
        assert!(!config.thread_history);
        assert_eq!(
            config.chat_completions_url(),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn test_chat_completions_url_without_trailing_slash() {
        let config = AgentConfig::new(Some("key".to_string()))
            .unwrap()
            .with_base_url("http://127.0.0.1:9000");
        assert_eq!(config.chat_completions_url(), "http://127.0.0.1:9000/chat/completions");
    }

    #[test]
    fn test_zero_max_turns_rejected() {
        let config = AgentConfig::new(Some("key".to_string())).unwrap();
        assert_eq!(config.with_max_turns(0).unwrap_err(), ConfigError::InvalidMaxTurns);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = AgentConfig::new(Some("super-secret".to_string())).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
