pub mod agent;
pub mod chat;
pub mod config;
pub mod documents;
pub mod error;
pub mod llm_interaction;
pub mod tools;
pub mod transcript;
pub mod web_server;

pub use agent::{stream_answer, Agent, AgentEvent};
pub use chat::{handle_action, ChatAction, ChatSession};
pub use config::AgentConfig;
pub use documents::{count_documents, load_documents, DocumentMap};
pub use error::{AgentError, ConfigError};
pub use transcript::{Message, Role, Transcript};
