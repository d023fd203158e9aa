use thiserror::Error;

/// Failure while obtaining an answer from the model.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("model API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode model response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("malformed event stream: {0}")]
    Stream(String),

    #[error("model response contained no choices")]
    EmptyResponse,

    #[error("max turns ({0}) exceeded")]
    MaxTurnsExceeded(usize),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set; add it to the environment or a .env file")]
    MissingApiKey(&'static str),

    #[error("max turns must be at least 1")]
    InvalidMaxTurns,
}
