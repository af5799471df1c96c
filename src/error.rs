// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Elasticsearch error: {0}")]
    Elasticsearch(String),

    #[error("MCP error: {0}")]
    Mcp(String),

    #[error("MCP session expired")]
    McpSessionExpired,

    #[error("Model error: {0}")]
    Model(String),

    #[error("Query translation error: {0}")]
    Translation(String),

    #[error("Deployment step '{step}' failed: {message}")]
    Deploy { step: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    pub fn deploy(step: &str, message: impl Into<String>) -> Self {
        Self::Deploy {
            step: step.to_string(),
            message: message.into(),
        }
    }

    /// True when the failure came from a system this service calls out to.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Elasticsearch(_)
                | Self::Mcp(_)
                | Self::McpSessionExpired
                | Self::Model(_)
                | Self::Http(_)
        )
    }
}
