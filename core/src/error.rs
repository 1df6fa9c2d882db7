use thiserror::Error;

/// Content reported to the model when it asks for a tool nobody registered.
pub const TOOL_NOT_FOUND: &str = "tool not found";

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    #[error("No API key found (set {0} or run 'relay onboard')")]
    MissingApiKey(String),

    #[error("Unknown provider: {0}. Available: anthropic, openai")]
    UnknownProvider(String),

    #[error("Mock provider has no scripted reply left")]
    Exhausted,
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Model call cancelled")]
    Cancelled,

    #[error("Failed to read input: {0:#}")]
    Input(anyhow::Error),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Tool results do not match the last model turn: {0}")]
    ResultMismatch(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
