//! Chat-completion error types

use thiserror::Error;

use super::{CoreError, CoreErrorKind};

/// Failures talking to the hosted language model
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key configured for the provider
    #[error("LLM API key is not configured")]
    MissingApiKey,

    /// Request could not be sent or the body could not be read
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("LLM returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response parsed but carried no message content
    #[error("LLM response contained no choices")]
    EmptyResponse,
}

impl LlmError {
    pub fn error_code(&self) -> &'static str {
        match self {
            LlmError::MissingApiKey => "LLM_NOT_CONFIGURED",
            LlmError::Transport(_) => "LLM_TRANSPORT",
            LlmError::Status { .. } => "LLM_STATUS",
            LlmError::EmptyResponse => "LLM_EMPTY",
        }
    }
}

impl From<LlmError> for CoreError {
    fn from(err: LlmError) -> Self {
        CoreError::new(CoreErrorKind::Unavailable, "Map generation service unavailable")
            .with_source(err)
    }
}
