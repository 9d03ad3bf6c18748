use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shown when the service reports failure without a message, or when a
/// successful response does not carry a usable coordinator result.
pub const ANALYSIS_FAILED: &str = "Analysis failed";
/// Shown when an unexpected error carries no message.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Transport,
    MalformedResult,
    Unexpected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("query must not be empty")]
    Validation,
    #[error("agent service failure: {0}")]
    Transport(String),
    #[error("malformed coordinator result: {0}")]
    MalformedResult(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AnalysisError {
    pub fn transport(message: Option<String>) -> Self {
        Self::Transport(message.unwrap_or_default())
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedResult(detail.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation => ErrorKind::Validation,
            Self::Transport(_) => ErrorKind::Transport,
            Self::MalformedResult(_) => ErrorKind::MalformedResult,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// The single line shown in the error panel for a failed run.
    pub fn display_message(&self) -> String {
        match self {
            Self::Validation => "Query must not be empty".to_string(),
            Self::Transport(message) if message.is_empty() => ANALYSIS_FAILED.to_string(),
            Self::Transport(message) => message.clone(),
            Self::MalformedResult(_) => ANALYSIS_FAILED.to_string(),
            Self::Unexpected(message) if message.is_empty() => UNKNOWN_ERROR.to_string(),
            Self::Unexpected(message) => message.clone(),
        }
    }
}
