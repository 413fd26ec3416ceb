use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failures that belong to a single tool call. These never end a run: the orchestrator
/// hands them back to the model as the content of the matching tool result.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Terminal failures of an orchestrator run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Language model unavailable after {attempts} attempt(s): {reason}")]
    Transport { attempts: u32, reason: String },

    #[error("Tool loop did not converge after {rounds} round(s)")]
    LoopNotConverged { rounds: u32 },

    #[error("Failed to render system prompt: {0}")]
    Prompt(String),
}

impl RunError {
    /// A sentence suitable for speaking back to the user. Transport diagnostics stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            RunError::Validation(_) => {
                "Sorry, I didn't catch a request there. Could you say that again?".to_string()
            }
            RunError::Transport { .. } => {
                "Sorry, I'm having trouble reaching my assistant service right now. Please try again in a moment."
                    .to_string()
            }
            RunError::LoopNotConverged { .. } => {
                "Sorry, I wasn't able to finish that request. Please try again.".to_string()
            }
            RunError::Prompt(_) => {
                "Sorry, something went wrong on my side. Please try again.".to_string()
            }
        }
    }
}

/// Errors raised by the audio container codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Malformed audio container: {0}")]
    MalformedContainer(String),

    #[error("Audio buffer already carries a container header")]
    AlreadyHeadered,

    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),
}

/// Errors raised by the text channel when moving between audio and text.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("{0}")]
    Validation(String),

    #[error("Speech service request failed: {0}")]
    Transport(String),

    #[error("Speech service timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_round_trips_through_json() -> anyhow::Result<()> {
        let err = AgentError::InvalidParameters("user_id must be a string".to_string());
        let json = serde_json::to_string(&err)?;
        let back: AgentError = serde_json::from_str(&json)?;
        assert_eq!(back, err);
        Ok(())
    }

    #[test]
    fn test_user_message_hides_transport_details() {
        let err = RunError::Transport {
            attempts: 3,
            reason: "status 503 from https://api.example.com".to_string(),
        };
        let spoken = err.user_message();
        assert!(!spoken.contains("503"));
        assert!(!spoken.contains("https://"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_loop_not_converged_message() {
        let err = RunError::LoopNotConverged { rounds: 8 };
        assert_eq!(err.to_string(), "Tool loop did not converge after 8 round(s)");
    }
}
