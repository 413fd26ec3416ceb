use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::registry::ToolHandler;
use crate::errors::AgentError;
use crate::models::tool::{Tool, ToolOutcome};

pub const RESET_PASSWORD_TOOL: &str = "reset_password";

/// Length of every generated temporary password
pub const TEMP_PASSWORD_LENGTH: usize = 12;

/// Characters a temporary password is drawn from
pub const TEMP_PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

pub const RESET_SUCCESS_MESSAGE: &str =
    "Password reset successful. Please use the temporary password to login.";

const MAX_USER_ID_LENGTH: usize = 256;

/// Outcome of a password reset. `success` is true exactly when a temporary password is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordResetResult {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temporary_password: Option<String>,
}

impl PasswordResetResult {
    pub fn success<S: Into<String>>(temporary_password: S) -> Self {
        Self {
            success: true,
            message: RESET_SUCCESS_MESSAGE.to_string(),
            temporary_password: Some(temporary_password.into()),
        }
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            message: message.into(),
            temporary_password: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn temporary_password(&self) -> Option<&str> {
        self.temporary_password.as_deref()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResetArguments {
    #[serde(default)]
    user_id: Option<String>,
}

/// Mock password reset backend. No identity verification is performed.
#[derive(Debug, Clone)]
pub struct PasswordResetTool {
    min_latency: Duration,
    max_latency: Duration,
}

impl Default for PasswordResetTool {
    fn default() -> Self {
        Self::new(Duration::from_millis(200), Duration::from_millis(500))
    }
}

impl PasswordResetTool {
    /// Create a tool whose simulated backend latency is drawn uniformly from the window
    pub fn new(min_latency: Duration, max_latency: Duration) -> Self {
        let (min_latency, max_latency) = if min_latency <= max_latency {
            (min_latency, max_latency)
        } else {
            (max_latency, min_latency)
        };
        Self {
            min_latency,
            max_latency,
        }
    }

    /// A tool that answers immediately
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn latency_window(&self) -> (Duration, Duration) {
        (self.min_latency, self.max_latency)
    }

    /// Reset the password for a user identifier, which may be empty
    pub async fn reset(&self, user_id: &str) -> PasswordResetResult {
        let delay = rand::thread_rng().gen_range(self.min_latency..=self.max_latency);
        tokio::time::sleep(delay).await;

        if user_id.len() > MAX_USER_ID_LENGTH || user_id.chars().any(char::is_control) {
            tracing::warn!("rejecting malformed user identifier");
            return PasswordResetResult::error("The user identifier is not valid.");
        }

        tracing::info!(
            user_id_len = user_id.len(),
            delay_ms = delay.as_millis() as u64,
            "temporary password issued"
        );
        PasswordResetResult::success(generate_temporary_password())
    }
}

/// Draw a temporary password from the operating system's CSPRNG
pub fn generate_temporary_password() -> String {
    let mut rng = OsRng;
    (0..TEMP_PASSWORD_LENGTH)
        .map(|_| TEMP_PASSWORD_CHARSET[rng.gen_range(0..TEMP_PASSWORD_CHARSET.len())] as char)
        .collect()
}

fn parse_arguments(arguments: Value) -> Result<ResetArguments, AgentError> {
    if arguments.is_null() {
        return Ok(ResetArguments::default());
    }
    serde_json::from_value(arguments).map_err(|e| {
        AgentError::InvalidParameters(format!(
            "{} expects {{\"user_id\": string}}: {}",
            RESET_PASSWORD_TOOL, e
        ))
    })
}

#[async_trait]
impl ToolHandler for PasswordResetTool {
    fn spec(&self) -> Tool {
        Tool::new(
            RESET_PASSWORD_TOOL,
            "Reset the user's password and issue a temporary password they can use to log in.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "Identifier of the user whose password should be reset. May be empty."
                    }
                },
                "additionalProperties": false
            }),
        )
    }

    async fn call(&self, arguments: Value) -> ToolOutcome {
        let args = parse_arguments(arguments)?;
        let result = self.reset(args.user_id.as_deref().unwrap_or_default()).await;
        serde_json::to_value(&result).map_err(|e| AgentError::Internal(e.to_string()))
    }
}
