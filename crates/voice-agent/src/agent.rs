use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::errors::{AgentError, RunError};
use crate::models::message::{Message, ToolRequest};
use crate::models::tool::{Tool, ToolOutcome};
use crate::prompt_template::{load_prompt, SYSTEM_PROMPT};
use crate::providers::base::Provider;
use crate::tools::ToolRegistry;

pub const DEFAULT_AGENT_NAME: &str = "Voice Assistant";

/// Limits and retry policy for a run
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Name the agent introduces itself with in the system prompt
    pub name: String,
    /// Model calls allowed per run before the tool loop counts as stuck
    pub max_rounds: u32,
    /// Total attempts for one model call, including the first
    pub max_attempts: u32,
    /// Base delay before a retry, doubled for each further attempt
    pub retry_delay: Duration,
    pub call_timeout: Duration,
    pub tool_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_AGENT_NAME.to_string(),
            max_rounds: 8,
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
            call_timeout: Duration::from_secs(10),
            tool_timeout: Duration::from_secs(10),
        }
    }
}

/// The outcome of a successful run
#[derive(Debug, Clone)]
pub struct Reply {
    /// Text of the final assistant message
    pub text: String,
    /// Full history of the run, starting with the user's message
    pub messages: Vec<Message>,
    /// Number of model calls it took
    pub rounds: u32,
}

/// Agent drives a conversation with the model through tool calls to a final answer
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
    tools: Vec<Tool>,
    system_prompt: String,
}

impl Agent {
    /// Create a new Agent. The registry is shared read-only with any other agents.
    pub fn new(
        provider: Box<dyn Provider>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Result<Self, RunError> {
        let tools = registry.tools();
        let context = json!({
            "name": config.name,
            "tools": tools,
        });
        let system_prompt =
            load_prompt(SYSTEM_PROMPT, &context).map_err(|e| RunError::Prompt(e.to_string()))?;

        Ok(Self {
            provider,
            registry,
            config,
            tools,
            system_prompt,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Answer one user utterance, calling tools as the model requests them.
    ///
    /// The conversation lives only for the duration of the call. Each round's tool results
    /// are committed together once every call in the round has resolved.
    pub async fn run(&self, user_text: &str) -> Result<Reply, RunError> {
        if user_text.trim().is_empty() {
            return Err(RunError::Validation("Input cannot be empty".to_string()));
        }

        let span = tracing::info_span!(
            "agent_run",
            run_id = %Uuid::new_v4(),
            agent = %self.config.name
        );
        self.run_rounds(user_text).instrument(span).await
    }

    async fn run_rounds(&self, user_text: &str) -> Result<Reply, RunError> {
        let mut messages = vec![Message::user().with_text(user_text)];
        let mut round = 0;

        loop {
            round += 1;
            let response = self.complete_with_retry(&messages, round).await?;
            let requests: Vec<ToolRequest> =
                response.tool_requests().into_iter().cloned().collect();
            messages.push(response);

            if requests.is_empty() {
                let text = messages.last().map(Message::text).unwrap_or_default();
                tracing::info!(rounds = round, "run complete");
                return Ok(Reply {
                    text,
                    messages,
                    rounds: round,
                });
            }

            if round >= self.config.max_rounds {
                tracing::error!(
                    rounds = round,
                    pending = requests.len(),
                    "model is still requesting tools at the round limit"
                );
                return Err(RunError::LoopNotConverged { rounds: round });
            }

            let results = self.dispatch_round(&requests, round).await;
            messages.extend(results);
        }
    }

    /// Call the model, retrying transport failures and timeouts with exponential backoff
    async fn complete_with_retry(
        &self,
        messages: &[Message],
        round: u32,
    ) -> Result<Message, RunError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!(round, attempt, messages = messages.len(), "calling model");

            let call = self
                .provider
                .complete(&self.system_prompt, messages, &self.tools);
            let reason = match tokio::time::timeout(self.config.call_timeout, call).await {
                Ok(Ok((message, usage))) => {
                    tracing::debug!(
                        round,
                        input_tokens = ?usage.input_tokens,
                        output_tokens = ?usage.output_tokens,
                        "model responded"
                    );
                    return Ok(message);
                }
                Ok(Err(err)) => format!("{:#}", err),
                Err(_) => format!("timed out after {:?}", self.config.call_timeout),
            };

            if attempt >= max_attempts {
                tracing::error!(round, attempts = attempt, error = %reason, "model call failed");
                return Err(RunError::Transport {
                    attempts: attempt,
                    reason,
                });
            }

            let delay = self.backoff(attempt);
            tracing::warn!(
                round,
                attempt,
                error = %reason,
                retry_in_ms = delay.as_millis() as u64,
                "model call failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.config.retry_delay.saturating_mul(factor)
    }

    /// Resolve every request in emission order. One result message per request.
    async fn dispatch_round(&self, requests: &[ToolRequest], round: u32) -> Vec<Message> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let outcome = self.dispatch_tool_call(request, round).await;
            results.push(Message::user().with_tool_response(request.id.clone(), outcome));
        }
        results
    }

    async fn dispatch_tool_call(&self, request: &ToolRequest, round: u32) -> ToolOutcome {
        let call = match &request.tool_call {
            Ok(call) => call,
            Err(err) => {
                tracing::warn!(round, id = %request.id, error = %err, "malformed tool call");
                return Err(err.clone());
            }
        };

        if !self.registry.contains(&call.name) {
            tracing::warn!(round, tool = %call.name, "model requested an unknown tool");
            return Err(AgentError::ToolNotFound(call.name.clone()));
        }

        tracing::info!(round, tool = %call.name, id = %request.id, "invoking tool");
        let invocation = self.registry.invoke(&call.name, call.arguments.clone());
        match tokio::time::timeout(self.config.tool_timeout, invocation).await {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(err)) => {
                tracing::warn!(round, tool = %call.name, error = %err, "tool call failed");
                Err(err)
            }
            Err(_) => {
                tracing::warn!(round, tool = %call.name, "tool call timed out");
                Err(AgentError::ExecutionError(format!(
                    "{} did not finish within {:?}",
                    call.name, self.config.tool_timeout
                )))
            }
        }
    }
}
