use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

const INVALID_TOOL_CALL_NAME: &str = "invalid_tool_call";

/// Convert history into chat-completions messages.
///
/// Tool results become separate `tool` role entries following the message that held them.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut chat = Vec::new();

    for message in messages {
        let mut entry = json!({"role": message.role});
        let mut tool_calls = Vec::new();
        let mut results = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) if !text.is_empty() => entry["content"] = json!(text),
                MessageContent::Text(_) => {}
                MessageContent::ToolRequest(request) => {
                    tool_calls.push(tool_call_entry(&request.id, &request.tool_call))
                }
                MessageContent::ToolResponse(response) => {
                    let content = match &response.tool_result {
                        Ok(value) => tool_content_text(value),
                        Err(e) => format!("The tool call returned the following error:\n{}", e),
                    };
                    results.push(json!({
                        "role": "tool",
                        "tool_call_id": response.id,
                        "content": content,
                    }));
                }
            }
        }

        if !tool_calls.is_empty() {
            entry["tool_calls"] = Value::Array(tool_calls);
        }
        if entry.get("content").is_some() || entry.get("tool_calls").is_some() {
            chat.push(entry);
        }
        chat.extend(results);
    }

    chat
}

fn tool_call_entry(id: &str, tool_call: &AgentResult<ToolCall>) -> Value {
    // A failed request keeps its id so the error result still answers a call
    let (name, arguments) = match tool_call {
        Ok(call) => (sanitize_function_name(&call.name), call.arguments.to_string()),
        Err(_) => (INVALID_TOOL_CALL_NAME.to_string(), "{}".to_string()),
    };
    json!({
        "id": id,
        "type": "function",
        "function": {"name": name, "arguments": arguments},
    })
}

fn tool_content_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Convert tool specs into chat-completions function tools. Names must be unique.
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut seen = HashSet::new();
    tools
        .iter()
        .map(|tool| {
            if !seen.insert(tool.name.as_str()) {
                return Err(anyhow!("Duplicate tool name: {}", tool.name));
            }
            Ok(json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            }))
        })
        .collect()
}

/// Convert a chat-completions response into an assistant message.
///
/// Tool calls the model got wrong (bad function name, undecodable arguments) are kept as
/// failed tool requests so the orchestrator can report the problem back to the model.
pub fn openai_response_to_message(response: Value) -> Result<Message> {
    let reply = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("Response did not contain a message: {}", response))?;

    let mut content = Vec::new();
    if let Some(text) = reply.get("content").and_then(Value::as_str) {
        content.push(MessageContent::text(text));
    }
    if let Some(tool_calls) = reply.get("tool_calls").and_then(Value::as_array) {
        for tool_call in tool_calls {
            let (id, call) = parse_tool_call(tool_call);
            content.push(MessageContent::tool_request(id, call));
        }
    }

    Ok(Message {
        role: Role::Assistant,
        created: chrono::Utc::now().timestamp(),
        content,
    })
}

fn parse_tool_call(tool_call: &Value) -> (String, AgentResult<ToolCall>) {
    let field = |value: &Value| value.as_str().unwrap_or_default().to_string();
    let id = field(&tool_call["id"]);
    let name = field(&tool_call["function"]["name"]);
    let arguments = field(&tool_call["function"]["arguments"]);

    if !is_valid_function_name(&name) {
        return (
            id,
            Err(AgentError::ToolNotFound(format!(
                "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                name
            ))),
        );
    }

    // Models sometimes send an empty string for a call without arguments
    if arguments.trim().is_empty() {
        return (id, Ok(ToolCall::new(&name, json!({}))));
    }
    let call = serde_json::from_str::<Value>(&arguments)
        .map(|params| ToolCall::new(&name, params))
        .map_err(|e| {
            AgentError::InvalidParameters(format!(
                "Could not interpret tool use parameters for id {}: {}",
                id, e
            ))
        });
    (id, call)
}

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex =
        Regex::new(r"[^a-zA-Z0-9_-]").expect("function name pattern compiles");
    static ref VALID_NAME: Regex =
        Regex::new(r"^[a-zA-Z0-9_-]+$").expect("function name pattern compiles");
}

fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}
