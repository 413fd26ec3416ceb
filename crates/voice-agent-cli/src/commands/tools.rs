use anyhow::Result;
use console::style;
use serde_json::Value;
use voice_agent::models::message::{Message, MessageContent};
use voice_agent::models::role::Role;

use super::build_agent;
use crate::configuration::Settings;

const MASK: &str = "********";
const SECRET_FIELDS: [&str; 1] = ["temporary_password"];

/// Run the agent and print every entry of the conversation, including tool traffic
pub async fn execute(settings: &Settings, text: &str) -> Result<()> {
    let agent = build_agent(settings)?;
    println!("{}", style("Available tools:").bold());
    for tool in agent.tools() {
        println!("  {} {}", style(&tool.name).cyan(), style(&tool.description).dim());
    }
    println!();

    let reply = agent.run(text).await?;
    for message in &reply.messages {
        for line in describe_message(message) {
            println!("{}", line);
        }
    }
    println!(
        "\n{}",
        style(format!("{} round(s), {} message(s)", reply.rounds, reply.messages.len())).dim()
    );
    Ok(())
}

/// One display line per content item
pub fn describe_message(message: &Message) -> Vec<String> {
    let speaker = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };

    message
        .content
        .iter()
        .map(|content| match content {
            MessageContent::Text(text) => format!("{}: {}", speaker, text),
            MessageContent::ToolRequest(request) => match &request.tool_call {
                Ok(call) => format!(
                    "{} -> {}({}) [{}]",
                    speaker,
                    call.name,
                    mask_secrets(&call.arguments),
                    request.id
                ),
                Err(err) => format!("{} -> invalid tool call [{}]: {}", speaker, request.id, err),
            },
            MessageContent::ToolResponse(response) => match &response.tool_result {
                Ok(value) => format!("tool [{}] <- {}", response.id, mask_secrets(value)),
                Err(err) => format!("tool [{}] <- error: {}", response.id, err),
            },
        })
        .collect()
}

/// Copy of a tool payload with secret fields replaced
pub fn mask_secrets(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let masked = if SECRET_FIELDS.contains(&key.as_str()) && value.is_string() {
                        Value::String(MASK.to_string())
                    } else {
                        mask_secrets(value)
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(mask_secrets).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use voice_agent::errors::AgentError;
    use voice_agent::models::tool::ToolCall;

    #[test]
    fn test_mask_secrets() {
        let value = json!({
            "success": true,
            "message": "Password reset successful.",
            "temporary_password": "aB3$xY9!qW2@",
            "nested": [{"temporary_password": "zz"}]
        });
        let masked = mask_secrets(&value);
        assert_eq!(masked["temporary_password"], json!(MASK));
        assert_eq!(masked["nested"][0]["temporary_password"], json!(MASK));
        assert_eq!(masked["success"], json!(true));
        assert!(!masked.to_string().contains("aB3$xY9!qW2@"));
    }

    #[test]
    fn test_describe_message() {
        let request = Message::assistant()
            .with_text("One moment.")
            .with_tool_request("call_1", Ok(ToolCall::new("reset_password", json!({}))));
        assert_eq!(
            describe_message(&request),
            vec![
                "assistant: One moment.".to_string(),
                "assistant -> reset_password({}) [call_1]".to_string(),
            ]
        );

        let result = Message::user().with_tool_response(
            "call_1",
            Ok(json!({"success": true, "temporary_password": "secret123456"})),
        );
        let lines = describe_message(&result);
        assert!(lines[0].starts_with("tool [call_1] <- "));
        assert!(!lines[0].contains("secret123456"));

        let failed = Message::user()
            .with_tool_response("call_2", Err(AgentError::ToolNotFound("x".to_string())));
        assert_eq!(
            describe_message(&failed),
            vec!["tool [call_2] <- error: Tool not found: x".to_string()]
        );
    }
}
