use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::utils::{
    check_openai_context_length_error, messages_to_openai_spec, openai_response_to_message,
    tools_to_openai_spec,
};
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Chat completions over any OpenAI-compatible endpoint
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

fn token_count(usage: &Value, key: &str) -> Option<i32> {
    usage.get(key)?.as_i64().map(|v| v as i32)
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        // The orchestrator applies its own per-call timeout; this only bounds stuck sockets
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self { client, config })
    }

    /// Token accounting. A missing total is derived from its parts.
    fn usage_of(response: &Value) -> Usage {
        let Some(usage) = response.get("usage") else {
            return Usage::default();
        };
        let input = token_count(usage, "prompt_tokens");
        let output = token_count(usage, "completion_tokens");
        let total = token_count(usage, "total_tokens").or(match (input, output) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });
        Usage::new(input, output, total)
    }

    fn build_payload(&self, system: &str, messages: &[Message], tools: &[Tool]) -> Result<Value> {
        let mut chat = vec![json!({"role": "system", "content": system})];
        chat.extend(messages_to_openai_spec(messages));

        let mut payload = json!({
            "model": self.config.model,
            "messages": chat,
        });
        if !tools.is_empty() {
            payload["tools"] = Value::Array(tools_to_openai_spec(tools)?);
        }
        if let Some(temperature) = self.config.temperature {
            payload["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }
        Ok(payload)
    }

    async fn post(&self, payload: &Value) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(anyhow!("Server error: {}", status));
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%status, body = %body, "chat completion rejected");
        Err(anyhow!("Request failed: {}", status))
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let payload = self.build_payload(system, messages, tools)?;
        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "requesting chat completion"
        );
        let response = self.post(&payload).await?;

        if let Some(error) = response.get("error") {
            if let Some(err) = check_openai_context_length_error(error) {
                return Err(err.into());
            }
            return Err(anyhow!("Chat completion error: {}", error));
        }

        let usage = Self::usage_of(&response);
        let message = openai_response_to_message(response)?;
        Ok((message, usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A chat completion carrying one assistant message
    fn completion(message: Value, usage: Option<Value>) -> Value {
        let mut body = json!({"choices": [{"index": 0, "message": message}]});
        if let Some(usage) = usage {
            body["usage"] = usage;
        }
        body
    }

    async fn answering(status: u16, body: Value) -> (MockServer, OpenAiProvider) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test_api_key"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(OpenAiProviderConfig {
            host: server.uri(),
            ..OpenAiProviderConfig::new("test_api_key")
        })
        .unwrap();
        (server, provider)
    }

    fn greeting() -> Vec<Message> {
        vec![Message::user().with_text("hi")]
    }

    #[tokio::test]
    async fn test_text_reply_and_usage() -> Result<()> {
        let (_server, provider) = answering(
            200,
            completion(
                json!({"role": "assistant", "content": "How can I help?"}),
                Some(json!({"prompt_tokens": 12, "completion_tokens": 15, "total_tokens": 27})),
            ),
        )
        .await;

        let (message, usage) = provider.complete("system", &greeting(), &[]).await?;
        assert_eq!(message.text(), "How can I help?");
        assert!(!message.has_tool_requests());
        assert_eq!(usage, Usage::new(Some(12), Some(15), Some(27)));
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_request_with_derived_total() -> Result<()> {
        let (_server, provider) = answering(
            200,
            completion(
                json!({
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {"name": "reset_password", "arguments": "{\"user_id\":\"\"}"}
                    }]
                }),
                Some(json!({"prompt_tokens": 20, "completion_tokens": 15})),
            ),
        )
        .await;

        let (message, usage) = provider
            .complete("system", &[Message::user().with_text("reset my password")], &[])
            .await?;

        let requests = message.tool_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, "call_123");
        let call = requests[0].tool_call.as_ref().unwrap();
        assert_eq!(call.name, "reset_password");
        assert_eq!(call.arguments, json!({"user_id": ""}));
        assert_eq!(usage.total_tokens, Some(35));
        Ok(())
    }

    #[tokio::test]
    async fn test_payload_includes_system_prompt_and_tools() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-4-turbo",
                "messages": [{"role": "system", "content": "be brief"}],
                "tools": [{"type": "function", "function": {"name": "reset_password"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                json!({"role": "assistant", "content": "ok"}),
                None,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(OpenAiProviderConfig {
            host: server.uri(),
            ..OpenAiProviderConfig::new("test_api_key")
        })?;
        let tool = Tool::new("reset_password", "Reset", json!({"type": "object"}));
        let (message, usage) = provider.complete("be brief", &greeting(), &[tool]).await?;
        assert_eq!(message.text(), "ok");
        assert_eq!(usage, Usage::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let (_server, provider) = answering(503, json!({})).await;
        let err = provider.complete("system", &greeting(), &[]).await.unwrap_err();
        assert!(err.to_string().contains("Server error"));

        let (_server, provider) = answering(400, json!({"error": "bad model"})).await;
        let err = provider.complete("system", &greeting(), &[]).await.unwrap_err();
        assert!(err.to_string().starts_with("Request failed: 400"));
        assert!(!err.to_string().contains("bad model"));
    }

    #[tokio::test]
    async fn test_context_length_error() {
        let (_server, provider) = answering(
            200,
            json!({"error": {"code": "context_length_exceeded", "message": "too long"}}),
        )
        .await;
        let err = provider.complete("system", &greeting(), &[]).await.unwrap_err();
        assert!(err.to_string().contains("Context length exceeded"));
    }
}
