use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use staywise_core::config::{LlmConfig, LlmProvider};
use tracing::{debug, warn};

use crate::conversation::{Message, Role, ToolCall};
use crate::tools::ToolDefinition;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

/// One model reply: text, tool calls, or both.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), tool_calls: Vec::new() }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            content: None,
            tool_calls: vec![ToolCall { id: id.into(), name: name.into(), arguments }],
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

/// Chat-completions client for OpenAI and for Ollama's OpenAI-compatible
/// endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiCompatClient {
    http: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    max_retries: u32,
}

impl OpenAiCompatClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<SecretString>, model: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http: Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.into(),
            max_retries: 0,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let base_url = match config.provider {
            LlmProvider::OpenAi => {
                config.base_url.clone().unwrap_or_else(|| OPENAI_BASE_URL.to_string())
            }
            LlmProvider::Ollama => {
                let base = config
                    .base_url
                    .as_deref()
                    .context("llm.base_url is required for the ollama provider")?;
                format!("{}/v1", base.trim_end_matches('/'))
            }
        };
        if config.provider == LlmProvider::OpenAi && config.api_key.is_none() {
            bail!("llm.api_key is required for the openai provider");
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build llm http client")?;

        Ok(Self {
            http,
            max_retries: config.max_retries,
            ..Self::new(base_url, config.api_key.clone(), config.model.clone())
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_body(&self, request: &CompletionRequest) -> Value {
        let mut messages = vec![json!({ "role": "system", "content": request.system })];
        messages.extend(request.messages.iter().map(message_to_wire));

        let mut body = json!({ "model": self.model, "messages": messages });
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.iter().map(tool_to_wire).collect());
        }
        body
    }

    async fn send_once(&self, body: &Value) -> Result<Attempt> {
        let mut builder = self.http.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(error) => return Ok(Attempt::Retryable(anyhow!("llm request failed: {error}"))),
        };

        let status = response.status();
        let text = response.text().await.context("failed to read llm response")?;
        if status.is_success() {
            let parsed: Value =
                serde_json::from_str(&text).context("llm response is not valid JSON")?;
            return parse_completion(&parsed).map(Attempt::Done);
        }

        let error = anyhow!("HTTP {} - {}", status.as_u16(), text);
        if status.as_u16() == 429 || status.is_server_error() {
            Ok(Attempt::Retryable(error))
        } else {
            Err(error)
        }
    }
}

enum Attempt {
    Done(Completion),
    Retryable(anyhow::Error),
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let body = self.build_body(request);
        let mut attempt = 0;

        loop {
            debug!(
                event_name = "agent.llm.request",
                endpoint = %self.endpoint,
                model = %self.model,
                messages = request.messages.len(),
                tools = request.tools.len(),
                attempt
            );
            match self.send_once(&body).await? {
                Attempt::Done(completion) => return Ok(completion),
                Attempt::Retryable(error) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(event_name = "agent.llm.retry", attempt, error = %error);
                    tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
                }
                Attempt::Retryable(error) => return Err(error),
            }
        }
    }
}

fn message_to_wire(message: &Message) -> Value {
    match message.role {
        Role::User => json!({ "role": "user", "content": message.content.clone().unwrap_or_default() }),
        Role::Assistant => {
            let mut wire = json!({
                "role": "assistant",
                "content": message.content.as_deref().filter(|content| !content.is_empty()),
            });
            if !message.tool_calls.is_empty() {
                wire["tool_calls"] = Value::Array(
                    message
                        .tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": { "name": call.name, "arguments": call.arguments.to_string() }
                            })
                        })
                        .collect(),
                );
            }
            wire
        }
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id.clone().unwrap_or_default(),
            "content": message.content.clone().unwrap_or_default(),
        }),
    }
}

fn tool_to_wire(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn parse_completion(body: &Value) -> Result<Completion> {
    let message = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .context("llm response has no choices[0].message")?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .map(str::to_string);

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
        .unwrap_or_default();

    Ok(Completion { content, tool_calls })
}

fn parse_tool_call(call: &Value) -> Option<ToolCall> {
    let function = call.get("function")?;
    let name = function.get("name")?.as_str()?.to_string();
    let arguments = match function.get("arguments") {
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::Object(Default::default()))
        }
        Some(Value::Object(object)) => Value::Object(object.clone()),
        _ => Value::Object(Default::default()),
    };
    let id = call
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));

    Some(ToolCall { id, name, arguments })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{message_to_wire, parse_completion};
    use crate::conversation::{Message, ToolCall};

    #[test]
    fn parses_text_and_string_encoded_arguments() {
        let body = json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [
                        { "id": "c1", "type": "function", "function": { "name": "hotel_search", "arguments": "{\"textQuery\":\"Rome\"}" } },
                        { "type": "function", "function": { "name": "ask_question", "arguments": "not json" } }
                    ]
                }
            }]
        });

        let completion = parse_completion(&body).unwrap_or_default();
        assert_eq!(completion.content, None);
        assert_eq!(completion.tool_calls.len(), 2);
        assert_eq!(completion.tool_calls[0].arguments, json!({ "textQuery": "Rome" }));
        assert_eq!(completion.tool_calls[1].arguments, json!({}));
        assert!(completion.tool_calls[1].id.starts_with("call_"));
    }

    #[test]
    fn missing_choices_is_an_error() {
        assert!(parse_completion(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn assistant_tool_calls_use_null_content_and_string_arguments() {
        let message = Message::assistant(
            None,
            vec![ToolCall { id: "c1".to_string(), name: "hotel_search".to_string(), arguments: json!({ "textQuery": "Rome" }) }],
        );
        let wire = message_to_wire(&message);

        assert_eq!(wire["content"], serde_json::Value::Null);
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], "{\"textQuery\":\"Rome\"}");
        assert_eq!(
            message_to_wire(&Message::tool_result("c1", &json!({ "places": [] })))["tool_call_id"],
            "c1"
        );
    }
}
