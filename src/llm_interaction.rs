use eventsource_stream::{EventStreamError, Eventsource};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};

use crate::agent::AgentEvent;
use crate::config::AgentConfig;
use crate::error::AgentError;

// Structures matching the OpenAI-compatible /chat/completions endpoint

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(ChatRole::Assistant, content)
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, exactly as the model produced them.
    #[serde(default)]
    pub arguments: String,
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize, Debug)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    // Providers report mid-stream failures as an `error` object in place of choices.
    error: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Debug, Default)]
struct Delta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

#[derive(Deserialize, Debug)]
struct ToolCallDelta {
    index: Option<usize>,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Deserialize, Debug)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

/// One complete model turn: the text it produced and the tools it asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantTurn {
    pub fn into_message(self) -> ChatMessage {
        ChatMessage {
            role: ChatRole::Assistant,
            content: (!self.content.is_empty()).then_some(self.content),
            tool_calls: self.tool_calls,
            tool_call_id: None,
        }
    }
}

/// Upper bound on tool calls merged from a single streamed turn.
pub const MAX_STREAMED_TOOL_CALLS: usize = 64;

#[derive(Debug, Default)]
struct ToolCallBuilder {
    id: String,
    name: String,
    arguments: String,
}

/// Merges streamed tool-call fragments by their index.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    calls: Vec<ToolCallBuilder>,
}

impl ToolCallAccumulator {
    fn push(&mut self, position: usize, delta: ToolCallDelta) -> Result<(), AgentError> {
        let index = delta.index.unwrap_or(position);
        if index >= MAX_STREAMED_TOOL_CALLS {
            return Err(AgentError::Stream(format!(
                "tool call index {index} out of range"
            )));
        }
        if self.calls.len() <= index {
            self.calls.resize_with(index + 1, ToolCallBuilder::default);
        }
        let call = &mut self.calls[index];
        if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
            call.id = id;
        }
        if let Some(function) = delta.function {
            if let Some(name) = function.name.filter(|name| !name.is_empty()) {
                call.name = name;
            }
            if let Some(arguments) = function.arguments {
                call.arguments.push_str(&arguments);
            }
        }
        Ok(())
    }

    fn finish(self) -> Vec<ToolCall> {
        self.calls
            .into_iter()
            .enumerate()
            .filter(|(_, call)| !call.name.is_empty())
            .map(|(index, call)| ToolCall {
                id: if call.id.is_empty() {
                    format!("call_{index}")
                } else {
                    call.id
                },
                kind: function_kind(),
                function: FunctionCall {
                    name: call.name,
                    arguments: call.arguments,
                },
            })
            .collect()
    }
}

/// Thin client for one OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            http: Client::new(),
            url: config.chat_completions_url(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        stream: bool,
    ) -> Result<reqwest::Response, AgentError> {
        let request_payload = ChatRequest {
            model: &self.model,
            messages,
            tools,
            stream,
        };

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request_payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %error_body, "chat completions request failed");
            return Err(AgentError::Api {
                status: status.as_u16(),
                body: error_body,
            });
        }

        Ok(response)
    }

    /// Request a whole turn and wait for it.
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<AssistantTurn, AgentError> {
        let response = self.send(messages, tools, false).await?;
        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(AgentError::EmptyResponse)?;

        debug!(
            tool_calls = choice.message.tool_calls.len(),
            "received chat completion"
        );

        Ok(AssistantTurn {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice.message.tool_calls,
        })
    }

    /// Request a turn as a server-sent event stream. Every text fragment is
    /// forwarded to `tx` as [`AgentEvent::TextDelta`] in arrival order; tool
    /// calls are assembled and returned with the full turn.
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    pub async fn complete_streamed(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        tx: &mpsc::Sender<AgentEvent>,
    ) -> Result<AssistantTurn, AgentError> {
        let response = self.send(messages, tools, true).await?;
        let status = response.status().as_u16();

        let mut events = response.bytes_stream().eventsource();
        let mut content = String::new();
        let mut tool_calls = ToolCallAccumulator::default();

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(EventStreamError::Transport(e)) => return Err(e.into()),
                Err(e) => return Err(AgentError::Stream(e.to_string())),
            };
            if event.data == "[DONE]" {
                break;
            }

            let chunk: StreamChunk = serde_json::from_str(&event.data).map_err(|e| {
                warn!(data = %event.data, error = %e, "failed to parse stream chunk");
                e
            })?;

            if let Some(error) = chunk.error {
                error!(%error, "chat completions stream reported an error");
                let status = error
                    .get("code")
                    .and_then(serde_json::Value::as_u64)
                    .and_then(|code| u16::try_from(code).ok())
                    .unwrap_or(status);
                return Err(AgentError::Api {
                    status,
                    body: event.data,
                });
            }

            for choice in chunk.choices {
                if let Some(text) = choice.delta.content.filter(|text| !text.is_empty()) {
                    content.push_str(&text);
                    let _ = tx.send(AgentEvent::TextDelta(text)).await;
                }
                for (position, delta) in choice.delta.tool_calls.into_iter().enumerate() {
                    tool_calls.push(position, delta)?;
                }
            }
        }

        let tool_calls = tool_calls.finish();
        debug!(tool_calls = tool_calls.len(), "chat completion stream ended");

        Ok(AssistantTurn {
            content,
            tool_calls,
        })
    }
}
