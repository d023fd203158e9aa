//! The answer loop: send the question, run any tools the model asks for,
//! repeat until the model replies with plain text.

use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::llm_interaction::{AssistantTurn, ChatClient, ChatMessage, ToolCall};
use crate::tools::{ReadFolderTool, Toolset};
use crate::transcript::{Message, Role};

/// Progress reported while a streamed answer is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    TextDelta(String),
    ToolCalled { name: String, arguments: String },
}

/// Model identity, credentials, instructions and tools, bundled. Built once
/// and shared by reference.
pub struct Agent {
    config: AgentConfig,
    client: ChatClient,
    tools: Toolset,
}

impl Agent {
    /// An agent exposing the `read_file` tool over the configured docs folder.
    pub fn new(config: AgentConfig) -> Self {
        let tools = Toolset::new().with(ReadFolderTool::new(config.docs_dir.clone()));
        Self::with_tools(config, tools)
    }

    pub fn with_tools(config: AgentConfig, tools: Toolset) -> Self {
        info!(
            name = %config.name,
            model = %config.model,
            tools = ?tools.names(),
            "initialized agent"
        );
        Self {
            client: ChatClient::new(&config),
            config,
            tools,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &Toolset {
        &self.tools
    }

    fn initial_messages(&self, history: &[Message], input: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(&self.config.instructions));
        if self.config.thread_history {
            messages.extend(history.iter().map(|message| match message.role() {
                Role::User => ChatMessage::user(message.content()),
                Role::Assistant => ChatMessage::assistant(message.content()),
            }));
        }
        messages.push(ChatMessage::user(input));
        messages
    }

    /// Answer `input`, waiting for each model turn in full.
    ///
    /// `history` is only sent when the config asks for threaded history.
    #[instrument(skip_all)]
    pub async fn run(&self, history: &[Message], input: &str) -> Result<String, AgentError> {
        let mut messages = self.initial_messages(history, input);
        let definitions = self.tools.definitions();

        for turn in 1..=self.config.max_turns {
            let reply = self.client.complete(&messages, &definitions).await?;
            debug!(turn, tool_calls = reply.tool_calls.len(), "model turn finished");
            if reply.tool_calls.is_empty() {
                return Ok(reply.content);
            }
            self.run_tool_calls(reply, &mut messages, None).await;
        }

        Err(AgentError::MaxTurnsExceeded(self.config.max_turns))
    }

    /// Answer `input` over a streamed connection, reporting every event to
    /// `tx` as it arrives. Dropping the receiver does not stop the run.
    #[instrument(skip_all)]
    pub async fn run_streamed(
        &self,
        history: &[Message],
        input: &str,
        tx: mpsc::Sender<AgentEvent>,
    ) -> Result<(), AgentError> {
        let mut messages = self.initial_messages(history, input);
        let definitions = self.tools.definitions();

        for turn in 1..=self.config.max_turns {
            let reply = self
                .client
                .complete_streamed(&messages, &definitions, &tx)
                .await?;
            debug!(turn, tool_calls = reply.tool_calls.len(), "streamed turn finished");
            if reply.tool_calls.is_empty() {
                return Ok(());
            }
            self.run_tool_calls(reply, &mut messages, Some(&tx)).await;
        }

        Err(AgentError::MaxTurnsExceeded(self.config.max_turns))
    }

    async fn run_tool_calls(
        &self,
        reply: AssistantTurn,
        messages: &mut Vec<ChatMessage>,
        tx: Option<&mpsc::Sender<AgentEvent>>,
    ) {
        let calls: Vec<ToolCall> = reply.tool_calls.clone();
        messages.push(reply.into_message());

        for call in calls {
            let name = call.function.name;
            info!(tool = %name, "model called tool");
            if let Some(tx) = tx {
                let _ = tx
                    .send(AgentEvent::ToolCalled {
                        name: name.clone(),
                        arguments: call.function.arguments.clone(),
                    })
                    .await;
            }

            let output = self.tools.call_for_model(&name, &call.function.arguments).await;
            messages.push(ChatMessage::tool(call.id, output));
        }
    }
}

/// Join a streamed run with a consumer that sees each event in arrival order,
/// and return the concatenated text deltas.
pub async fn stream_answer_with<F>(
    agent: &Agent,
    history: &[Message],
    input: &str,
    mut on_event: F,
) -> Result<String, AgentError>
where
    F: FnMut(&AgentEvent),
{
    let (tx, mut rx) = mpsc::channel(64);

    let producer = agent.run_streamed(history, input, tx);
    let consumer = async {
        let mut answer = String::new();
        while let Some(event) = rx.recv().await {
            on_event(&event);
            if let AgentEvent::TextDelta(text) = event {
                answer.push_str(&text);
            }
        }
        answer
    };

    let (result, answer) = tokio::join!(producer, consumer);
    result.map(|()| answer)
}

/// Streamed answer, deltas concatenated.
pub async fn stream_answer(
    agent: &Agent,
    history: &[Message],
    input: &str,
) -> Result<String, AgentError> {
    stream_answer_with(agent, history, input, |_| {}).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(thread_history: bool) -> Agent {
        let config = AgentConfig::new(Some("key".to_string()))
            .unwrap()
            .with_thread_history(thread_history);
        Agent::new(config)
    }

    #[test]
    fn test_default_agent_exposes_read_file() {
        assert_eq!(agent(false).tools().names(), vec!["read_file"]);
    }

    #[test]
    fn test_history_is_not_sent_by_default() {
        let history = vec![
            Message::new(Role::User, "earlier question"),
            Message::new(Role::Assistant, "earlier answer"),
        ];
        let messages = agent(false).initial_messages(&history, "new question");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system(crate::config::AGENT_INSTRUCTIONS));
        assert_eq!(messages[1], ChatMessage::user("new question"));
    }

    #[test]
    fn test_history_is_threaded_when_enabled() {
        let history = vec![
            Message::new(Role::User, "earlier question"),
            Message::new(Role::Assistant, "earlier answer"),
        ];
        let messages = agent(true).initial_messages(&history, "new question");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1], ChatMessage::user("earlier question"));
        assert_eq!(messages[2], ChatMessage::assistant("earlier answer"));
        assert_eq!(messages[3], ChatMessage::user("new question"));
    }
}
