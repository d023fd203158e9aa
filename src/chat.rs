//! Per-action chat handling shared by the web page and the terminal.
//!
//! Session state goes in, updated session state comes out. Nothing here is
//! held between calls.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::agent::{stream_answer_with, Agent, AgentEvent};
use crate::error::AgentError;
use crate::transcript::{Message, Role, Transcript};

pub const APOLOGY_PREFIX: &str = "Sorry, I encountered an error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ExamplePrompt {
    pub label: &'static str,
    pub prompt: &'static str,
}

/// Canned questions offered while the transcript is empty.
pub const EXAMPLE_PROMPTS: [ExamplePrompt; 4] = [
    ExamplePrompt {
        label: "🎯 Managing tantrums",
        prompt: "What to do if someone is throwing tantrums?",
    },
    ExamplePrompt {
        label: "🗣️ Communication tips",
        prompt: "How can I improve communication?",
    },
    ExamplePrompt {
        label: "😴 Sleep routines",
        prompt: "How can I establish a good sleep routine?",
    },
    ExamplePrompt {
        label: "🍽️ Mealtime strategies",
        prompt: "What are good mealtime strategies?",
    },
];

/// State of one interactive session.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ChatSession {
    pub transcript: Transcript,
    pub streaming: bool,
}

/// Everything a user can do on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    /// Ask a question and wait for the answer.
    Submit(String),
    /// Queue one of [`EXAMPLE_PROMPTS`] as a user message without answering it.
    Example(usize),
    Clear,
    SetStreaming(bool),
}

pub fn apology(error: &impl Display) -> String {
    format!("{APOLOGY_PREFIX}{error}")
}

/// Ask the agent in streaming or whole-answer mode. Errors are returned to
/// the caller untouched.
pub async fn ask(
    agent: &Agent,
    history: &[Message],
    prompt: &str,
    streaming: bool,
) -> Result<String, AgentError> {
    ask_with(agent, history, prompt, streaming, |_| {}).await
}

/// [`ask`], with stream events passed to `on_event` as they arrive. In
/// whole-answer mode no events are reported.
pub async fn ask_with<F>(
    agent: &Agent,
    history: &[Message],
    prompt: &str,
    streaming: bool,
    on_event: F,
) -> Result<String, AgentError>
where
    F: FnMut(&AgentEvent),
{
    if streaming {
        stream_answer_with(agent, history, prompt, on_event).await
    } else {
        agent.run(history, prompt).await
    }
}

/// Messages before the one just appended.
pub fn history_before_last(transcript: &Transcript) -> &[Message] {
    let messages = transcript.messages();
    &messages[..messages.len().saturating_sub(1)]
}

/// Append the outcome of a turn as the assistant's message. A failure is
/// recorded as an apology so the session carries on.
pub fn record_answer(session: &mut ChatSession, result: Result<String, AgentError>) -> String {
    let content = match result {
        Ok(answer) => answer,
        Err(e) => {
            warn!(error = %e, "answer retrieval failed");
            apology(&e)
        }
    };
    session.transcript.append(Role::Assistant, content.clone());
    content
}

pub async fn handle_action(agent: &Agent, session: ChatSession, action: ChatAction) -> ChatSession {
    handle_action_with(agent, session, action, |_| {}).await
}

/// [`handle_action`], with stream events of a submitted question passed to
/// `on_event`.
pub async fn handle_action_with<F>(
    agent: &Agent,
    mut session: ChatSession,
    action: ChatAction,
    on_event: F,
) -> ChatSession
where
    F: FnMut(&AgentEvent),
{
    match action {
        ChatAction::Submit(prompt) => {
            if prompt.trim().is_empty() {
                return session;
            }
            info!(streaming = session.streaming, "answering question");
            session.transcript.append(Role::User, prompt.as_str());
            let history = history_before_last(&session.transcript);
            let result = ask_with(agent, history, &prompt, session.streaming, on_event).await;
            record_answer(&mut session, result);
        }
        ChatAction::Example(index) => match EXAMPLE_PROMPTS.get(index) {
            Some(example) => session.transcript.append(Role::User, example.prompt),
            None => warn!(index, "unknown example prompt"),
        },
        ChatAction::Clear => session.transcript.clear(),
        ChatAction::SetStreaming(streaming) => session.streaming = streaming,
    }
    session
}

/// Interactive chat on stdin/stdout. Ends on EOF or `/quit`.
pub async fn run_terminal_chat(agent: &Agent, streaming: bool) -> Result<()> {
    let mut session = ChatSession {
        streaming,
        ..ChatSession::default()
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("💙 {} (type /clear to reset, /quit to leave)", agent.config().name);
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        match prompt {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session = handle_action(agent, session, ChatAction::Clear).await;
                println!("(history cleared)");
                continue;
            }
            _ => {}
        }

        // Fragments are printed as they arrive; the recorded answer is only
        // printed when it differs from them (whole-answer mode or an apology).
        let mut streamed = String::new();
        session = handle_action_with(agent, session, ChatAction::Submit(prompt.to_string()), |event| {
            match event {
                AgentEvent::TextDelta(text) => {
                    print!("{text}");
                    let _ = std::io::stdout().flush();
                    streamed.push_str(text);
                }
                AgentEvent::ToolCalled { name, .. } => eprintln!("[using {name}]"),
            }
        })
        .await;
        if !streamed.is_empty() {
            println!();
        }
        if let Some(answer) = session.transcript.last() {
            if answer.content() != streamed {
                println!("{}", answer.content());
            }
        }
    }

    info!(messages = session.transcript.len(), "chat session finished");
    Ok(())
}
