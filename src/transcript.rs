use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry of the conversation. Never mutated once pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Append-only message log for a single chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_new() {
        let transcript = Transcript::new();
        assert_eq!(transcript.len(), 0);
        assert!(transcript.is_empty());
        assert!(transcript.last().is_none());
    }

    #[test]
    fn test_append_preserves_order() {
        let mut transcript = Transcript::new();
        transcript.append(Role::User, "Hello");
        transcript.append(Role::Assistant, "Hi there!");
        let before = transcript.messages().to_vec();

        transcript.append(Role::User, "How are you?");

        assert_eq!(transcript.len(), 3);
        assert_eq!(&transcript.messages()[..2], before.as_slice());
        assert_eq!(transcript.messages()[0].role(), Role::User);
        assert_eq!(transcript.messages()[0].content(), "Hello");
        assert_eq!(transcript.messages()[1].role(), Role::Assistant);
        assert_eq!(transcript.messages()[1].content(), "Hi there!");
        assert_eq!(transcript.last().map(Message::content), Some("How are you?"));
    }

    #[test]
    fn test_append_accepts_empty_content() {
        let mut transcript = Transcript::new();
        transcript.append(Role::User, "");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].content(), "");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut transcript = Transcript::new();
        for i in 0..50 {
            transcript.append(Role::User, format!("message {i}"));
        }

        transcript.clear();
        assert!(transcript.is_empty());

        transcript.clear();
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_message_serializes_lowercase_role() {
        let message = Message::new(Role::Assistant, "ok");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value, serde_json::json!({"role": "assistant", "content": "ok"}));
    }
}
