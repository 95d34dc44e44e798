use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    // The web front-end labels model turns "bot".
    #[serde(alias = "bot")]
    Assistant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Append-only chat turns for a single invocation.
#[derive(Debug, Clone, Default)]
pub struct MessageBuffer {
    messages: Vec<ChatMessage>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(history: impl IntoIterator<Item = ChatMessage>) -> Self {
        Self {
            messages: history.into_iter().collect(),
        }
    }

    pub fn add(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(role, content));
    }

    pub fn all(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Message bodies, one per line, in insertion order.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
