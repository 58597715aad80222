use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub message: String,
}

/// Ordered chat history for one conversation. Process-local, never
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub(crate) fn push(&mut self, role: Role, message: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            message: message.into(),
        });
    }

    /// Drops a trailing user turn that never got an answer.
    pub(crate) fn discard_pending_question(&mut self) {
        if matches!(self.turns.last(), Some(turn) if turn.role == Role::User) {
            self.turns.pop();
        }
    }
}
