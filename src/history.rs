//! Conversation turns and the sliding windows applied to them.
//!
//! Nothing is stored here. Callers own the history, pass it into every
//! call, and append the new exchange once an answer comes back.

use serde::{Deserialize, Serialize};

use crate::llm::{ChatMessage, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }

    fn speaker(&self) -> &'static str {
        match self.role {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

impl From<&ConversationTurn> for ChatMessage {
    fn from(turn: &ConversationTurn) -> Self {
        let role = match turn.role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        };
        ChatMessage {
            role,
            content: turn.content.clone(),
        }
    }
}

/// The most recent `max` turns, oldest first.
pub fn window(history: &[ConversationTurn], max: usize) -> &[ConversationTurn] {
    let start = history.len().saturating_sub(max);
    &history[start..]
}

/// Renders turns as `Role: content` lines.
pub fn transcript(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.speaker(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Appends one finished exchange.
pub fn record_exchange(
    history: &mut Vec<ConversationTurn>,
    question: impl Into<String>,
    answer: impl Into<String>,
) {
    history.push(ConversationTurn::user(question));
    history.push(ConversationTurn::assistant(answer));
}
