use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::history::{self, ConversationTurn};
use crate::llm::{ChatMessage, CompletionProvider};

const REFINE_SYSTEM_PROMPT: &str = "Refine the user's query into a single, standalone search query based on history. \
Include any context from the history the query depends on. \
Reply with the query only, without explanation or quotes.";

/// Rewrites follow-up questions into standalone search queries.
#[derive(Clone)]
pub struct QueryRefiner {
    completion: Arc<dyn CompletionProvider>,
    max_turns: usize,
}

impl QueryRefiner {
    pub fn new(completion: Arc<dyn CompletionProvider>, max_turns: usize) -> Self {
        QueryRefiner {
            completion,
            max_turns,
        }
    }

    /// Returns `query` untouched when there is no history. Otherwise asks
    /// the model for a standalone query using the last `max_turns` turns.
    pub async fn refine(&self, query: &str, history: &[ConversationTurn]) -> Result<String> {
        if history.is_empty() {
            return Ok(query.to_string());
        }

        let recent = history::window(history, self.max_turns);
        let user_content = format!(
            "HISTORY:\n{}\n\nQUERY:\n{}\n\nREFINED QUERY:",
            history::transcript(recent),
            query
        );
        let messages = [
            ChatMessage::system(REFINE_SYSTEM_PROMPT),
            ChatMessage::user(user_content),
        ];
        let refined = self.completion.complete(&messages).await?;
        let refined = refined.trim();
        if refined.is_empty() {
            return Ok(query.to_string());
        }
        debug!(original = query, refined, "refined query");
        Ok(refined.to_string())
    }
}
