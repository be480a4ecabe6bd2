//! Retrieval-augmented question answering over a personal knowledge base.
//!
//! A precomputed knowledge base of embedded text chunks is ranked against
//! each question by cosine similarity. Confident matches are handed to the
//! completion model as context; weak ones fall back to an ungrounded answer.
//! Job descriptions can also be compared against the knowledge base to
//! produce a skills gap report.

pub mod config;
pub mod error;
pub mod eval;
pub mod extract;
pub mod gap;
pub mod history;
pub mod ingest;
pub mod llm;
pub mod openai;
pub mod refiner;
pub mod retriever;
pub mod server;
pub mod utils;
pub mod vault;
pub mod vector_db;

#[cfg(test)]
mod testing;

pub use config::VaultConfig;
pub use error::{Result, VaultError};
pub use history::{ConversationTurn, TurnRole};
pub use llm::{ChatMessage, CompletionProvider, EmbeddingProvider, Role};
pub use openai::OpenAiClient;
pub use vault::{Answer, AnswerMode, Vault};
pub use vector_db::{KnowledgeBase, KnowledgeRecord, ScoredMatch};
