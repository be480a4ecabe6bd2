use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("knowledge base not found at {}; run `llm-vault ingest <dir>` first", .path.display())]
    NotFound { path: PathBuf },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("embedding dimension mismatch: knowledge base uses {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid knowledge base: {0}")]
    InvalidKnowledgeBase(String),

    #[error("extraction failed: {0}")]
    Extract(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    pub fn provider(msg: impl Into<String>) -> Self {
        VaultError::Provider(msg.into())
    }
}
