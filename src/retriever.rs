use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::llm::EmbeddingProvider;
use crate::vector_db::{KnowledgeRecord, ScoredMatch, rank};

/// Embeds the query once and ranks the knowledge base against it.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Retriever { embedder }
    }

    /// Returns `min(top_k, records.len())` matches, best first. Skips the
    /// embedding call when there is nothing to return.
    pub async fn search<'r>(
        &self,
        query: &str,
        records: &'r [KnowledgeRecord],
        top_k: usize,
    ) -> Result<Vec<ScoredMatch<'r>>> {
        if records.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed(query).await?;
        let matches = rank(&query_vec, records, top_k)?;
        debug!(
            candidates = records.len(),
            returned = matches.len(),
            best = matches.first().map(|m| m.similarity),
            "ranked knowledge base"
        );
        Ok(matches)
    }
}
