use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::llm::{ChatMessage, CompletionProvider};
use crate::retriever::Retriever;
use crate::vault::render_context;
use crate::vector_db::KnowledgeRecord;

pub const NO_RELEVANT_INFORMATION: &str = "I couldn't find any relevant information in the knowledge base \
to compare against this job description. Build the knowledge base from your documents and try again.";

const GAP_SYSTEM_PROMPT: &str = "You are a career analyst comparing a job description against a candidate's background. \
The candidate context below is the only source of truth about the candidate.

Produce a report with exactly these sections:
1. Required skills and responsibilities: the key skills and responsibilities the job description asks for.
2. Matching skills: the candidate's skills that match, drawn only from the candidate context.
3. Missing or weak areas: requirements the context does not support or supports only weakly.
4. Fit score: a single number from 0 to 100.
5. Suggested roles: roles the candidate is well suited for based on the context.

Never invent skills, experience, or qualifications that the candidate context does not support.";

/// Job-description gap analysis. Always retrieves against the raw job
/// description; no refinement, history, or similarity gate.
#[derive(Clone)]
pub struct GapAnalyzer {
    retriever: Retriever,
    completion: Arc<dyn CompletionProvider>,
    top_k: usize,
}

impl GapAnalyzer {
    pub fn new(retriever: Retriever, completion: Arc<dyn CompletionProvider>, top_k: usize) -> Self {
        GapAnalyzer {
            retriever,
            completion,
            top_k,
        }
    }

    /// Returns the model's report verbatim, or [`NO_RELEVANT_INFORMATION`]
    /// without calling the model when retrieval finds nothing.
    pub async fn analyze(&self, job_description: &str, records: &[KnowledgeRecord]) -> Result<String> {
        let matches = self
            .retriever
            .search(job_description, records, self.top_k)
            .await?;
        if matches.is_empty() {
            info!("no candidate context for gap analysis");
            return Ok(NO_RELEVANT_INFORMATION.to_string());
        }
        info!(chunks = matches.len(), "running gap analysis");

        let user = format!(
            "JOB DESCRIPTION:\n{job_description}\n\nCANDIDATE CONTEXT:\n{}",
            render_context(&matches)
        );
        let messages = [ChatMessage::system(GAP_SYSTEM_PROMPT), ChatMessage::user(user)];
        self.completion.complete(&messages).await
    }
}
