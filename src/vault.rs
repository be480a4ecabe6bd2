//! Answer orchestration: refine, search, decide, respond.
//!
//! Every answer walks `REFINE -> SEARCH -> DECIDE -> {GROUNDED | FALLBACK} -> RESPOND`.
//! The gate sends the question down the grounded path only when the best
//! match clears the similarity threshold; otherwise the model answers as a
//! general assistant with no knowledge-base context. An empty knowledge base
//! skips the gate and falls back directly with the original question.
//!
//! Each step depends on the previous one, so the (at most three) provider
//! calls run strictly in sequence. Provider failures abort the whole answer.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::VaultConfig;
use crate::error::Result;
use crate::gap::GapAnalyzer;
use crate::history::{self, ConversationTurn};
use crate::llm::{ChatMessage, CompletionProvider, EmbeddingProvider};
use crate::refiner::QueryRefiner;
use crate::retriever::Retriever;
use crate::vector_db::{KnowledgeBase, KnowledgeRecord, ScoredMatch};

pub(crate) const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

const GROUNDED_SYSTEM_PROMPT: &str = "You are an expert resume assistant. Answer the question using only the provided context. \
If the context does not contain the answer, say explicitly that the information is not in the knowledge base.";

const FALLBACK_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    Grounded,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Records given to the model as context, in ranked order. Empty on
    /// the fallback path.
    pub used_context: Vec<KnowledgeRecord>,
    pub mode: AnswerMode,
}

/// Retrieval tuning for the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct AnswerSettings {
    pub top_k: usize,
    pub sim_threshold: f32,
    pub history_window: usize,
}

impl From<&VaultConfig> for AnswerSettings {
    fn from(config: &VaultConfig) -> Self {
        AnswerSettings {
            top_k: config.top_k,
            sim_threshold: config.sim_threshold,
            history_window: config.history_window,
        }
    }
}

pub struct Vault {
    kb: Arc<KnowledgeBase>,
    retriever: Retriever,
    refiner: QueryRefiner,
    gap: GapAnalyzer,
    completion: Arc<dyn CompletionProvider>,
    settings: AnswerSettings,
}

impl Vault {
    pub fn new(
        kb: Arc<KnowledgeBase>,
        embedder: Arc<dyn EmbeddingProvider>,
        completion: Arc<dyn CompletionProvider>,
        config: &VaultConfig,
    ) -> Self {
        let retriever = Retriever::new(embedder);
        Vault {
            kb,
            refiner: QueryRefiner::new(Arc::clone(&completion), config.refine_window),
            gap: GapAnalyzer::new(retriever.clone(), Arc::clone(&completion), config.gap_top_k),
            retriever,
            completion,
            settings: AnswerSettings::from(config),
        }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// Answers `question` in the context of the caller's `history`.
    ///
    /// Only the last `history_window` turns are used. The caller appends
    /// the new exchange to its own history afterwards.
    pub async fn answer(&self, question: &str, history: &[ConversationTurn]) -> Result<Answer> {
        let records = self.kb.load().await?;
        let history = history::window(history, self.settings.history_window);

        let refined = self.refiner.refine(question, history).await?;
        let matches = self
            .retriever
            .search(&refined, &records, self.settings.top_k)
            .await?;

        let (system, user, used_context, mode) = match matches.first() {
            None => {
                info!("knowledge base is empty, answering without context");
                fallback(question)
            }
            Some(best) if best.similarity >= self.settings.sim_threshold => {
                info!(
                    best = best.similarity,
                    threshold = self.settings.sim_threshold,
                    "grounded answer"
                );
                grounded(question, &matches)
            }
            Some(best) => {
                info!(
                    best = best.similarity,
                    threshold = self.settings.sim_threshold,
                    "below threshold, answering without context"
                );
                fallback(question)
            }
        };

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(user));

        let text = self.completion.complete(&messages).await?;
        debug!(chars = text.len(), ?mode, "completion finished");
        Ok(Answer {
            text: text.trim().to_string(),
            used_context,
            mode,
        })
    }

    /// Compares a job description against the knowledge base.
    pub async fn gap_analysis(&self, job_description: &str) -> Result<String> {
        let records = self.kb.load().await?;
        self.gap.analyze(job_description, &records).await
    }
}

type Prompt = (&'static str, String, Vec<KnowledgeRecord>, AnswerMode);

fn grounded(question: &str, matches: &[ScoredMatch<'_>]) -> Prompt {
    let context = render_context(matches);
    let user = format!("CONTEXT:\n{context}\n\nQUESTION:\n{question}");
    let used = matches.iter().map(|m| m.record.clone()).collect();
    (GROUNDED_SYSTEM_PROMPT, user, used, AnswerMode::Grounded)
}

fn fallback(question: &str) -> Prompt {
    (
        FALLBACK_SYSTEM_PROMPT,
        question.to_string(),
        Vec::new(),
        AnswerMode::Fallback,
    )
}

/// Joins match texts in ranked order, each labelled with its source file
/// and score.
pub(crate) fn render_context(matches: &[ScoredMatch<'_>]) -> String {
    matches
        .iter()
        .map(|m| {
            let filename = if m.record.metadata.filename.is_empty() {
                "unknown"
            } else {
                m.record.metadata.filename.as_str()
            };
            format!(
                "SOURCE: {} (Score: {:.2})\n{}",
                filename, m.similarity, m.record.text
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}
