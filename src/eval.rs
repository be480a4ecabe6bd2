//! Retrieval evaluation against labelled job descriptions.
//!
//! Each case lists the source files a good retrieval should surface. A case
//! passes when at least one of them shows up among the records the
//! orchestrator actually used as context.

use std::path::Path;

use rustc_hash::FxHashSet;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::vault::Vault;

#[derive(Debug, Clone, Deserialize)]
pub struct EvalCase {
    #[serde(default = "unknown_id")]
    pub id: String,
    #[serde(default)]
    pub jd: String,
    #[serde(default)]
    pub relevant_resumes: Vec<String>,
}

fn unknown_id() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub id: String,
    pub passed: bool,
    pub expected: Vec<String>,
    pub retrieved: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalReport {
    pub outcomes: Vec<CaseOutcome>,
    pub skipped: usize,
}

impl EvalReport {
    pub fn evaluated(&self) -> usize {
        self.outcomes.len()
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    /// Percentage of evaluated cases that passed; `0.0` when none ran.
    pub fn accuracy(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.passed() as f64 * 100.0 / self.evaluated() as f64
    }
}

pub async fn load_cases(path: &Path) -> Result<Vec<EvalCase>> {
    let raw = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Runs every case through [`Vault::answer`] with an empty history.
///
/// Cases without a job description or expectations are skipped. A failed
/// answer counts as a miss with nothing retrieved.
pub async fn run(vault: &Vault, cases: &[EvalCase]) -> EvalReport {
    let mut report = EvalReport::default();

    for case in cases {
        if case.jd.trim().is_empty() || case.relevant_resumes.is_empty() {
            report.skipped += 1;
            continue;
        }

        let retrieved: Vec<String> = match vault.answer(&case.jd, &[]).await {
            Ok(answer) => answer
                .used_context
                .into_iter()
                .map(|record| record.metadata.filename)
                .collect(),
            Err(err) => {
                warn!(case = %case.id, error = %err, "evaluation case failed");
                Vec::new()
            }
        };

        let found: FxHashSet<&str> = retrieved.iter().map(String::as_str).collect();
        let passed = case
            .relevant_resumes
            .iter()
            .any(|expected| found.contains(expected.as_str()));
        info!(case = %case.id, passed, "evaluated case");

        report.outcomes.push(CaseOutcome {
            id: case.id.clone(),
            passed,
            expected: case.relevant_resumes.clone(),
            retrieved,
        });
    }

    report
}
