use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::ArrayView1;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::{Result, VaultError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub filename: String,
}

/// One embedded chunk of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub id: String,
    #[serde(alias = "source")]
    pub source_path: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: RecordMetadata,
}

/// A record paired with its similarity to the current query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredMatch<'a> {
    pub similarity: f32,
    pub record: &'a KnowledgeRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBaseStats {
    pub records: usize,
    pub dimension: Option<usize>,
    pub categories: BTreeMap<String, usize>,
}

/// Read-only store of knowledge records, loaded from disk at most once.
///
/// Concurrent first callers wait on the same load. The records are only
/// published after they have been parsed and validated, so no caller ever
/// sees a partial knowledge base. A failed load leaves the cache empty.
pub struct KnowledgeBase {
    path: PathBuf,
    records: OnceCell<Arc<Vec<KnowledgeRecord>>>,
}

impl KnowledgeBase {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        KnowledgeBase {
            path: path.into(),
            records: OnceCell::new(),
        }
    }

    /// Builds an already-loaded store. The records are validated the same
    /// way a file load would validate them.
    pub fn from_records(records: Vec<KnowledgeRecord>) -> Result<Self> {
        validate(&records)?;
        Ok(KnowledgeBase {
            path: PathBuf::new(),
            records: OnceCell::new_with(Some(Arc::new(records))),
        })
    }

    pub async fn load(&self) -> Result<Arc<Vec<KnowledgeRecord>>> {
        let records = self
            .records
            .get_or_try_init(|| async {
                let records = read_records(&self.path).await?;
                info!(
                    path = %self.path.display(),
                    records = records.len(),
                    "loaded knowledge base"
                );
                Ok::<_, VaultError>(Arc::new(records))
            })
            .await?;
        Ok(Arc::clone(records))
    }

    pub async fn stats(&self) -> Result<KnowledgeBaseStats> {
        let records = self.load().await?;
        let mut categories = BTreeMap::new();
        for record in records.iter() {
            *categories
                .entry(record.metadata.category.clone())
                .or_insert(0) += 1;
        }
        Ok(KnowledgeBaseStats {
            records: records.len(),
            dimension: records.first().map(|r| r.embedding.len()),
            categories,
        })
    }
}

async fn read_records(path: &Path) -> Result<Vec<KnowledgeRecord>> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(VaultError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(err) => return Err(err.into()),
    };
    let records: Vec<KnowledgeRecord> = serde_json::from_slice(&raw)?;
    validate(&records)?;
    Ok(records)
}

fn validate(records: &[KnowledgeRecord]) -> Result<()> {
    let mut seen = FxHashSet::default();
    let dimension = records.first().map(|r| r.embedding.len());
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(VaultError::InvalidKnowledgeBase(format!(
                "duplicate record id {}",
                record.id
            )));
        }
        if record.text.is_empty() {
            return Err(VaultError::InvalidKnowledgeBase(format!(
                "record {} has empty text",
                record.id
            )));
        }
        if record.embedding.is_empty() {
            return Err(VaultError::InvalidKnowledgeBase(format!(
                "record {} has an empty embedding",
                record.id
            )));
        }
        if record.embedding.iter().any(|v| !v.is_finite()) {
            return Err(VaultError::InvalidKnowledgeBase(format!(
                "record {} has a non-finite embedding value",
                record.id
            )));
        }
        if Some(record.embedding.len()) != dimension {
            return Err(VaultError::InvalidKnowledgeBase(format!(
                "record {} has {} dimensions, expected {}",
                record.id,
                record.embedding.len(),
                dimension.unwrap_or_default()
            )));
        }
    }
    Ok(())
}

/// Cosine similarity, `0.0` when either vector has zero norm or the
/// lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        a.dot(&b) / (norm_a * norm_b)
    }
}

/// Scores every record against `query` and keeps the best `top_k`.
///
/// Linear scan over the whole slice. Ties keep their original order.
pub fn rank<'a>(
    query: &[f32],
    records: &'a [KnowledgeRecord],
    top_k: usize,
) -> Result<Vec<ScoredMatch<'a>>> {
    if let Some(first) = records.first() {
        if first.embedding.len() != query.len() {
            return Err(VaultError::DimensionMismatch {
                expected: first.embedding.len(),
                actual: query.len(),
            });
        }
    }

    let mut scored: Vec<ScoredMatch<'a>> = records
        .iter()
        .map(|record| ScoredMatch {
            similarity: cosine_similarity(query, &record.embedding),
            record,
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| sort_key(b.similarity).total_cmp(&sort_key(a.similarity)));
    scored.truncate(top_k);
    Ok(scored)
}

/// NaN of either sign ranks below every real score; `-0.0` ties with `0.0`.
fn sort_key(similarity: f32) -> f32 {
    if similarity.is_nan() {
        f32::NEG_INFINITY
    } else {
        similarity + 0.0
    }
}
