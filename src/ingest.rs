//! Offline knowledge base builder.
//!
//! Reads `.txt`, `.md`, `.pdf` and `.docx` files under a directory, chunks
//! them by paragraph, embeds each chunk and writes the records as a JSON
//! array. Records come out in path order so rebuilding the same corpus is
//! reproducible. Ids carry the path relative to the ingest root, so files
//! sharing a name in different folders never collide.

use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;
use crate::extract::extract_text;
use crate::llm::EmbeddingProvider;
use crate::utils::{chunk_text, collect_documents, normalize_text};
use crate::vector_db::{KnowledgeRecord, RecordMetadata};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
    pub failed_files: usize,
}

/// Embeds every chunk of every supported file under `dir`. A file whose
/// text cannot be extracted, or a chunk whose embedding fails, is logged
/// and skipped.
pub async fn build_records(
    embedder: &dyn EmbeddingProvider,
    dir: &Path,
    chunk_size: usize,
) -> Result<(Vec<KnowledgeRecord>, IngestReport)> {
    let mut records = Vec::new();
    let mut report = IngestReport::default();

    for path in collect_documents(dir)? {
        let raw = tokio::fs::read(&path).await?;
        let text = match extract_text(&path, &raw) {
            Ok(text) => normalize_text(&text),
            Err(err) => {
                report.failed_files += 1;
                warn!(path = %path.display(), error = %err, "skipping unreadable document");
                continue;
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        report.files += 1;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let category = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = relative_key(dir, &path);

        let chunks = chunk_text(&text, chunk_size);
        let total = chunks.len();
        for (idx, chunk) in chunks.into_iter().enumerate() {
            match embedder.embed(&chunk).await {
                Ok(embedding) => {
                    records.push(KnowledgeRecord {
                        id: format!("{key}_chunk_{idx}"),
                        source_path: path.to_string_lossy().into_owned(),
                        text: chunk,
                        embedding,
                        metadata: RecordMetadata {
                            category: category.clone(),
                            filename: filename.clone(),
                        },
                    });
                    report.chunks += 1;
                    info!(file = %filename, chunk = idx + 1, total, "embedded chunk");
                }
                Err(err) => {
                    report.failed_chunks += 1;
                    warn!(file = %filename, chunk = idx + 1, error = %err, "failed to embed chunk");
                }
            }
        }
    }

    Ok((records, report))
}

/// `path` relative to `root`, `/`-separated on every platform.
fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Writes records as pretty-printed JSON, replacing any existing file.
pub async fn write_knowledge_base(path: &Path, records: &[KnowledgeRecord]) -> Result<()> {
    let json = serde_json::to_vec_pretty(records)?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), records = records.len(), "wrote knowledge base");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockEmbedder, docx_with_paragraphs};
    use crate::vector_db::KnowledgeBase;
    use std::fs;

    #[tokio::test]
    async fn test_build_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let resumes = dir.path().join("resumes");
        fs::create_dir(&resumes).unwrap();
        fs::write(resumes.join("cv.txt"), "Rust engineer\nBuilt async services\n").unwrap();
        fs::write(dir.path().join("notes.md"), "   \n").unwrap();

        let embedder = MockEmbedder::new(vec![0.5, 0.5]);
        let (records, report) = build_records(&embedder, dir.path(), 400).await.unwrap();
        assert_eq!(report.files, 1);
        assert_eq!(report.chunks, 1);
        assert_eq!(records[0].id, "resumes/cv.txt_chunk_0");
        assert_eq!(records[0].metadata.category, "resumes");
        assert_eq!(records[0].metadata.filename, "cv.txt");
        assert_eq!(records[0].text, "Rust engineer\nBuilt async services");

        let kb_path = dir.path().join("kb.json");
        write_knowledge_base(&kb_path, &records).await.unwrap();
        let loaded = KnowledgeBase::open(&kb_path).load().await.unwrap();
        assert_eq!(*loaded, records);
    }

    #[tokio::test]
    async fn test_failed_chunks_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cv.txt"), "first\nsecond").unwrap();

        let embedder = MockEmbedder::new(vec![1.0]).failing_on("first");
        let (records, report) = build_records(&embedder, dir.path(), 6).await.unwrap();
        assert_eq!(report.failed_chunks, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "cv.txt_chunk_1");
        assert_eq!(records[0].text, "second");
    }

    #[tokio::test]
    async fn test_same_file_name_in_different_folders_loads() {
        let dir = tempfile::tempdir().unwrap();
        for folder in ["alpha", "beta"] {
            fs::create_dir(dir.path().join(folder)).unwrap();
            fs::write(dir.path().join(folder).join("README.md"), format!("{folder} notes")).unwrap();
        }

        let embedder = MockEmbedder::new(vec![1.0, 0.0]);
        let (records, _) = build_records(&embedder, dir.path(), 400).await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["alpha/README.md_chunk_0", "beta/README.md_chunk_0"]);
        assert!(records.iter().all(|r| r.metadata.filename == "README.md"));

        let kb_path = dir.path().join("kb.json");
        write_knowledge_base(&kb_path, &records).await.unwrap();
        let loaded = KnowledgeBase::open(&kb_path).load().await.unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn test_docx_is_ingested_and_bad_pdf_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("cv.docx"),
            docx_with_paragraphs(&["Rust engineer", "Kubernetes operator"]),
        )
        .unwrap();
        fs::write(dir.path().join("broken.pdf"), b"not a pdf").unwrap();

        let embedder = MockEmbedder::new(vec![1.0]);
        let (records, report) = build_records(&embedder, dir.path(), 400).await.unwrap();
        assert_eq!(report.files, 1);
        assert_eq!(report.failed_files, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "cv.docx_chunk_0");
        assert_eq!(records[0].text, "Rust engineer\nKubernetes operator");
    }
}
