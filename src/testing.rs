//! Recording provider mocks shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, VaultError};
use crate::llm::{ChatMessage, CompletionProvider, EmbeddingProvider};
use crate::vector_db::{KnowledgeRecord, RecordMetadata};

pub fn record(id: &str, text: &str, embedding: Vec<f32>) -> KnowledgeRecord {
    KnowledgeRecord {
        id: id.to_string(),
        source_path: format!("docs/{id}.txt"),
        text: text.to_string(),
        embedding,
        metadata: RecordMetadata::default(),
    }
}

/// Returns `default` for every text unless an override or failure is set.
pub struct MockEmbedder {
    default: Option<Vec<f32>>,
    overrides: HashMap<String, Vec<f32>>,
    fail_on: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockEmbedder {
    pub fn new(default: Vec<f32>) -> Self {
        MockEmbedder {
            default: Some(default),
            overrides: HashMap::new(),
            fail_on: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        MockEmbedder {
            default: None,
            overrides: HashMap::new(),
            fail_on: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, text: &str, embedding: Vec<f32>) -> Self {
        self.overrides.insert(text.to_string(), embedding);
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on.insert(text.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail_on.contains(text) {
            return Err(VaultError::provider("embedding rejected"));
        }
        if let Some(embedding) = self.overrides.get(text) {
            return Ok(embedding.clone());
        }
        self.default
            .clone()
            .ok_or_else(|| VaultError::provider("embedding service unavailable"))
    }
}

/// Pops queued responses in order, then answers `"ok"`.
pub struct MockCompletion {
    responses: Mutex<VecDeque<String>>,
    fail: bool,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::with_responses(Vec::<String>::new())
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockCompletion {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        MockCompletion {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if self.fail {
            return Err(VaultError::provider("completion service unavailable"));
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "ok".to_string()))
    }
}

/// Minimal DOCX archive with one `w:p` per paragraph.
pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{body}</w:body></w:document>"
    );

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}
