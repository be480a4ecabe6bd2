use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;
use crate::extract::supported_extension;

/// NFC-normalizes text and collapses runs of horizontal whitespace.
/// Line breaks are kept since chunking is paragraph based.
pub fn normalize_text(text: &str) -> String {
    lazy_static! {
        static ref HORIZONTAL_WS: Regex = Regex::new(r"[^\S\n]+").unwrap();
    }

    let text = text.nfc().collect::<String>().replace("\r\n", "\n");
    HORIZONTAL_WS.replace_all(&text, " ").into_owned()
}

/// Groups non-blank lines into chunks of fewer than `chunk_size` chars.
///
/// A line that does not fit starts a new chunk. A single line longer than
/// `chunk_size` becomes its own chunk rather than being split.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.lines().map(str::trim).filter(|p| !p.is_empty()) {
        let current_len = current.chars().count();
        let paragraph_len = paragraph.chars().count();
        if current_len + paragraph_len >= chunk_size && !current.is_empty() {
            chunks.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(paragraph);
        current.push('\n');
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

/// Lists supported documents under `dir` recursively, sorted by path.
pub fn collect_documents(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    walk(dir.as_ref(), &mut paths)?;
    paths.sort();
    Ok(paths)
}

fn walk(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, paths)?;
        } else if supported_extension(&path).is_some() {
            paths.push(path);
        } else {
            warn!(path = %path.display(), "skipping unsupported file type");
        }
    }
    Ok(())
}
