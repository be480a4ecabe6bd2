use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, VaultError};

pub const DEFAULT_TOP_K: usize = 5;
/// Tuned for `text-embedding-3-small` on resume-sized chunks. Other
/// embedding models usually want something in the 0.5..0.6 range.
pub const DEFAULT_SIM_THRESHOLD: f32 = 0.60;
pub const DEFAULT_HISTORY_WINDOW: usize = 10;
pub const DEFAULT_REFINE_WINDOW: usize = 6;
pub const DEFAULT_GAP_TOP_K: usize = 10;
pub const DEFAULT_CHUNK_SIZE: usize = 400;

#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub kb_path: PathBuf,
    pub api_base: String,
    pub api_key: String,
    pub embed_model: String,
    pub chat_model: String,
    pub top_k: usize,
    pub sim_threshold: f32,
    pub history_window: usize,
    pub refine_window: usize,
    pub gap_top_k: usize,
    pub chunk_size: usize,
    pub request_timeout: Duration,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kb_path: PathBuf::from("kb.json"),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            embed_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            top_k: DEFAULT_TOP_K,
            sim_threshold: DEFAULT_SIM_THRESHOLD,
            history_window: DEFAULT_HISTORY_WINDOW,
            refine_window: DEFAULT_REFINE_WINDOW,
            gap_top_k: DEFAULT_GAP_TOP_K,
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl VaultConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(VaultError::Config("top_k must be at least 1".into()));
        }
        if self.gap_top_k == 0 {
            return Err(VaultError::Config("gap_top_k must be at least 1".into()));
        }
        if self.history_window == 0 {
            return Err(VaultError::Config("history_window must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(VaultError::Config("chunk_size must be at least 1".into()));
        }
        if !(-1.0..=1.0).contains(&self.sim_threshold) {
            return Err(VaultError::Config(format!(
                "sim_threshold must lie in [-1, 1], got {}",
                self.sim_threshold
            )));
        }
        Ok(())
    }
}
