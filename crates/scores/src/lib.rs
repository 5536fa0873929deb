//! High-score persistence
//!
//! A [`ScoreStore`] keeps the best [`MAX_ENTRIES`] results, highest score
//! first and newest first among equal scores.

mod local;
mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use local::LocalScoreStore;
pub use memory::MemoryScoreStore;

pub const MAX_ENTRIES: usize = 10;
pub const MAX_NAME_LEN: usize = 40;
pub const DEFAULT_NAME: &str = "Anonymous";

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<u32>,
    pub timestamp_ms: u64,
}

impl ScoreEntry {
    pub fn new(name: &str, score: u32, level: Option<u32>, lines: Option<u32>, timestamp_ms: u64) -> Self {
        Self {
            name: sanitize_name(name),
            score,
            level,
            lines,
            timestamp_ms,
        }
    }
}

/// Result of a submission: 1-based rank (None if it fell off the table) and
/// the updated table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub rank: Option<usize>,
    pub entries: Vec<ScoreEntry>,
}

pub trait ScoreStore {
    fn load_top_scores(&self, limit: usize) -> Result<Vec<ScoreEntry>, ScoreError>;

    fn submit_score(
        &mut self,
        name: &str,
        score: u32,
        level: Option<u32>,
        lines: Option<u32>,
    ) -> Result<Submission, ScoreError>;
}

/// Trimmed, at most [`MAX_NAME_LEN`] chars, [`DEFAULT_NAME`] when blank
pub fn sanitize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return DEFAULT_NAME.to_string();
    }
    trimmed.chars().take(MAX_NAME_LEN).collect()
}

/// True while the table has free slots or `score` beats its lowest entry
pub fn qualifies_as_high_score(score: u32, entries: &[ScoreEntry]) -> bool {
    if entries.len() < MAX_ENTRIES {
        return true;
    }
    let lowest = entries.iter().map(|e| e.score).min().unwrap_or(0);
    score > lowest
}

/// Score desc, then newest first
pub fn sort_entries(entries: &mut [ScoreEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.timestamp_ms.cmp(&a.timestamp_ms))
    });
}

/// Insert `entry`, re-sort, truncate to [`MAX_ENTRIES`]; returns its rank
pub fn insert_entry(entries: &mut Vec<ScoreEntry>, entry: ScoreEntry) -> Option<usize> {
    entries.push(entry.clone());
    sort_entries(entries);
    entries.truncate(MAX_ENTRIES);
    entries.iter().position(|e| *e == entry).map(|i| i + 1)
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
