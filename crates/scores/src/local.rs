use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{insert_entry, now_ms, sort_entries, ScoreEntry, ScoreError, ScoreStore, Submission, MAX_ENTRIES};

/// Scores kept in a JSON file.
///
/// A missing or unreadable file reads as an empty table; the file is
/// rewritten on every submission.
#[derive(Debug, Clone)]
pub struct LocalScoreStore {
    path: PathBuf,
}

impl LocalScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path from `TETRIS_SCORES_PATH`, else `highscores.json` in the working
    /// directory
    pub fn from_env() -> Self {
        let path = std::env::var("TETRIS_SCORES_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "highscores.json".to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Vec<ScoreEntry> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read scores");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<ScoreEntry>>(&raw) {
            Ok(mut entries) => {
                sort_entries(&mut entries);
                entries.truncate(MAX_ENTRIES);
                entries
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "discarding malformed scores file");
                Vec::new()
            }
        }
    }

    /// Store an already-built entry
    pub fn insert(&mut self, entry: ScoreEntry) -> Result<Submission, ScoreError> {
        let mut entries = self.read_all();
        let rank = insert_entry(&mut entries, entry);

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(Submission { rank, entries })
    }
}

impl ScoreStore for LocalScoreStore {
    fn load_top_scores(&self, limit: usize) -> Result<Vec<ScoreEntry>, ScoreError> {
        let mut entries = self.read_all();
        entries.truncate(limit);
        Ok(entries)
    }

    fn submit_score(
        &mut self,
        name: &str,
        score: u32,
        level: Option<u32>,
        lines: Option<u32>,
    ) -> Result<Submission, ScoreError> {
        self.insert(ScoreEntry::new(name, score, level, lines, now_ms()))
    }
}
