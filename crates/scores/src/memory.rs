use crate::{insert_entry, now_ms, ScoreEntry, ScoreError, ScoreStore, Submission};

/// In-memory table for tests and sessions without persistence
#[derive(Debug, Clone, Default)]
pub struct MemoryScoreStore {
    entries: Vec<ScoreEntry>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }
}

impl ScoreStore for MemoryScoreStore {
    fn load_top_scores(&self, limit: usize) -> Result<Vec<ScoreEntry>, ScoreError> {
        Ok(self.entries.iter().take(limit).cloned().collect())
    }

    fn submit_score(
        &mut self,
        name: &str,
        score: u32,
        level: Option<u32>,
        lines: Option<u32>,
    ) -> Result<Submission, ScoreError> {
        let rank = insert_entry(
            &mut self.entries,
            ScoreEntry::new(name, score, level, lines, now_ms()),
        );
        Ok(Submission {
            rank,
            entries: self.entries.clone(),
        })
    }
}
