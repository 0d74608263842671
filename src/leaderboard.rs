//! Best score per nickname
//!
//! Kept for the lifetime of a room and sent with every snapshot. A train's
//! score survives death, so the best is simply the highest score seen.

use serde::{Deserialize, Serialize};

/// A single leaderboard entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub nickname: String,
    pub score: u64,
}

/// Leaderboard sorted by score, highest first (ties by nickname)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BestScores {
    entries: Vec<ScoreEntry>,
}

impl BestScores {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a score for a nickname
    /// Returns the rank held afterwards (1-indexed) if this was a new best
    pub fn record(&mut self, nickname: &str, score: u64) -> Option<usize> {
        if score == 0 {
            return None;
        }
        match self.entries.iter().position(|e| e.nickname == nickname) {
            Some(i) if self.entries[i].score >= score => return None,
            Some(i) => {
                self.entries.remove(i);
            }
            None => {}
        }

        // Find insertion point (sorted descending by score)
        let pos = self
            .entries
            .iter()
            .position(|e| score > e.score || (score == e.score && nickname < e.nickname.as_str()))
            .unwrap_or(self.entries.len());
        self.entries.insert(
            pos,
            ScoreEntry {
                nickname: nickname.to_string(),
                score,
            },
        );
        Some(pos + 1)
    }

    pub fn get(&self, nickname: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.nickname == nickname)
            .map(|e| e.score)
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_best_only() {
        let mut scores = BestScores::new();
        assert_eq!(scores.record("ann", 0), None);
        assert_eq!(scores.record("ann", 3), Some(1));
        assert_eq!(scores.record("ann", 2), None);
        assert_eq!(scores.record("ann", 3), None);
        assert_eq!(scores.get("ann"), Some(3));
        assert_eq!(scores.entries().len(), 1);
    }

    #[test]
    fn test_sorted_descending() {
        let mut scores = BestScores::new();
        scores.record("ann", 3);
        assert_eq!(scores.record("bob", 5), Some(1));
        scores.record("cat", 3);
        let names: Vec<_> = scores.entries().iter().map(|e| e.nickname.as_str()).collect();
        assert_eq!(names, vec!["bob", "ann", "cat"]);
        assert_eq!(scores.entries()[0].score, 5);

        // Improving moves the entry up
        assert_eq!(scores.record("cat", 9), Some(1));
        assert_eq!(scores.entries()[0].nickname, "cat");
    }

    #[test]
    fn test_serializes_as_list() {
        let mut scores = BestScores::new();
        scores.record("ann", 2);
        let json = serde_json::to_string(&scores).unwrap();
        assert_eq!(json, r#"[{"nickname":"ann","score":2}]"#);
    }
}
