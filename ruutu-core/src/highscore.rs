//! Highscore records shared by the engine, the service and the client.

use serde::{Deserialize, Serialize};

/// Records shown to the player.
pub const DISPLAY_LIMIT: usize = 10;

/// Records kept by the service.
pub const RETAIN_LIMIT: usize = 100;

/// Canonical key of one scored line.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct LineKey {
    pub key: String,
}

/// Final state of a game as sent to the highscore service.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub score: u32,
    pub lines: Vec<LineKey>,
}

impl ScoreSubmission {
    /// The score implied by the submitted lines.
    pub fn canonical_score(&self) -> usize {
        self.lines.len()
    }

    /// Check that the claimed score matches the line count.
    pub fn is_consistent(&self) -> bool {
        self.score as usize == self.canonical_score()
    }
}

/// One stored highscore.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct HighscoreRecord {
    pub score: u32,
    /// RFC 3339 timestamp.
    pub date: String,
}

/// Insert `record`, order best first and keep at most `limit` entries.
///
/// Sorting is stable, so equal scores keep their insertion order.
pub fn rank(records: &mut Vec<HighscoreRecord>, record: HighscoreRecord, limit: usize) {
    records.push(record);
    records.sort_by(|a, b| b.score.cmp(&a.score));
    records.truncate(limit);
}
