//! Highscore client with a local file fallback.
//!
//! The game submits its final score through [`HighscoreClient`]. When the
//! service cannot be reached, or answers with anything other than a valid
//! ranking, the score is ranked into a small JSON file instead so the
//! player still sees a list.
//!
//! ```text
//!   submit ──► POST /api/highscores ──ok──► top 10 ──► mirror to file
//!                      │
//!                    error
//!                      ▼
//!             file: load, rank, keep 10, save
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ruutu_core::highscore::rank;
use ruutu_core::{HighscoreRecord, ScoreSubmission, DISPLAY_LIMIT};
use tracing::{debug, instrument, warn};

use crate::error::PersistenceError;
use crate::server::{timestamp, SubmitResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a highscore list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highscores {
    pub records: Vec<HighscoreRecord>,
    pub source: Source,
}

// =============================================================================
// Local file
// =============================================================================

/// JSON array of records on disk, best first, at most [`DISPLAY_LIMIT`] long.
#[derive(Debug, Clone)]
pub struct LocalHighscores {
    path: PathBuf,
}

impl LocalHighscores {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored records. A missing or unreadable file counts as empty.
    pub fn load(&self) -> Result<Vec<HighscoreRecord>, PersistenceError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str(&data) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding corrupt highscore file");
                Ok(Vec::new())
            }
        }
    }

    pub fn save(&self, records: &[HighscoreRecord]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(records)?)?;
        Ok(())
    }

    /// Rank a new record into the file and return the resulting list.
    pub fn record(&self, record: HighscoreRecord) -> Result<Vec<HighscoreRecord>, PersistenceError> {
        let mut records = self.load()?;
        rank(&mut records, record, DISPLAY_LIMIT);
        self.save(&records)?;
        Ok(records)
    }
}

// =============================================================================
// Client
// =============================================================================

pub struct HighscoreClient {
    base_url: String,
    http: reqwest::Client,
    local: LocalHighscores,
}

impl HighscoreClient {
    /// `base_url` is the service root, e.g. `http://localhost:3000`.
    pub fn new(
        base_url: impl Into<String>,
        local_path: impl Into<PathBuf>,
    ) -> Result<Self, PersistenceError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            local: LocalHighscores::new(local_path),
        })
    }

    pub fn local(&self) -> &LocalHighscores {
        &self.local
    }

    fn endpoint(&self) -> String {
        format!("{}/api/highscores", self.base_url)
    }

    /// Submit a final score and return the list to show.
    ///
    /// Only local file errors are returned; service failures fall back.
    #[instrument(skip_all, fields(score = submission.score))]
    pub async fn submit(&self, submission: &ScoreSubmission) -> Result<Highscores, PersistenceError> {
        match self.submit_remote(submission).await {
            Ok(mut top) => {
                top.truncate(DISPLAY_LIMIT);
                if let Err(e) = self.local.save(&top) {
                    warn!(error = %e, "Failed to mirror highscores locally");
                }
                debug!(count = top.len(), "Service accepted highscore");
                Ok(Highscores {
                    records: top,
                    source: Source::Remote,
                })
            }
            Err(e) => {
                warn!(error = %e, "Highscore service unavailable, storing locally");
                let records = self.local.record(HighscoreRecord {
                    score: submission.score,
                    date: timestamp(),
                })?;
                Ok(Highscores {
                    records,
                    source: Source::Local,
                })
            }
        }
    }

    async fn submit_remote(
        &self,
        submission: &ScoreSubmission,
    ) -> Result<Vec<HighscoreRecord>, PersistenceError> {
        let response = self
            .http
            .post(self.endpoint())
            .json(submission)
            .send()
            .await?
            .error_for_status()?;
        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| PersistenceError::malformed(e.to_string()))?;
        if !body.ok {
            return Err(PersistenceError::malformed("response not marked ok"));
        }
        Ok(body.top)
    }

    /// Current highscores, best first, at most [`DISPLAY_LIMIT`].
    #[instrument(skip_all)]
    pub async fn fetch(&self) -> Result<Highscores, PersistenceError> {
        match self.fetch_remote().await {
            Ok(mut records) => {
                records.truncate(DISPLAY_LIMIT);
                Ok(Highscores {
                    records,
                    source: Source::Remote,
                })
            }
            Err(e) => {
                warn!(error = %e, "Highscore service unavailable, reading local list");
                Ok(Highscores {
                    records: self.local.load()?,
                    source: Source::Local,
                })
            }
        }
    }

    async fn fetch_remote(&self) -> Result<Vec<HighscoreRecord>, PersistenceError> {
        let response = self.http.get(self.endpoint()).send().await?.error_for_status()?;
        response
            .json()
            .await
            .map_err(|e| PersistenceError::malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(score: u32) -> HighscoreRecord {
        HighscoreRecord {
            score,
            date: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalHighscores::new(dir.path().join("none.json"));
        assert!(local.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hs.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(LocalHighscores::new(path).load().unwrap().is_empty());
    }

    #[test]
    fn test_record_ranks_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalHighscores::new(dir.path().join("sub").join("hs.json"));
        for score in 1..=12 {
            local.record(rec(score)).unwrap();
        }
        let records = local.load().unwrap();
        assert_eq!(records.len(), DISPLAY_LIMIT);
        assert_eq!(records[0].score, 12);
        assert_eq!(records[DISPLAY_LIMIT - 1].score, 3);
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash() {
        let client = HighscoreClient::new("http://localhost:3000/", "hs.json").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:3000/api/highscores");
    }
}
