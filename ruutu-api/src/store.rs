//! SQLite-backed highscore table.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};
use ruutu_core::HighscoreRecord;
use tracing::{debug, instrument};

use crate::error::PersistenceError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS highscores (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    score INTEGER NOT NULL,
    date  TEXT    NOT NULL
)";

/// Best first; equal scores keep submission order.
const RANKED: &str = "ORDER BY score DESC, id ASC";

/// Stored highscores behind a single connection
pub struct HighscoreStore {
    conn: Mutex<Connection>,
}

impl HighscoreStore {
    /// Open (or create) the database file, creating parent directories.
    #[instrument]
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute(SCHEMA, [])?;
        Ok(HighscoreStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // The connection holds no state a panicking holder could corrupt.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a record, drop everything below the best `retain`, and
    /// return what is left, best first.
    #[instrument(skip(self), fields(score = record.score))]
    pub fn insert(
        &self,
        record: &HighscoreRecord,
        retain: usize,
    ) -> Result<Vec<HighscoreRecord>, PersistenceError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO highscores (score, date) VALUES (?1, ?2)",
            params![record.score, record.date],
        )?;
        let pruned = tx.execute(
            &format!(
                "DELETE FROM highscores WHERE id NOT IN \
                 (SELECT id FROM highscores {RANKED} LIMIT ?1)"
            ),
            [retain as i64],
        )?;
        tx.commit()?;
        if pruned > 0 {
            debug!(pruned, "Dropped records below the retained top");
        }
        Self::ranked(&conn, retain)
    }

    /// Best `limit` records.
    pub fn top(&self, limit: usize) -> Result<Vec<HighscoreRecord>, PersistenceError> {
        Self::ranked(&self.conn(), limit)
    }

    pub fn len(&self) -> Result<usize, PersistenceError> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM highscores", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, PersistenceError> {
        Ok(self.len()? == 0)
    }

    fn ranked(conn: &Connection, limit: usize) -> Result<Vec<HighscoreRecord>, PersistenceError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT score, date FROM highscores {RANKED} LIMIT ?1"
        ))?;
        let records = stmt
            .query_map([limit as i64], |row| {
                Ok(HighscoreRecord {
                    score: row.get(0)?,
                    date: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(score: u32, date: &str) -> HighscoreRecord {
        HighscoreRecord {
            score,
            date: date.to_string(),
        }
    }

    #[test]
    fn test_insert_returns_ranked() {
        let store = HighscoreStore::open_in_memory().unwrap();
        store.insert(&rec(3, "a"), 100).unwrap();
        store.insert(&rec(7, "b"), 100).unwrap();
        let top = store.insert(&rec(5, "c"), 100).unwrap();
        let scores: Vec<u32> = top.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![7, 5, 3]);
    }

    #[test]
    fn test_ties_keep_submission_order() {
        let store = HighscoreStore::open_in_memory().unwrap();
        store.insert(&rec(4, "first"), 100).unwrap();
        store.insert(&rec(4, "second"), 100).unwrap();
        let top = store.top(10).unwrap();
        assert_eq!(top[0].date, "first");
        assert_eq!(top[1].date, "second");
    }

    #[test]
    fn test_retention_prunes_lowest() {
        let store = HighscoreStore::open_in_memory().unwrap();
        for score in [5, 1, 9, 3, 7] {
            store.insert(&rec(score, "x"), 3).unwrap();
        }
        assert_eq!(store.len().unwrap(), 3);
        let scores: Vec<u32> = store.top(10).unwrap().iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![9, 7, 5]);
    }

    #[test]
    fn test_low_score_outside_retention_not_kept() {
        let store = HighscoreStore::open_in_memory().unwrap();
        store.insert(&rec(10, "a"), 1).unwrap();
        let top = store.insert(&rec(2, "b"), 1).unwrap();
        assert_eq!(top, vec![rec(10, "a")]);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("highscores.db");
        {
            let store = HighscoreStore::open(&path).unwrap();
            assert!(store.is_empty().unwrap());
            store.insert(&rec(6, "kept"), 100).unwrap();
        }
        let reopened = HighscoreStore::open(&path).unwrap();
        assert_eq!(reopened.top(10).unwrap(), vec![rec(6, "kept")]);
    }
}
