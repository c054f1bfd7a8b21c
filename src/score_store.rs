use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;
use crate::difficulty::Difficulty;
use crate::error::StoreError;

/// A finished session waiting to be recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScore {
    pub user_id: String,
    pub display_name: String,
    pub wpm: u32,
    pub accuracy: u32,
    pub difficulty: Difficulty,
}

/// A recorded result; id and timestamp are assigned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub id: i64,
    pub user_id: String,
    pub display_name: String,
    pub wpm: u32,
    pub accuracy: u32,
    pub difficulty: Difficulty,
    pub created_at: DateTime<Utc>,
}

/// Persistence for finished sessions.
///
/// `top_scores` orders by wpm descending; equal wpm is broken by higher
/// accuracy, then the earlier score, then insertion order.
pub trait ScoreStore {
    fn submit_score(&mut self, score: &NewScore) -> Result<Score, StoreError>;
    fn top_scores(&self, difficulty: Difficulty, limit: usize) -> Result<Vec<Score>, StoreError>;
}

/// SQLite-backed score table
#[derive(Debug)]
pub struct SqliteScoreStore {
    conn: Connection,
}

impl SqliteScoreStore {
    /// Open the default database under the state directory
    pub fn new() -> Result<Self, StoreError> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("typemaster_scores.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        // the submit worker and the leaderboard reader hold separate connections
        conn.busy_timeout(Duration::from_secs(2))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                display_name TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                difficulty TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_scores_difficulty_wpm
                ON scores(difficulty, wpm DESC);
            "#,
        )?;
        Ok(Self { conn })
    }

    /// Insert with an explicit timestamp
    pub fn submit_score_at(
        &mut self,
        score: &NewScore,
        created_at: DateTime<Utc>,
    ) -> Result<Score, StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO scores (user_id, display_name, wpm, accuracy, difficulty, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                score.user_id,
                score.display_name,
                score.wpm,
                score.accuracy,
                score.difficulty.as_str(),
                format_timestamp(&created_at),
            ],
        )?;

        Ok(Score {
            id: self.conn.last_insert_rowid(),
            user_id: score.user_id.clone(),
            display_name: score.display_name.clone(),
            wpm: score.wpm,
            accuracy: score.accuracy,
            difficulty: score.difficulty,
            created_at,
        })
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scores", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl ScoreStore for SqliteScoreStore {
    fn submit_score(&mut self, score: &NewScore) -> Result<Score, StoreError> {
        self.submit_score_at(score, Utc::now())
    }

    fn top_scores(&self, difficulty: Difficulty, limit: usize) -> Result<Vec<Score>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, display_name, wpm, accuracy, difficulty, created_at
            FROM scores
            WHERE difficulty = ?1
            ORDER BY wpm DESC, accuracy DESC, created_at ASC, id ASC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![difficulty.as_str(), limit as i64], raw_score)?;

        let mut scores = Vec::new();
        for row in rows {
            scores.push(row?.into_score()?);
        }
        Ok(scores)
    }
}

struct RawScore {
    id: i64,
    user_id: String,
    display_name: String,
    wpm: u32,
    accuracy: u32,
    difficulty: String,
    created_at: String,
}

fn raw_score(row: &Row<'_>) -> rusqlite::Result<RawScore> {
    Ok(RawScore {
        id: row.get(0)?,
        user_id: row.get(1)?,
        display_name: row.get(2)?,
        wpm: row.get(3)?,
        accuracy: row.get(4)?,
        difficulty: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl RawScore {
    fn into_score(self) -> Result<Score, StoreError> {
        let difficulty = self
            .difficulty
            .parse::<Difficulty>()
            .map_err(|_| StoreError::InvalidDifficulty(self.difficulty.clone()))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|_| StoreError::InvalidTimestamp(self.created_at.clone()))?
            .with_timezone(&Utc);
        Ok(Score {
            id: self.id,
            user_id: self.user_id,
            display_name: self.display_name,
            wpm: self.wpm,
            accuracy: self.accuracy,
            difficulty,
            created_at,
        })
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// One row of the rendered leaderboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub display_name: String,
    pub wpm: u32,
    pub accuracy: u32,
}

pub struct Leaderboard;

impl Leaderboard {
    /// Ranked entries for a tier; a failed read is logged and yields no rows
    pub fn fetch(
        store: &dyn ScoreStore,
        difficulty: Difficulty,
        limit: usize,
    ) -> Vec<LeaderboardEntry> {
        match store.top_scores(difficulty, limit) {
            Ok(scores) => scores
                .into_iter()
                .enumerate()
                .map(|(idx, s)| LeaderboardEntry {
                    rank: idx + 1,
                    display_name: s.display_name,
                    wpm: s.wpm,
                    accuracy: s.accuracy,
                })
                .collect(),
            Err(e) => {
                log::error!("failed to fetch {difficulty} leaderboard: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn score(name: &str, wpm: u32, accuracy: u32, difficulty: Difficulty) -> NewScore {
        NewScore {
            user_id: format!("id-{name}"),
            display_name: name.to_string(),
            wpm,
            accuracy,
            difficulty,
        }
    }

    fn names(scores: &[Score]) -> Vec<&str> {
        scores.iter().map(|s| s.display_name.as_str()).collect()
    }

    #[test]
    fn test_submit_assigns_id_and_timestamp() {
        let mut store = SqliteScoreStore::open_in_memory().unwrap();
        let before = Utc::now();
        let saved = store
            .submit_score(&score("a", 40, 95, Difficulty::Easy))
            .unwrap();
        assert!(saved.id > 0);
        assert!(saved.created_at >= before);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_top_scores_filters_by_difficulty() {
        let mut store = SqliteScoreStore::open_in_memory().unwrap();
        store.submit_score(&score("easy", 30, 90, Difficulty::Easy)).unwrap();
        store.submit_score(&score("hard", 80, 99, Difficulty::Hard)).unwrap();

        let easy = store.top_scores(Difficulty::Easy, 10).unwrap();
        assert_eq!(names(&easy), vec!["easy"]);
        assert!(store.top_scores(Difficulty::Medium, 10).unwrap().is_empty());
    }

    #[test]
    fn test_top_scores_ordering_and_tie_break() {
        let mut store = SqliteScoreStore::open_in_memory().unwrap();
        let t = |s: u32| Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, s).unwrap();

        store
            .submit_score_at(&score("slow", 20, 100, Difficulty::Medium), t(0))
            .unwrap();
        store
            .submit_score_at(&score("late", 50, 90, Difficulty::Medium), t(5))
            .unwrap();
        store
            .submit_score_at(&score("early", 50, 90, Difficulty::Medium), t(1))
            .unwrap();
        store
            .submit_score_at(&score("precise", 50, 97, Difficulty::Medium), t(9))
            .unwrap();
        store
            .submit_score_at(&score("fast", 70, 80, Difficulty::Medium), t(3))
            .unwrap();

        let top = store.top_scores(Difficulty::Medium, 10).unwrap();
        assert_eq!(names(&top), vec!["fast", "precise", "early", "late", "slow"]);
    }

    #[test]
    fn test_identical_timestamps_fall_back_to_insertion_order() {
        let mut store = SqliteScoreStore::open_in_memory().unwrap();
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        store
            .submit_score_at(&score("first", 60, 95, Difficulty::Easy), t)
            .unwrap();
        store
            .submit_score_at(&score("second", 60, 95, Difficulty::Easy), t)
            .unwrap();
        let top = store.top_scores(Difficulty::Easy, 10).unwrap();
        assert_eq!(names(&top), vec!["first", "second"]);
    }

    #[test]
    fn test_limit() {
        let mut store = SqliteScoreStore::open_in_memory().unwrap();
        for wpm in 0..15 {
            store
                .submit_score(&score(&format!("p{wpm}"), wpm, 90, Difficulty::Hard))
                .unwrap();
        }
        let top = store.top_scores(Difficulty::Hard, 10).unwrap();
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].wpm, 14);
        assert_eq!(top[9].wpm, 5);
    }

    #[test]
    fn test_file_store_persists_between_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("scores.db");
        {
            let mut store = SqliteScoreStore::open(&path).unwrap();
            store.submit_score(&score("kept", 42, 91, Difficulty::Easy)).unwrap();
        }
        let store = SqliteScoreStore::open(&path).unwrap();
        let top = store.top_scores(Difficulty::Easy, 5).unwrap();
        assert_eq!(names(&top), vec!["kept"]);
        assert_eq!(top[0].wpm, 42);
        assert_eq!(top[0].accuracy, 91);
    }

    #[test]
    fn test_leaderboard_ranks() {
        let mut store = SqliteScoreStore::open_in_memory().unwrap();
        store.submit_score(&score("b", 30, 90, Difficulty::Easy)).unwrap();
        store.submit_score(&score("a", 60, 90, Difficulty::Easy)).unwrap();
        let entries = Leaderboard::fetch(&store, Difficulty::Easy, 10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].display_name, "a");
        assert_eq!(entries[1].rank, 2);
    }

    struct BrokenStore;

    impl ScoreStore for BrokenStore {
        fn submit_score(&mut self, _score: &NewScore) -> Result<Score, StoreError> {
            Err(StoreError::InvalidDifficulty("broken".into()))
        }

        fn top_scores(&self, _d: Difficulty, _limit: usize) -> Result<Vec<Score>, StoreError> {
            Err(StoreError::InvalidDifficulty("broken".into()))
        }
    }

    #[test]
    fn test_leaderboard_failure_yields_empty() {
        assert!(Leaderboard::fetch(&BrokenStore, Difficulty::Easy, 10).is_empty());
    }

    #[test]
    fn test_corrupt_difficulty_row_is_an_error() {
        let store = SqliteScoreStore::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO scores (user_id, display_name, wpm, accuracy, difficulty, created_at)
                 VALUES ('x', 'x', 10, 10, 'easy', 'not-a-date')",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.top_scores(Difficulty::Easy, 10),
            Err(StoreError::InvalidTimestamp(_))
        ));
    }
}
