//! Progress record collection, keyed by lesson id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use memelingo_schema::ProgressRecord;
use rusqlite::{params, Connection, Row};

use crate::storage::{StorageError, StorageResult};

pub struct ProgressRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProgressRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    /// Upserts the record for its lesson; resubmission overwrites.
    pub fn put(&self, record: &ProgressRecord) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::put_internal(&conn, record)
    }

    pub fn get(&self, lesson_id: &str) -> StorageResult<Option<ProgressRecord>> {
        let conn = self.get_conn()?;
        Self::get_internal(&conn, lesson_id)
    }

    pub fn get_all(&self) -> StorageResult<Vec<ProgressRecord>> {
        let conn = self.get_conn()?;
        Self::get_all_internal(&conn)
    }

    pub fn put_internal(conn: &Connection, record: &ProgressRecord) -> StorageResult<()> {
        let answers = serde_json::to_string(&record.answers)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO progress_record (lesson_id, answers, score, completed_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(lesson_id) DO UPDATE SET
                answers = excluded.answers,
                score = excluded.score,
                completed_at = excluded.completed_at
            "#,
            params![record.lesson_id, answers, record.score, record.completed_at],
        )?;
        Ok(())
    }

    pub fn get_internal(conn: &Connection, lesson_id: &str) -> StorageResult<Option<ProgressRecord>> {
        let mut stmt = conn.prepare(
            "SELECT lesson_id, answers, score, completed_at FROM progress_record WHERE lesson_id = ?1",
        )?;

        match stmt.query_row(params![lesson_id], progress_row) {
            Ok(row) => Ok(Some(decode_progress(row)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_all_internal(conn: &Connection) -> StorageResult<Vec<ProgressRecord>> {
        let mut stmt =
            conn.prepare("SELECT lesson_id, answers, score, completed_at FROM progress_record")?;

        let rows = stmt
            .query_map([], progress_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(decode_progress).collect()
    }
}

struct ProgressRow {
    lesson_id: String,
    answers: String,
    score: u8,
    completed_at: i64,
}

fn progress_row(row: &Row) -> rusqlite::Result<ProgressRow> {
    Ok(ProgressRow {
        lesson_id: row.get("lesson_id")?,
        answers: row.get("answers")?,
        score: row.get("score")?,
        completed_at: row.get("completed_at")?,
    })
}

fn decode_progress(row: ProgressRow) -> StorageResult<ProgressRecord> {
    let answers: HashMap<String, String> = serde_json::from_str(&row.answers)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

    Ok(ProgressRecord {
        lesson_id: row.lesson_id,
        answers,
        score: row.score,
        completed_at: row.completed_at,
    })
}

#[cfg(test)]
mod tests {
    use crate::storage::Store;

    use super::*;

    fn record(lesson_id: &str, score: u8) -> ProgressRecord {
        ProgressRecord {
            lesson_id: lesson_id.to_string(),
            answers: HashMap::from([
                ("q1".to_string(), "sits".to_string()),
                ("q2".to_string(), "False".to_string()),
            ]),
            score,
            completed_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = Store::in_memory().unwrap();
        let repo = store.progress();

        repo.put(&record("l1", 50)).unwrap();
        assert_eq!(repo.get("l1").unwrap(), Some(record("l1", 50)));
        assert_eq!(repo.get("other").unwrap(), None);
    }

    #[test]
    fn resubmission_overwrites() {
        let store = Store::in_memory().unwrap();
        let repo = store.progress();

        repo.put(&record("l1", 50)).unwrap();
        repo.put(&record("l1", 100)).unwrap();

        let stored = repo.get("l1").unwrap().unwrap();
        assert_eq!(stored.score, 100);
        assert_eq!(repo.get_all().unwrap().len(), 1);
    }
}
