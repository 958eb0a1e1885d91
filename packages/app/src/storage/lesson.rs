//! Lesson collection.
//!
//! Vocabulary and questions are stored as JSON text columns; the rest of the
//! lesson maps to plain columns.

use std::sync::{Arc, Mutex, MutexGuard};

use memelingo_schema::{Lesson, ProficiencyLevel};
use rusqlite::{params, Connection, Row};

use crate::storage::{StorageError, StorageResult};

pub struct LessonRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LessonRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    pub fn put(&self, lesson: &Lesson) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::put_internal(&conn, lesson)
    }

    pub fn get(&self, id: &str) -> StorageResult<Option<Lesson>> {
        let conn = self.get_conn()?;
        Self::get_internal(&conn, id)
    }

    /// Returns every lesson, unsorted. Callers sort by `created_at`
    /// descending for display.
    pub fn get_all(&self) -> StorageResult<Vec<Lesson>> {
        let conn = self.get_conn()?;
        Self::get_all_internal(&conn)
    }

    pub fn delete(&self, id: &str) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::delete_internal(&conn, id)
    }

    pub fn put_internal(conn: &Connection, lesson: &Lesson) -> StorageResult<()> {
        let vocabulary = serde_json::to_string(&lesson.vocabulary)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let questions = serde_json::to_string(&lesson.questions)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO lesson (
                id, media_item_id, level, explanation, vocabulary, questions, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                media_item_id = excluded.media_item_id,
                level = excluded.level,
                explanation = excluded.explanation,
                vocabulary = excluded.vocabulary,
                questions = excluded.questions,
                created_at = excluded.created_at
            "#,
            params![
                lesson.id,
                lesson.media_item_id,
                lesson.level.as_str(),
                lesson.explanation,
                vocabulary,
                questions,
                lesson.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_internal(conn: &Connection, id: &str) -> StorageResult<Option<Lesson>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, media_item_id, level, explanation, vocabulary, questions, created_at
            FROM lesson
            WHERE id = ?1
            "#,
        )?;

        match stmt.query_row(params![id], lesson_row) {
            Ok(row) => Ok(Some(decode_lesson(row)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_all_internal(conn: &Connection) -> StorageResult<Vec<Lesson>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, media_item_id, level, explanation, vocabulary, questions, created_at
            FROM lesson
            "#,
        )?;

        let rows = stmt
            .query_map([], lesson_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(decode_lesson).collect()
    }

    pub fn delete_internal(conn: &Connection, id: &str) -> StorageResult<()> {
        conn.execute("DELETE FROM lesson WHERE id = ?1", params![id])?;
        Ok(())
    }
}

struct LessonRow {
    id: String,
    media_item_id: String,
    level: String,
    explanation: String,
    vocabulary: String,
    questions: String,
    created_at: i64,
}

fn lesson_row(row: &Row) -> rusqlite::Result<LessonRow> {
    Ok(LessonRow {
        id: row.get("id")?,
        media_item_id: row.get("media_item_id")?,
        level: row.get("level")?,
        explanation: row.get("explanation")?,
        vocabulary: row.get("vocabulary")?,
        questions: row.get("questions")?,
        created_at: row.get("created_at")?,
    })
}

fn decode_lesson(row: LessonRow) -> StorageResult<Lesson> {
    let level = ProficiencyLevel::parse(&row.level).ok_or_else(|| {
        StorageError::Serialization(format!("unknown proficiency level: {}", row.level))
    })?;
    let vocabulary = serde_json::from_str(&row.vocabulary)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    let questions = serde_json::from_str(&row.questions)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

    Ok(Lesson {
        id: row.id,
        media_item_id: row.media_item_id,
        level,
        explanation: row.explanation,
        vocabulary,
        questions,
        created_at: row.created_at,
    })
}
