//! Saved-lesson markers.
//!
//! A marker's presence means the lesson is bookmarked; a lesson without a
//! marker was generated but never saved.

use std::sync::{Arc, Mutex, MutexGuard};

use memelingo_schema::{now_millis, SavedLessonMarker};
use rusqlite::{params, Connection, Row};

use crate::storage::{StorageError, StorageResult};

pub struct SavedLessonRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SavedLessonRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    /// Creates or overwrites the marker for `lesson_id` with the current
    /// timestamp.
    pub fn mark_saved(&self, lesson_id: &str) -> StorageResult<SavedLessonMarker> {
        let marker = SavedLessonMarker {
            lesson_id: lesson_id.to_string(),
            saved_at: now_millis(),
        };

        let conn = self.get_conn()?;
        Self::put_internal(&conn, &marker)?;
        Ok(marker)
    }

    pub fn is_saved(&self, lesson_id: &str) -> StorageResult<bool> {
        let conn = self.get_conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM saved_lesson WHERE lesson_id = ?1)",
            params![lesson_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Returns all markers, unsorted.
    pub fn get_all(&self) -> StorageResult<Vec<SavedLessonMarker>> {
        let conn = self.get_conn()?;
        Self::get_all_internal(&conn)
    }

    pub fn put_internal(conn: &Connection, marker: &SavedLessonMarker) -> StorageResult<()> {
        conn.execute(
            r#"
            INSERT INTO saved_lesson (lesson_id, saved_at)
            VALUES (?1, ?2)
            ON CONFLICT(lesson_id) DO UPDATE SET saved_at = excluded.saved_at
            "#,
            params![marker.lesson_id, marker.saved_at],
        )?;
        Ok(())
    }

    pub fn get_all_internal(conn: &Connection) -> StorageResult<Vec<SavedLessonMarker>> {
        let mut stmt = conn.prepare("SELECT lesson_id, saved_at FROM saved_lesson")?;

        let markers = stmt
            .query_map([], marker_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(markers)
    }
}

fn marker_from_row(row: &Row) -> rusqlite::Result<SavedLessonMarker> {
    Ok(SavedLessonMarker {
        lesson_id: row.get("lesson_id")?,
        saved_at: row.get("saved_at")?,
    })
}
