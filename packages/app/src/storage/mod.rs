//! Local persistence store.
//!
//! A SQLite-backed record store surviving restarts, organized into four
//! independent collections keyed by id: media items (re-fetchable cache),
//! lessons, progress records and saved-lesson markers. The store is an
//! explicitly constructed value handed to its callers; opening it runs the
//! schema migrations, so a `Store` is always ready for use.

pub mod lesson;
pub mod media_item;
pub mod migrations;
pub mod progress;
pub mod saved;

pub use lesson::LessonRepository;
pub use media_item::MediaItemRepository;
pub use migrations::run_migrations;
pub use progress::ProgressRepository;
pub use saved::SavedLessonRepository;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// The local database could not be opened or brought up to date. Fatal
    /// for this session's persistence; callers fall back to freshly fetched
    /// data.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("lock error: {0}")]
    Lock(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Handle to the local database and its collections.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl Store {
    /// Opens (creating on first use) the database at `db_path` and runs
    /// pending migrations.
    pub fn open<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        let connection =
            Connection::open(&db_path).map_err(|e| StorageError::Unavailable(e.to_string()))?;

        connection
            .execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA foreign_keys=ON;",
            )
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        Self::finish_open(connection, path_str)
    }

    /// Opens a private in-memory database, used by tests and as a fake for
    /// callers of the real store.
    pub fn in_memory() -> StorageResult<Self> {
        let connection =
            Connection::open_in_memory().map_err(|e| StorageError::Unavailable(e.to_string()))?;

        connection
            .execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        Self::finish_open(connection, ":memory:".to_string())
    }

    fn finish_open(connection: Connection, db_path: String) -> StorageResult<Self> {
        migrations::run_migrations(&connection)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(connection)),
            db_path,
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn get_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    pub fn media_items(&self) -> MediaItemRepository {
        MediaItemRepository::new(Arc::clone(&self.conn))
    }

    pub fn lessons(&self) -> LessonRepository {
        LessonRepository::new(Arc::clone(&self.conn))
    }

    pub fn progress(&self) -> ProgressRepository {
        ProgressRepository::new(Arc::clone(&self.conn))
    }

    pub fn saved_lessons(&self) -> SavedLessonRepository {
        SavedLessonRepository::new(Arc::clone(&self.conn))
    }

    /// Runs `f` inside a single transaction.
    pub fn transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let mut conn = self.get_conn()?;

        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;

        Ok(result)
    }

    /// Deletes all lessons, saved-lesson markers and progress records in one
    /// transaction. Media items are deliberately preserved: they are a
    /// re-fetchable cache, not user data.
    pub fn clear_all(&self) -> StorageResult<()> {
        self.transaction(|conn| {
            conn.execute("DELETE FROM lesson", [])?;
            conn.execute("DELETE FROM saved_lesson", [])?;
            conn.execute("DELETE FROM progress_record", [])?;
            Ok(())
        })
    }
}
