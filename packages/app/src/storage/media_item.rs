//! Media item collection: the re-fetchable feed cache.

use std::sync::{Arc, Mutex, MutexGuard};

use memelingo_schema::MediaItem;
use rusqlite::{params, Connection, Row};

use crate::storage::{StorageError, StorageResult};

/// Repository over the `media_item` collection.
///
/// Usable either through the thread-safe handle or, inside a transaction,
/// through the `_internal` methods taking a plain `&Connection`.
pub struct MediaItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MediaItemRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    /// Upserts each item by id, one statement per item. There is no batch
    /// atomicity: a failure partway through leaves the earlier items written.
    pub fn put_batch(&self, items: &[MediaItem]) -> StorageResult<()> {
        let conn = self.get_conn()?;
        for item in items {
            Self::put_internal(&conn, item)?;
        }
        Ok(())
    }

    pub fn put(&self, item: &MediaItem) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::put_internal(&conn, item)
    }

    /// Returns items in insertion order, sliced by `offset`/`limit`. Fewer
    /// than `limit` items come back when the collection runs out.
    pub fn list(&self, limit: usize, offset: usize) -> StorageResult<Vec<MediaItem>> {
        let conn = self.get_conn()?;
        Self::list_internal(&conn, limit, offset)
    }

    pub fn get(&self, id: &str) -> StorageResult<Option<MediaItem>> {
        let conn = self.get_conn()?;
        Self::get_internal(&conn, id)
    }

    pub fn put_internal(conn: &Connection, item: &MediaItem) -> StorageResult<()> {
        // ON CONFLICT UPDATE keeps the row's rowid, so an overwritten item
        // stays at its original insertion position.
        conn.execute(
            r#"
            INSERT INTO media_item (
                id, title, source_url, origin_subreddit, permalink,
                upvote_count, author, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                source_url = excluded.source_url,
                origin_subreddit = excluded.origin_subreddit,
                permalink = excluded.permalink,
                upvote_count = excluded.upvote_count,
                author = excluded.author,
                created_at = excluded.created_at
            "#,
            params![
                item.id,
                item.title,
                item.source_url,
                item.origin_subreddit,
                item.permalink,
                item.upvote_count,
                item.author,
                item.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn list_internal(
        conn: &Connection,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<MediaItem>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, title, source_url, origin_subreddit, permalink,
                   upvote_count, author, created_at
            FROM media_item
            ORDER BY rowid ASC
            LIMIT ?1 OFFSET ?2
            "#,
        )?;

        let items = stmt
            .query_map(params![limit as i64, offset as i64], media_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn get_internal(conn: &Connection, id: &str) -> StorageResult<Option<MediaItem>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, title, source_url, origin_subreddit, permalink,
                   upvote_count, author, created_at
            FROM media_item
            WHERE id = ?1
            "#,
        )?;

        match stmt.query_row(params![id], media_item_from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn media_item_from_row(row: &Row) -> rusqlite::Result<MediaItem> {
    Ok(MediaItem {
        id: row.get("id")?,
        title: row.get("title")?,
        source_url: row.get("source_url")?,
        origin_subreddit: row.get("origin_subreddit")?,
        permalink: row.get("permalink")?,
        upvote_count: row.get("upvote_count")?,
        author: row.get("author")?,
        created_at: row.get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use crate::storage::Store;

    use super::*;

    fn item(id: &str, title: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            title: title.to_string(),
            source_url: format!("https://i.redd.it/{id}.png"),
            origin_subreddit: "r/wholesomememes".to_string(),
            permalink: format!("https://reddit.com/r/wholesomememes/{id}"),
            upvote_count: 42,
            author: "author".to_string(),
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn list_slices_in_insertion_order() {
        let store = Store::in_memory().unwrap();
        let repo = store.media_items();

        let items: Vec<MediaItem> = (0..5).map(|i| item(&format!("m{i}"), "title")).collect();
        repo.put_batch(&items).unwrap();

        let all = repo.list(20, 0).unwrap();
        assert_eq!(all, items);

        let slice = repo.list(2, 1).unwrap();
        assert_eq!(slice, items[1..3].to_vec());

        let tail = repo.list(10, 3).unwrap();
        assert_eq!(tail, items[3..].to_vec());

        assert!(repo.list(10, 99).unwrap().is_empty());
    }

    #[test]
    fn upsert_is_last_write_wins_and_keeps_position() {
        let store = Store::in_memory().unwrap();
        let repo = store.media_items();

        repo.put_batch(&[item("a", "first"), item("b", "second"), item("c", "third")])
            .unwrap();

        let updated = item("b", "second, refreshed");
        repo.put(&updated).unwrap();

        let all = repo.list(20, 0).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1], updated);
        assert_eq!(all[0].id, "a");
        assert_eq!(all[2].id, "c");
    }

    #[test]
    fn get_missing_returns_none() {
        let store = Store::in_memory().unwrap();
        let repo = store.media_items();

        assert_eq!(repo.get("nope").unwrap(), None);

        repo.put(&item("m1", "hello")).unwrap();
        assert_eq!(repo.get("m1").unwrap(), Some(item("m1", "hello")));
    }
}
