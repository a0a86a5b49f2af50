//! Bookmark Manager for MangaShelf.
//!
//! Implements `BookmarkManagerTrait`: row-level reads and writes on the
//! `bookmarks` table, backed by SQLite via `rusqlite`. Transactions and
//! change notifications belong to the caller; see
//! [`BookmarksRepository`](crate::services::bookmarks_repository::BookmarksRepository).

use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension};

use crate::types::bookmark::Bookmark;
use crate::types::errors::BookmarkError;

const COLUMNS: &str = "row_id, manga_id, chapter_id, page, scroll, image_url, percent, created_at";

/// Trait defining bookmark row operations.
pub trait BookmarkManagerTrait {
    /// Inserts the bookmark, replacing any row with the same composite key.
    /// Returns the new row id.
    fn upsert(&self, bookmark: &Bookmark) -> Result<i64, BookmarkError>;
    /// Inserts the bookmark with its own `row_id`, failing on any conflict.
    fn insert_exact(&self, bookmark: &Bookmark) -> Result<(), BookmarkError>;
    fn find(&self, row_id: i64) -> Result<Option<Bookmark>, BookmarkError>;
    fn find_by_key(&self, manga_id: i64, chapter_id: i64, page: i32) -> Result<Option<Bookmark>, BookmarkError>;
    /// Deletes by composite key and returns the number of rows removed.
    fn delete_by_key(&self, manga_id: i64, chapter_id: i64, page: i32) -> Result<usize, BookmarkError>;
    fn delete(&self, row_id: i64) -> Result<usize, BookmarkError>;
    /// Bookmarks of one manga in insertion order.
    fn list_for_manga(&self, manga_id: i64) -> Result<Vec<Bookmark>, BookmarkError>;
    /// All bookmarks grouped by manga id, each group in insertion order.
    fn list_grouped(&self) -> Result<BTreeMap<i64, Vec<Bookmark>>, BookmarkError>;
    fn count(&self) -> Result<i64, BookmarkError>;
}

/// Bookmark manager backed by a SQLite connection.
pub struct BookmarkManager<'a> {
    conn: &'a Connection,
}

impl<'a> BookmarkManager<'a> {
    /// Creates a new `BookmarkManager` using the provided database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Reads a single `Bookmark` row into a struct.
    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        Ok(Bookmark {
            row_id: Some(row.get(0)?),
            manga_id: row.get(1)?,
            chapter_id: row.get(2)?,
            page: row.get(3)?,
            scroll: row.get(4)?,
            image_url: row.get(5)?,
            percent: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn collect(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Bookmark>, BookmarkError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(args, Self::row_to_bookmark)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

impl<'a> BookmarkManagerTrait for BookmarkManager<'a> {
    fn upsert(&self, bookmark: &Bookmark) -> Result<i64, BookmarkError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO bookmarks \
             (manga_id, chapter_id, page, scroll, image_url, percent, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                bookmark.manga_id,
                bookmark.chapter_id,
                bookmark.page,
                bookmark.scroll,
                bookmark.image_url,
                bookmark.percent,
                bookmark.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_exact(&self, bookmark: &Bookmark) -> Result<(), BookmarkError> {
        self.conn.execute(
            &format!("INSERT INTO bookmarks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)", COLUMNS),
            params![
                bookmark.row_id,
                bookmark.manga_id,
                bookmark.chapter_id,
                bookmark.page,
                bookmark.scroll,
                bookmark.image_url,
                bookmark.percent,
                bookmark.created_at,
            ],
        )?;
        Ok(())
    }

    fn find(&self, row_id: i64) -> Result<Option<Bookmark>, BookmarkError> {
        let bookmark = self
            .conn
            .query_row(
                &format!("SELECT {} FROM bookmarks WHERE row_id = ?1", COLUMNS),
                params![row_id],
                Self::row_to_bookmark,
            )
            .optional()?;
        Ok(bookmark)
    }

    fn find_by_key(&self, manga_id: i64, chapter_id: i64, page: i32) -> Result<Option<Bookmark>, BookmarkError> {
        let bookmark = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM bookmarks WHERE manga_id = ?1 AND chapter_id = ?2 AND page = ?3",
                    COLUMNS
                ),
                params![manga_id, chapter_id, page],
                Self::row_to_bookmark,
            )
            .optional()?;
        Ok(bookmark)
    }

    fn delete_by_key(&self, manga_id: i64, chapter_id: i64, page: i32) -> Result<usize, BookmarkError> {
        let affected = self.conn.execute(
            "DELETE FROM bookmarks WHERE manga_id = ?1 AND chapter_id = ?2 AND page = ?3",
            params![manga_id, chapter_id, page],
        )?;
        Ok(affected)
    }

    fn delete(&self, row_id: i64) -> Result<usize, BookmarkError> {
        let affected = self
            .conn
            .execute("DELETE FROM bookmarks WHERE row_id = ?1", params![row_id])?;
        Ok(affected)
    }

    fn list_for_manga(&self, manga_id: i64) -> Result<Vec<Bookmark>, BookmarkError> {
        self.collect(
            &format!("SELECT {} FROM bookmarks WHERE manga_id = ?1 ORDER BY row_id", COLUMNS),
            params![manga_id],
        )
    }

    fn list_grouped(&self) -> Result<BTreeMap<i64, Vec<Bookmark>>, BookmarkError> {
        let all = self.collect(
            &format!("SELECT {} FROM bookmarks ORDER BY manga_id, row_id", COLUMNS),
            [],
        )?;

        let mut grouped: BTreeMap<i64, Vec<Bookmark>> = BTreeMap::new();
        for bookmark in all {
            grouped.entry(bookmark.manga_id).or_default().push(bookmark);
        }
        Ok(grouped)
    }

    fn count(&self) -> Result<i64, BookmarkError> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM bookmarks", [], |row| row.get(0))?;
        Ok(n)
    }
}
