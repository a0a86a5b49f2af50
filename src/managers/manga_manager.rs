//! Manga Manager for MangaShelf.
//!
//! Upserts and resolves the manga and tag metadata that bookmarks point at.
//! Runs synchronously against whatever connection or transaction it is given,
//! so the caller decides the transactional scope.

use rusqlite::{params, Connection, OptionalExtension};

use crate::types::errors::MangaError;
use crate::types::manga::{Manga, MangaState, MangaTag};

/// Trait defining manga metadata operations.
pub trait MangaManagerTrait {
    /// Inserts or updates the given tags and returns their row ids in input order.
    fn upsert_tags(&self, tags: &[MangaTag]) -> Result<Vec<i64>, MangaError>;
    /// Inserts or updates the manga row and replaces its tag associations.
    fn upsert_manga(&self, manga: &Manga) -> Result<(), MangaError>;
    fn find_manga(&self, id: i64) -> Result<Option<Manga>, MangaError>;
    fn get_manga(&self, id: i64) -> Result<Manga, MangaError>;
}

/// Manga manager backed by a SQLite connection.
pub struct MangaManager<'a> {
    conn: &'a Connection,
}

impl<'a> MangaManager<'a> {
    /// Creates a new `MangaManager` using the provided database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn row_to_manga(row: &rusqlite::Row) -> rusqlite::Result<Manga> {
        let state: Option<String> = row.get(9)?;
        Ok(Manga {
            id: row.get(0)?,
            title: row.get(1)?,
            alt_title: row.get(2)?,
            url: row.get(3)?,
            public_url: row.get(4)?,
            rating: row.get(5)?,
            is_nsfw: row.get(6)?,
            cover_url: row.get(7)?,
            large_cover_url: row.get(8)?,
            // Unknown states written by newer builds read back as "no state"
            state: state.and_then(|s| s.parse::<MangaState>().ok()),
            author: row.get(10)?,
            source: row.get(11)?,
            tags: Vec::new(),
        })
    }

    fn tags_for(&self, manga_id: i64) -> Result<Vec<MangaTag>, MangaError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.title, t.key, t.source FROM tags t \
             JOIN manga_tags mt ON mt.tag_id = t.id \
             WHERE mt.manga_id = ?1 ORDER BY t.title",
        )?;
        let rows = stmt.query_map(params![manga_id], |row| {
            Ok(MangaTag {
                title: row.get(0)?,
                key: row.get(1)?,
                source: row.get(2)?,
            })
        })?;

        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }
}

impl<'a> MangaManagerTrait for MangaManager<'a> {
    fn upsert_tags(&self, tags: &[MangaTag]) -> Result<Vec<i64>, MangaError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO tags (title, key, source) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key, source) DO UPDATE SET title = excluded.title \
             RETURNING id",
        )?;

        let mut ids = Vec::with_capacity(tags.len());
        for tag in tags {
            let id: i64 = stmt.query_row(params![tag.title, tag.key, tag.source], |row| row.get(0))?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Updates in place on conflict. A `REPLACE` would delete the old row
    /// first and cascade the delete into the manga's bookmarks.
    fn upsert_manga(&self, manga: &Manga) -> Result<(), MangaError> {
        self.conn.execute(
            "INSERT INTO manga (id, title, alt_title, url, public_url, rating, is_nsfw, \
                                cover_url, large_cover_url, state, author, source) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
             ON CONFLICT(id) DO UPDATE SET \
                title = excluded.title, alt_title = excluded.alt_title, url = excluded.url, \
                public_url = excluded.public_url, rating = excluded.rating, \
                is_nsfw = excluded.is_nsfw, cover_url = excluded.cover_url, \
                large_cover_url = excluded.large_cover_url, state = excluded.state, \
                author = excluded.author, source = excluded.source",
            params![
                manga.id,
                manga.title,
                manga.alt_title,
                manga.url,
                manga.public_url,
                manga.rating,
                manga.is_nsfw,
                manga.cover_url,
                manga.large_cover_url,
                manga.state.map(|s| s.as_str()),
                manga.author,
                manga.source,
            ],
        )?;

        let tag_ids = self.upsert_tags(&manga.tags)?;
        self.conn
            .execute("DELETE FROM manga_tags WHERE manga_id = ?1", params![manga.id])?;
        let mut link = self.conn.prepare_cached(
            "INSERT OR IGNORE INTO manga_tags (manga_id, tag_id) VALUES (?1, ?2)",
        )?;
        for tag_id in tag_ids {
            link.execute(params![manga.id, tag_id])?;
        }
        Ok(())
    }

    fn find_manga(&self, id: i64) -> Result<Option<Manga>, MangaError> {
        let manga = self
            .conn
            .query_row(
                "SELECT id, title, alt_title, url, public_url, rating, is_nsfw, cover_url, \
                        large_cover_url, state, author, source \
                 FROM manga WHERE id = ?1",
                params![id],
                Self::row_to_manga,
            )
            .optional()?;

        match manga {
            Some(mut m) => {
                m.tags = self.tags_for(m.id)?;
                Ok(Some(m))
            }
            None => Ok(None),
        }
    }

    fn get_manga(&self, id: i64) -> Result<Manga, MangaError> {
        self.find_manga(id)?.ok_or(MangaError::NotFound(id))
    }
}
