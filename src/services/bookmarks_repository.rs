//! Bookmarks repository for MangaShelf.
//!
//! The async face of the bookmark store. Writes run as single transactions on
//! the blocking pool; `observe_*` methods return live queries that emit the
//! current result immediately and again after every commit touching the
//! tables they read.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use rusqlite::Connection;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::database::{Database, Table, TableSet};
use crate::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use crate::managers::manga_manager::{MangaManager, MangaManagerTrait};
use crate::services::reversible::{ReverseReport, ReversibleHandle};
use crate::types::bookmark::{Bookmark, MangaBookmarks};
use crate::types::errors::BookmarkError;
use crate::types::manga::Manga;
use crate::types::settings::StoreSettings;

/// Live query over the bookmark store.
pub type LiveQuery<T> = BoxStream<'static, Result<T, BookmarkError>>;

/// Trait defining the bookmark store operations.
#[async_trait]
pub trait BookmarksRepositoryTrait {
    /// The bookmark at `(manga_id, chapter_id, page)`, or `None`.
    fn observe_bookmark(&self, manga_id: i64, chapter_id: i64, page: i32) -> LiveQuery<Option<Bookmark>>;
    /// All bookmarks of one manga in insertion order.
    fn observe_bookmarks(&self, manga_id: i64) -> LiveQuery<Vec<Bookmark>>;
    /// Bookmarks of every manga that has at least one, keyed by manga id.
    fn observe_all(&self) -> LiveQuery<BTreeMap<i64, Vec<Bookmark>>>;
    /// Like `observe_all`, with each manga resolved, ordered by manga title.
    fn observe_grouped(&self) -> LiveQuery<Vec<MangaBookmarks>>;

    /// Saves `bookmark`, replacing any bookmark with the same composite key, and
    /// upserts `manga` with its tags in the same transaction. Returns the row id.
    async fn add(&self, manga: &Manga, bookmark: &Bookmark) -> Result<i64, BookmarkError>;
    /// Deletes exactly one bookmark; `NotFound` if nothing matched.
    async fn remove(&self, manga_id: i64, chapter_id: i64, page: i32) -> Result<(), BookmarkError>;
    async fn remove_bookmark(&self, bookmark: &Bookmark) -> Result<(), BookmarkError>;
    /// Deletes every listed row that exists, atomically, and returns a handle
    /// that can put them back. Unknown ids are skipped.
    async fn remove_bulk(&self, row_ids: &HashSet<i64>) -> Result<BookmarksRestorer, BookmarkError>;

    async fn find(&self, row_id: i64) -> Result<Option<Bookmark>, BookmarkError>;
    async fn get(&self, manga_id: i64, chapter_id: i64, page: i32) -> Result<Option<Bookmark>, BookmarkError>;
    async fn find_manga(&self, manga_id: i64) -> Result<Option<Manga>, BookmarkError>;
}

/// Bookmark store backed by a shared [`Database`].
#[derive(Clone)]
pub struct BookmarksRepository {
    db: Database,
    log_restore_conflicts: bool,
}

impl BookmarksRepository {
    /// Creates a repository over `db` with default settings.
    pub fn new(db: Database) -> Self {
        Self::with_settings(db, &StoreSettings::default())
    }

    pub fn with_settings(db: Database, settings: &StoreSettings) -> Self {
        Self {
            db,
            log_restore_conflicts: settings.log_restore_conflicts,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Runs `query` now and again after every commit that touches `tables`.
    ///
    /// Subscribes before the first query so no commit can slip between the
    /// initial read and the first wait. A lagging subscriber re-queries once
    /// instead of replaying every missed notification.
    fn watch<T, F>(&self, tables: &[Table], query: F) -> LiveQuery<T>
    where
        F: Fn(&Connection) -> Result<T, BookmarkError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let interest = TableSet::of(tables);
        let query = Arc::new(query);

        Box::pin(stream! {
            let mut changes = db.subscribe();
            loop {
                let q = Arc::clone(&query);
                yield db.read(move |conn| (*q)(conn)).await;

                loop {
                    match changes.recv().await {
                        Ok(touched) if touched.intersects(interest) => break,
                        Ok(_) => continue,
                        Err(RecvError::Lagged(missed)) => {
                            debug!(missed, "bookmark observer lagged, re-querying");
                            break;
                        }
                        Err(RecvError::Closed) => return,
                    }
                }
            }
        })
    }

    fn validate(manga: &Manga, bookmark: &Bookmark) -> Result<(), BookmarkError> {
        if bookmark.manga_id != manga.id {
            return Err(BookmarkError::InvalidBookmark(format!(
                "bookmark belongs to manga {} but manga {} was given",
                bookmark.manga_id, manga.id
            )));
        }
        if bookmark.page < 0 {
            return Err(BookmarkError::InvalidBookmark(format!(
                "page index must not be negative: {}",
                bookmark.page
            )));
        }
        if !(0.0..=1.0).contains(&bookmark.percent) {
            return Err(BookmarkError::InvalidBookmark(format!(
                "percent must be within [0, 1]: {}",
                bookmark.percent
            )));
        }
        Ok(())
    }

    fn resolve_groups(conn: &Connection) -> Result<Vec<MangaBookmarks>, BookmarkError> {
        let grouped = BookmarkManager::new(conn).list_grouped()?;
        let mangas = MangaManager::new(conn);

        let mut groups = Vec::with_capacity(grouped.len());
        for (manga_id, bookmarks) in grouped {
            match mangas.find_manga(manga_id)? {
                Some(manga) => groups.push(MangaBookmarks { manga, bookmarks }),
                None => debug!(manga_id, "bookmarks reference a missing manga, skipping group"),
            }
        }
        groups.sort_by(|a, b| {
            a.manga
                .title
                .cmp(&b.manga.title)
                .then(a.manga.id.cmp(&b.manga.id))
        });
        Ok(groups)
    }
}

#[async_trait]
impl BookmarksRepositoryTrait for BookmarksRepository {
    fn observe_bookmark(&self, manga_id: i64, chapter_id: i64, page: i32) -> LiveQuery<Option<Bookmark>> {
        self.watch(&[Table::Bookmarks], move |conn| {
            BookmarkManager::new(conn).find_by_key(manga_id, chapter_id, page)
        })
    }

    fn observe_bookmarks(&self, manga_id: i64) -> LiveQuery<Vec<Bookmark>> {
        self.watch(&[Table::Bookmarks], move |conn| {
            BookmarkManager::new(conn).list_for_manga(manga_id)
        })
    }

    fn observe_all(&self) -> LiveQuery<BTreeMap<i64, Vec<Bookmark>>> {
        self.watch(&[Table::Bookmarks], |conn| BookmarkManager::new(conn).list_grouped())
    }

    fn observe_grouped(&self) -> LiveQuery<Vec<MangaBookmarks>> {
        self.watch(&Table::ALL, Self::resolve_groups)
    }

    async fn add(&self, manga: &Manga, bookmark: &Bookmark) -> Result<i64, BookmarkError> {
        Self::validate(manga, bookmark)?;

        let manga = manga.clone();
        let bookmark = bookmark.clone();
        let row_id = self
            .db
            .write(&Table::ALL, move |tx| {
                MangaManager::new(tx).upsert_manga(&manga)?;
                BookmarkManager::new(tx).upsert(&bookmark)
            })
            .await?;

        debug!(row_id, "bookmark saved");
        Ok(row_id)
    }

    async fn remove(&self, manga_id: i64, chapter_id: i64, page: i32) -> Result<(), BookmarkError> {
        self.db
            .write(&[Table::Bookmarks], move |tx| {
                let affected = BookmarkManager::new(tx).delete_by_key(manga_id, chapter_id, page)?;
                if affected == 0 {
                    return Err(BookmarkError::NotFound {
                        manga_id,
                        chapter_id,
                        page,
                    });
                }
                Ok(())
            })
            .await?;

        debug!(manga_id, chapter_id, page, "bookmark removed");
        Ok(())
    }

    async fn remove_bookmark(&self, bookmark: &Bookmark) -> Result<(), BookmarkError> {
        self.remove(bookmark.manga_id, bookmark.chapter_id, bookmark.page)
            .await
    }

    async fn remove_bulk(&self, row_ids: &HashSet<i64>) -> Result<BookmarksRestorer, BookmarkError> {
        let mut ids: Vec<i64> = row_ids.iter().copied().collect();
        ids.sort_unstable();

        let captured = self
            .db
            .write(&[Table::Bookmarks], move |tx| {
                let bookmarks = BookmarkManager::new(tx);
                let mut captured = Vec::with_capacity(ids.len());
                for id in ids {
                    if let Some(bookmark) = bookmarks.find(id)? {
                        bookmarks.delete(id)?;
                        captured.push(bookmark);
                    }
                }
                Ok::<_, BookmarkError>(captured)
            })
            .await?;

        debug!(requested = row_ids.len(), removed = captured.len(), "bookmarks removed in bulk");
        Ok(BookmarksRestorer {
            db: self.db.clone(),
            captured,
            log_conflicts: self.log_restore_conflicts,
        })
    }

    async fn find(&self, row_id: i64) -> Result<Option<Bookmark>, BookmarkError> {
        self.db
            .read(move |conn| BookmarkManager::new(conn).find(row_id))
            .await
    }

    async fn get(&self, manga_id: i64, chapter_id: i64, page: i32) -> Result<Option<Bookmark>, BookmarkError> {
        self.db
            .read(move |conn| BookmarkManager::new(conn).find_by_key(manga_id, chapter_id, page))
            .await
    }

    async fn find_manga(&self, manga_id: i64) -> Result<Option<Manga>, BookmarkError> {
        self.db
            .read(move |conn| Ok::<_, BookmarkError>(MangaManager::new(conn).find_manga(manga_id)?))
            .await
    }
}

/// Undo handle returned by [`BookmarksRepository::remove_bulk`].
///
/// Holds the rows exactly as they were before deletion, row ids included.
pub struct BookmarksRestorer {
    db: Database,
    captured: Vec<Bookmark>,
    log_conflicts: bool,
}

impl BookmarksRestorer {
    /// The rows that were deleted, in row id order.
    pub fn captured(&self) -> &[Bookmark] {
        &self.captured
    }

    pub fn len(&self) -> usize {
        self.captured.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captured.is_empty()
    }
}

#[async_trait]
impl ReversibleHandle for BookmarksRestorer {
    /// Re-inserts every captured row in one fresh transaction.
    ///
    /// A row rejected by a constraint (its row id or composite key is taken
    /// again, or its manga is gone) is skipped; any other error rolls the whole
    /// reversal back.
    async fn reverse(&self) -> Result<ReverseReport, BookmarkError> {
        if self.captured.is_empty() {
            return Ok(ReverseReport::default());
        }

        let rows = self.captured.clone();
        let log_conflicts = self.log_conflicts;
        let report = self
            .db
            .write(&[Table::Bookmarks], move |tx| {
                let bookmarks = BookmarkManager::new(tx);
                let mut report = ReverseReport::default();
                for bookmark in &rows {
                    match bookmarks.insert_exact(bookmark) {
                        Ok(()) => report.restored += 1,
                        Err(BookmarkError::ConstraintViolation(reason)) => {
                            report.skipped += 1;
                            if log_conflicts {
                                warn!(
                                    row_id = ?bookmark.row_id,
                                    manga_id = bookmark.manga_id,
                                    %reason,
                                    "bookmark could not be restored"
                                );
                            }
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(report)
            })
            .await?;

        debug!(restored = report.restored, skipped = report.skipped, "bookmark removal reversed");
        Ok(report)
    }
}
