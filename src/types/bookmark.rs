use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::manga::Manga;

/// A saved reading position inside a manga chapter.
///
/// Identity is the composite key `(manga_id, chapter_id, page)`; `row_id` is
/// assigned by the store and is `None` until the bookmark has been saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(default)]
    pub row_id: Option<i64>,
    pub manga_id: i64,
    pub chapter_id: i64,
    /// Zero-based page index within the chapter.
    pub page: i32,
    /// Sub-page scroll offset.
    #[serde(default)]
    pub scroll: i32,
    #[serde(default)]
    pub image_url: String,
    /// Reading progress through the whole manga, in `[0, 1]`.
    #[serde(default)]
    pub percent: f32,
    /// UNIX timestamp in milliseconds.
    pub created_at: i64,
}

impl Bookmark {
    /// Creates an unsaved bookmark stamped with the current time.
    pub fn new(manga_id: i64, chapter_id: i64, page: i32) -> Self {
        Self {
            row_id: None,
            manga_id,
            chapter_id,
            page,
            scroll: 0,
            image_url: String::new(),
            percent: 0.0,
            created_at: now_millis(),
        }
    }

    pub fn with_scroll(mut self, scroll: i32) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    pub fn with_percent(mut self, percent: f32) -> Self {
        self.percent = percent;
        self
    }

    /// Returns the composite key `(manga_id, chapter_id, page)`.
    pub fn key(&self) -> (i64, i64, i32) {
        (self.manga_id, self.chapter_id, self.page)
    }
}

/// Bookmarks of a single manga together with the resolved manga record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MangaBookmarks {
    pub manga: Manga,
    pub bookmarks: Vec<Bookmark>,
}

/// Returns the current UNIX timestamp in milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
