//! Schema migrations for the MangaShelf SQLite database.
//!
//! Uses a `schema_version` table to track which migrations have been applied.
//! Each migration runs exactly once and is recorded with a timestamp.

use rusqlite::Connection;
use tracing::info;

/// Current schema version. Bump this when adding a new migration.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Returns the current schema version from the database (0 if table doesn't exist).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Runs all pending schema migrations against the provided connection.
///
/// Migrations are versioned: each runs exactly once and is recorded in
/// the `schema_version` table. Safe to call on every startup.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    // WAL and foreign keys are per-connection, not versioned
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_schema_version(conn);

    if current < 1 {
        migration_v1(conn)?;
        record_version(conn, 1, "Initial schema: manga, tags, bookmarks")?;
        info!(version = 1, "applied schema migration");
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<(), rusqlite::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![version, now, description],
    )?;
    Ok(())
}

/// V1: manga metadata, tags and bookmarks.
///
/// Bookmark row ids are never reused, so an undo can put a row back under
/// its old id. Bookmarks reference manga with `ON DELETE CASCADE`; manga rows must
/// therefore be upserted in place, never replaced.
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS manga (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            alt_title TEXT,
            url TEXT NOT NULL,
            public_url TEXT NOT NULL DEFAULT '',
            rating REAL NOT NULL DEFAULT -1,
            is_nsfw INTEGER NOT NULL DEFAULT 0,
            cover_url TEXT NOT NULL DEFAULT '',
            large_cover_url TEXT,
            state TEXT,
            author TEXT,
            source TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            key TEXT NOT NULL,
            source TEXT NOT NULL,
            UNIQUE(key, source)
        );

        CREATE TABLE IF NOT EXISTS manga_tags (
            manga_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (manga_id, tag_id),
            FOREIGN KEY (manga_id) REFERENCES manga(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_manga_tags_tag_id ON manga_tags(tag_id);

        CREATE TABLE IF NOT EXISTS bookmarks (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            manga_id INTEGER NOT NULL,
            chapter_id INTEGER NOT NULL,
            page INTEGER NOT NULL,
            scroll INTEGER NOT NULL DEFAULT 0,
            image_url TEXT NOT NULL DEFAULT '',
            percent REAL NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            UNIQUE(manga_id, chapter_id, page),
            FOREIGN KEY (manga_id) REFERENCES manga(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_bookmarks_manga_id ON bookmarks(manga_id);
        ",
    )
}
