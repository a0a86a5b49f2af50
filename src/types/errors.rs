use rusqlite::ErrorCode;
use thiserror::Error;

// === DatabaseError ===

/// Errors raised by the database layer itself, independent of any table.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLite reported an error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A previous holder of the connection lock panicked.
    #[error("Database connection lock poisoned")]
    Poisoned,
    /// The blocking task running the statement failed to complete.
    #[error("Database task failed: {0}")]
    TaskFailed(String),
}

impl From<tokio::task::JoinError> for DatabaseError {
    fn from(err: tokio::task::JoinError) -> Self {
        DatabaseError::TaskFailed(err.to_string())
    }
}

/// Returns `true` if the SQLite error is a constraint violation
/// (UNIQUE, PRIMARY KEY, FOREIGN KEY, NOT NULL or CHECK).
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

// === BookmarkError ===

/// Errors related to bookmark store operations.
#[derive(Debug, Error)]
pub enum BookmarkError {
    /// A targeted delete matched no row.
    #[error("Bookmark not found: manga {manga_id}, chapter {chapter_id}, page {page}")]
    NotFound {
        manga_id: i64,
        chapter_id: i64,
        page: i32,
    },
    /// A uniqueness or foreign key constraint rejected a write.
    #[error("Bookmark constraint violation: {0}")]
    ConstraintViolation(String),
    /// The bookmark failed validation before reaching the database.
    #[error("Invalid bookmark: {0}")]
    InvalidBookmark(String),
    /// Any other persistence failure; the transaction was rolled back.
    #[error("Bookmark transaction failed: {0}")]
    TransactionFailure(String),
}

impl From<rusqlite::Error> for BookmarkError {
    fn from(err: rusqlite::Error) -> Self {
        if is_constraint_violation(&err) {
            BookmarkError::ConstraintViolation(err.to_string())
        } else {
            BookmarkError::TransactionFailure(err.to_string())
        }
    }
}

impl From<DatabaseError> for BookmarkError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Sqlite(e) => e.into(),
            other => BookmarkError::TransactionFailure(other.to_string()),
        }
    }
}

impl From<MangaError> for BookmarkError {
    fn from(err: MangaError) -> Self {
        BookmarkError::TransactionFailure(err.to_string())
    }
}

// === MangaError ===

/// Errors related to manga metadata lookups and upserts.
#[derive(Debug, Error)]
pub enum MangaError {
    /// Manga with the given ID was not found.
    #[error("Manga not found: {0}")]
    NotFound(i64),
    /// Database operation failed.
    #[error("Manga database error: {0}")]
    DatabaseError(String),
}

impl From<rusqlite::Error> for MangaError {
    fn from(err: rusqlite::Error) -> Self {
        MangaError::DatabaseError(err.to_string())
    }
}

impl From<DatabaseError> for MangaError {
    fn from(err: DatabaseError) -> Self {
        MangaError::DatabaseError(err.to_string())
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}
