//! SQLite database connection management for MangaShelf.
//!
//! Provides the [`Database`] handle: a single `rusqlite::Connection` behind a
//! mutex, driven from tokio's blocking pool, plus a broadcast channel that
//! announces which tables every committed transaction touched.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use super::invalidation::{Table, TableSet};
use super::migrations;
use crate::types::errors::DatabaseError;
use crate::types::settings::StoreSettings;

struct Shared {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<TableSet>,
}

/// Cloneable handle to the store's SQLite database.
///
/// All clones share one connection; SQLite work is serialized through it and
/// always runs on the blocking pool, never on an async worker thread.
#[derive(Clone)]
pub struct Database {
    shared: Arc<Shared>,
}

impl Database {
    /// Opens (or creates) a SQLite database at the given file path and runs migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Sqlite` if the connection cannot be established or migrations fail.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        Self::open_with(path, &StoreSettings::default())
    }

    /// Like [`Database::open`], sizing the change channel from `settings`.
    pub fn open_with<P: AsRef<Path>>(path: P, settings: &StoreSettings) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened bookmark database");
        Self::from_connection(conn, settings.observer_capacity)
    }

    /// Opens an in-memory SQLite database and runs migrations.
    ///
    /// Useful for testing; the database is discarded when the last handle is dropped.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, StoreSettings::default().observer_capacity)
    }

    fn from_connection(conn: Connection, capacity: usize) -> Result<Self, DatabaseError> {
        migrations::run_all(&conn)?;
        let (changes, _) = broadcast::channel(capacity.max(1));
        Ok(Self {
            shared: Arc::new(Shared {
                conn: Mutex::new(conn),
                changes,
            }),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.shared.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    /// Subscribes to table change notifications.
    ///
    /// Only commits that happen after this call are delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<TableSet> {
        self.shared.changes.subscribe()
    }

    /// Runs a read-only closure against the connection on the blocking pool.
    pub async fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DatabaseError> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock()?;
            f(&conn)
        })
        .await
        .map_err(DatabaseError::from)?
    }

    /// Runs `f` inside one IMMEDIATE transaction on the blocking pool.
    ///
    /// On success the transaction is committed and a notification naming
    /// `tables` is published. If `f` fails, the transaction rolls back and no
    /// notification is sent. Once the blocking task has started it runs to
    /// commit or rollback even if the returned future is dropped.
    pub async fn write<T, E, F>(&self, tables: &[Table], f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DatabaseError> + Send + 'static,
    {
        let db = self.clone();
        let touched = TableSet::of(tables);
        tokio::task::spawn_blocking(move || {
            let mut conn = db.lock()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(DatabaseError::from)?;
            let value = f(&tx)?;
            tx.commit().map_err(DatabaseError::from)?;
            drop(conn);
            db.publish(touched);
            Ok(value)
        })
        .await
        .map_err(DatabaseError::from)?
    }

    fn publish(&self, touched: TableSet) {
        if touched.is_empty() {
            return;
        }
        // No receivers is not an error: nobody is observing right now.
        let receivers = self.shared.changes.send(touched).unwrap_or(0);
        trace!(tables = ?touched, receivers, "published table change");
    }
}
