//! App Core for MangaShelf.
//!
//! Owns the database, the bookmark repository and the settings, plus the
//! per-process state the RPC surface needs: pending undo handles and live
//! subscriptions.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::Database;
use crate::services::bookmarks_repository::BookmarksRepository;
use crate::services::reversible::ReversibleHandle;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::errors::DatabaseError;

/// Undo handles kept per process; older ones are dropped first.
pub const MAX_PENDING_UNDO: usize = 32;

#[derive(Default)]
struct UndoRegistry {
    order: VecDeque<String>,
    handles: HashMap<String, Box<dyn ReversibleHandle>>,
}

/// Central application struct.
pub struct App {
    pub db: Database,
    pub bookmarks: BookmarksRepository,
    pub settings_engine: SettingsEngine,
    pending_undo: Mutex<UndoRegistry>,
    subscriptions: Mutex<HashMap<String, JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The guarded maps stay consistent even if a holder panicked mid-insert.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl App {
    /// Opens the database at `db_path` using the already loaded settings.
    pub fn new<P: AsRef<Path>>(db_path: P, settings_engine: SettingsEngine) -> Result<Self, DatabaseError> {
        let db = Database::open_with(&db_path, settings_engine.get_settings())?;
        info!(path = %db_path.as_ref().display(), "bookmark store ready");
        Ok(Self::with_database(db, settings_engine))
    }

    /// Creates an App over an in-memory database with default settings.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(db, SettingsEngine::new(None)))
    }

    fn with_database(db: Database, settings_engine: SettingsEngine) -> Self {
        let bookmarks = BookmarksRepository::with_settings(db.clone(), settings_engine.get_settings());
        Self {
            db,
            bookmarks,
            settings_engine,
            pending_undo: Mutex::new(UndoRegistry::default()),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Stores an undo handle and returns the token that redeems it.
    pub fn register_undo(&self, handle: Box<dyn ReversibleHandle>) -> String {
        let token = Uuid::new_v4().to_string();
        let mut registry = lock(&self.pending_undo);
        registry.order.push_back(token.clone());
        registry.handles.insert(token.clone(), handle);
        while registry.order.len() > MAX_PENDING_UNDO {
            if let Some(expired) = registry.order.pop_front() {
                registry.handles.remove(&expired);
                debug!(token = %expired, "undo handle expired");
            }
        }
        token
    }

    /// Removes and returns the undo handle for `token`. Each token redeems once.
    pub fn take_undo(&self, token: &str) -> Option<Box<dyn ReversibleHandle>> {
        let mut registry = lock(&self.pending_undo);
        let handle = registry.handles.remove(token)?;
        registry.order.retain(|t| t != token);
        Some(handle)
    }

    pub fn pending_undo_count(&self) -> usize {
        lock(&self.pending_undo).handles.len()
    }

    /// Tracks a running subscription task under `id`.
    pub fn add_subscription(&self, id: String, task: JoinHandle<()>) {
        if let Some(previous) = lock(&self.subscriptions).insert(id, task) {
            previous.abort();
        }
    }

    /// Stops a subscription. Returns `false` if the id is unknown.
    pub fn cancel_subscription(&self, id: &str) -> bool {
        match lock(&self.subscriptions).remove(id) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn subscription_count(&self) -> usize {
        lock(&self.subscriptions).len()
    }

    /// Stops every subscription and forgets pending undo handles.
    pub fn shutdown(&self) {
        for (_, task) in lock(&self.subscriptions).drain() {
            task.abort();
        }
        let mut registry = lock(&self.pending_undo);
        registry.order.clear();
        registry.handles.clear();
        info!("bookmark store shut down");
    }
}
