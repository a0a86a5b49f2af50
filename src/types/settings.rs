use serde::{Deserialize, Serialize};

/// Store and RPC process configuration, persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSettings {
    /// Path of the SQLite file. `None` means `<data_dir>/mangashelf.db`.
    pub database_path: Option<String>,
    /// Buffered change notifications per observer before it is considered lagging.
    pub observer_capacity: usize,
    /// Emit a warning for every bookmark an undo could not restore.
    pub log_restore_conflicts: bool,
    /// RPC requests accepted per second before rejecting.
    pub max_requests_per_second: u32,
    /// Default `tracing` filter when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            observer_capacity: 64,
            log_restore_conflicts: true,
            max_requests_per_second: 200,
            log_filter: "mangashelf=info".to_string(),
        }
    }
}
