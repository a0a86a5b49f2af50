//! MangaShelf database layer.
//!
//! Provides the serialized SQLite connection, schema migrations and the
//! table-level change bus that live queries subscribe to.
//!
//! # Usage
//!
//! ```no_run
//! use mangashelf::database::{Database, Table};
//!
//! # async fn demo() -> Result<(), mangashelf::types::errors::DatabaseError> {
//! let db = Database::open_in_memory()?;
//! let mut changes = db.subscribe();
//!
//! db.write(&[Table::Bookmarks], |tx| {
//!     tx.execute("DELETE FROM bookmarks", [])?;
//!     Ok::<_, mangashelf::types::errors::DatabaseError>(())
//! })
//! .await?;
//!
//! let touched = changes.recv().await.expect("change published");
//! assert!(touched.contains(Table::Bookmarks));
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod invalidation;
pub mod migrations;

pub use connection::Database;
pub use invalidation::{Table, TableSet};
