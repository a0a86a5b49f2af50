//! MangaShelf: the bookmark store of a manga reader.
//!
//! A transactional SQLite store for reading-position bookmarks, with live
//! queries that re-emit on every relevant commit and an undoable bulk delete.
//! This library crate exposes all modules for use by the RPC binary and
//! integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
