// MangaShelf services
// The async bookmark store, its undo handles and configuration.

pub mod bookmarks_repository;
pub mod reversible;
pub mod settings_engine;
