// MangaShelf row managers
// Synchronous table access over a borrowed connection or transaction.

pub mod bookmark_manager;
pub mod manga_manager;
