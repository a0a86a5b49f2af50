// MangaShelf shared type definitions
// Each submodule defines types used across the store, the managers and the RPC surface.

pub mod bookmark;
pub mod errors;
pub mod manga;
pub mod settings;
