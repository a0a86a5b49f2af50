// MangaShelf platform abstraction
// Resolves where the settings file and the bookmark database live on each OS.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific implementation at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Returns the platform-specific configuration directory for MangaShelf.
///
/// - **Linux**: `~/.config/mangashelf` (or `$XDG_CONFIG_HOME/mangashelf`)
/// - **macOS**: `~/Library/Preferences/MangaShelf`
/// - **Windows**: `%APPDATA%/MangaShelf`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the platform-specific data directory, where the database is kept.
///
/// - **Linux**: `~/.local/share/mangashelf` (or `$XDG_DATA_HOME/mangashelf`)
/// - **macOS**: `~/Library/Application Support/MangaShelf`
/// - **Windows**: `%LOCALAPPDATA%/MangaShelf`
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}
