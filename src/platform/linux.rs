// MangaShelf platform paths for Linux
// Config: ~/.config/mangashelf
// Data:   ~/.local/share/mangashelf

use std::env;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Uses `$XDG_CONFIG_HOME/mangashelf` if set, otherwise `~/.config/mangashelf`.
pub fn get_config_dir() -> PathBuf {
    match env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("mangashelf"),
        _ => home_dir().join(".config").join("mangashelf"),
    }
}

/// Uses `$XDG_DATA_HOME/mangashelf` if set, otherwise `~/.local/share/mangashelf`.
pub fn get_data_dir() -> PathBuf {
    match env::var("XDG_DATA_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("mangashelf"),
        _ => home_dir().join(".local").join("share").join("mangashelf"),
    }
}
