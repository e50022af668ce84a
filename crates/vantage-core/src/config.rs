//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Base URL of the backend API
    pub api_base_url: Url,
    /// Per-request timeout for gateway calls, in seconds
    pub request_timeout_secs: u64,
    /// Probe `/users/me` in the background after a cache-restored session.
    /// Off by default: a restored session is trusted until an
    /// authenticated call is rejected.
    pub validate_on_start: bool,
}

impl Config {
    pub fn new(data_dir: PathBuf, api_base_url: Url) -> Self {
        Self {
            database_path: data_dir.join("vantage.db"),
            api_base_url,
            request_timeout_secs: 30,
            validate_on_start: false,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("Vantage"))
            .unwrap_or_else(|| PathBuf::from(".vantage"))
    }
}

// Simple dirs implementation for the local data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
