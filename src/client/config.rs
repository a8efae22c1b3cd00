use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::fetcher::FetchConfig;
use crate::core::types::{PaginationMode, SoftClipDisplay};
use crate::layout::engine::LayoutOptions;

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Viewer settings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub debounce_ms: u64,
    pub pagination: PaginationMode,
    pub soft_clips: SoftClipDisplay,
    pub request_timeout_secs: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            pagination: PaginationMode::default(),
            soft_clips: SoftClipDisplay::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ViewerConfig {
    /// Load settings from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read or
    /// `ConfigError::Parse` if it is not a valid config.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            pagination: self.pagination,
            layout: LayoutOptions {
                soft_clips: self.soft_clips,
            },
        }
    }
}
