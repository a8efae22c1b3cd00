//! Read-store client side of the viewer.
//!
//! - [`api`]: the [`api::ReadSource`] seam and its HTTP implementation
//! - [`fetcher`]: debounced, paginated fetching with epoch tagging
//! - [`notify`]: transient user-facing notifications
//! - [`config`]: viewer settings loaded from JSON

use thiserror::Error;

pub mod api;
pub mod config;
pub mod fetcher;
pub mod notify;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Read store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(String),
}
