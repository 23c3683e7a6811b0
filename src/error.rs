//! Error types for a single feed run.
//!
//! Every variant is fatal: the orchestrator returns the first one it sees and
//! the binary exits non-zero after logging the stage that failed.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WatchError>;

#[derive(Error, Debug)]
pub enum WatchError {
    /// Missing or malformed environment configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Network failure, bad status, or unparsable body while reading the feed
    #[error("failed to fetch feed from {url}: {message}")]
    Fetch { url: String, message: String },

    /// Could not open the database or create the `cve` table
    #[error("failed to initialize store: {0}")]
    StoreInit(#[source] sqlx::Error),

    #[error("store query failed: {0}")]
    StoreQuery(#[source] sqlx::Error),

    #[error("store write failed: {0}")]
    StoreWrite(#[source] sqlx::Error),

    /// An advisory with this identifier is already stored
    #[error("advisory '{identifier}' is already stored")]
    ConstraintViolation { identifier: String },

    /// Webhook delivery failed or the sink answered with anything but 204
    #[error("failed to notify for '{identifier}': {message}")]
    Notify { identifier: String, message: String },
}

impl WatchError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn fetch(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn notify(identifier: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Notify {
            identifier: identifier.into(),
            message: message.to_string(),
        }
    }

    /// Short label of the pipeline stage that produced the error.
    pub fn stage(&self) -> &'static str {
        match self {
            WatchError::Config(_) => "config",
            WatchError::Fetch { .. } => "fetch",
            WatchError::StoreInit(_) => "store-init",
            WatchError::StoreQuery(_) => "store-query",
            WatchError::StoreWrite(_) | WatchError::ConstraintViolation { .. } => "store-write",
            WatchError::Notify { .. } => "notify",
        }
    }
}
