//! Error types for the media monitor.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur while monitoring a feed.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// HTTP transport failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The XRPC endpoint answered with a non-success status
    #[error("{method} failed ({status}): {message}")]
    Api {
        method: &'static str,
        status: u16,
        message: String,
    },

    /// createSession exchange failed
    #[error("Login failed: {0}")]
    Login(String),

    /// refreshSession exchange failed
    #[error("Session refresh failed: {0}")]
    Refresh(String),

    /// Filesystem error with the path it happened on
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Media download answered with a non-2xx status
    #[error("Download of {url} failed with status {status}")]
    Download { url: String, status: u16 },

    /// Record could not be re-encoded or decoded
    #[error("Record round-trip failed: {0}")]
    Record(String),

    /// Identity could not be resolved to a PDS endpoint
    #[error("Identity resolution failed for {did}: {reason}")]
    Identity { did: String, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The resolution scheduler was closed
    #[error("Task scheduling failed: {0}")]
    Scheduler(String),
}

impl MonitorError {
    /// Wrap an IO error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
