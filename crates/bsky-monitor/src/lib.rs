//! Bluesky media monitor.
//!
//! This crate provides:
//! - Session login and hourly token refresh
//! - Polling of an author feed or the home timeline
//! - Per-mode content filtering
//! - Concurrent download of embedded images and video blobs
//! - A newline-delimited ledger of processed post CIDs

pub mod auth;
pub mod bsky;
pub mod config;
pub mod error;
pub mod filter;
pub mod media;
pub mod monitor;
pub mod storage;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use auth::{Session, SessionManager};
pub use config::{CursorPolicy, FeedMode, MonitorConfig};
pub use error::{MonitorError, Result};
pub use monitor::{CycleReport, Monitor, MonitorState};
