//! Dedup storage.
//!
//! The monitor only needs `load` and `append`; the flat-file ledger can be
//! swapped for a transactional store behind the same trait.

mod ledger;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;

pub use ledger::ProcessedIdLedger;

/// Set of post CIDs that have already been handled.
#[async_trait]
pub trait ProcessedIdStore: Send + Sync {
    /// Read the full set of processed IDs.
    async fn load(&self) -> Result<HashSet<String>>;

    /// Record one more processed ID.
    async fn append(&self, id: &str) -> Result<()>;
}
