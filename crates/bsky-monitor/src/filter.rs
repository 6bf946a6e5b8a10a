//! Per-mode admission policy for feed posts.

use crate::bsky::PostView;
use crate::config::{FeedMode, RESTRICTED_LABEL};

/// Decides which posts are handed to the media resolver.
#[derive(Debug, Clone, Copy)]
pub struct ContentFilter {
    mode: FeedMode,
}

impl ContentFilter {
    #[must_use]
    pub const fn new(mode: FeedMode) -> Self {
        Self { mode }
    }

    /// Whether `post` should be resolved.
    ///
    /// A post without an embed has nothing to download in any mode. In
    /// restricted mode the post must also carry the restricted label.
    pub fn admit(&self, post: &PostView) -> bool {
        if post.embed.is_none() {
            return false;
        }

        match self.mode {
            FeedMode::ByAccount | FeedMode::AllMediaTimeline => true,
            FeedMode::Nsfw => post.has_label(RESTRICTED_LABEL),
        }
    }
}
