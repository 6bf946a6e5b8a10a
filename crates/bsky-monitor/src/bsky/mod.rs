//! Bluesky / AT Protocol collaborators.
//!
//! The monitor only talks to the network through the [`AuthApi`] and
//! [`FeedApi`] traits; [`XrpcClient`] implements both over HTTPS.

mod client;
mod identity;
mod types;

use async_trait::async_trait;

use crate::auth::Session;
use crate::config::{Credentials, FeedMode};
use crate::error::Result;

pub use client::XrpcClient;
pub use identity::{DidDocumentResolver, FixedPds, PdsResolver};
pub use types::{
    Author, BlobRef, CidLink, EmbedView, ExternalView, FeedPage, FeedPostRecord, ImageView, Label,
    PostView, QuotedRecord, RecordEmbed, RecordImage, SessionTokens, StrongRef,
};

/// Parameters of a single feed page request.
#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub mode: FeedMode,
    /// Account whose posts are listed (author feed only).
    pub actor: String,
    pub cursor: Option<String>,
    pub limit: u32,
}

/// Login and token refresh exchanges.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `com.atproto.server.createSession`.
    async fn create_session(&self, credentials: &Credentials) -> Result<SessionTokens>;

    /// `com.atproto.server.refreshSession`, authenticated with the refresh token.
    async fn refresh_session(&self, refresh_jwt: &str) -> Result<SessionTokens>;
}

/// Authenticated feed and blob retrieval.
#[async_trait]
pub trait FeedApi: Send + Sync {
    /// Fetch one page of the feed selected by `request.mode`.
    async fn get_feed(&self, session: &Session, request: &FeedRequest) -> Result<FeedPage>;

    /// Fetch the raw bytes of blob `cid` owned by `did`.
    async fn get_blob(&self, session: &Session, did: &str, cid: &str) -> Result<Vec<u8>>;
}
