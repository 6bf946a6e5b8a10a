//! Session state for the monitoring account.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::bsky::SessionTokens;

/// Authenticated session: account identity plus access and refresh tokens.
#[derive(Clone)]
pub struct Session {
    /// DID of the logged-in account.
    pub did: String,
    /// Handle of the logged-in account.
    pub handle: String,
    /// Short-lived token sent with every request.
    pub access_jwt: String,
    /// Long-lived token used only for refreshSession.
    pub refresh_jwt: String,
    /// When the tokens were last issued.
    pub refreshed_at: DateTime<Utc>,
}

impl Session {
    /// Create a session from freshly issued tokens.
    #[must_use]
    pub fn from_tokens(tokens: SessionTokens) -> Self {
        Self {
            did: tokens.did,
            handle: tokens.handle,
            access_jwt: tokens.access_jwt,
            refresh_jwt: tokens.refresh_jwt,
            refreshed_at: Utc::now(),
        }
    }

    /// Replace both tokens in place and reset the staleness clock.
    pub fn apply_refresh(&mut self, tokens: SessionTokens) {
        self.did = tokens.did;
        self.handle = tokens.handle;
        self.access_jwt = tokens.access_jwt;
        self.refresh_jwt = tokens.refresh_jwt;
        self.refreshed_at = Utc::now();
    }

    /// How long the current tokens have been held.
    #[must_use]
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.refreshed_at)
    }

    /// Whether the tokens are older than `max_age`.
    #[must_use]
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .field("refreshed_at", &self.refreshed_at)
            .finish_non_exhaustive()
    }
}
