//! Login and time-based token refresh.

use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use super::session::Session;
use crate::bsky::AuthApi;
use crate::config::Credentials;
use crate::error::{MonitorError, Result};

/// Tokens held longer than this are refreshed before the next request.
pub const REFRESH_AFTER_MINUTES: i64 = 60;

/// Keeps a [`Session`] usable across poll cycles.
///
/// The session itself is owned by the caller and passed in on every call,
/// so the manager carries no mutable state of its own.
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    credentials: Credentials,
    max_age: Duration,
}

impl SessionManager {
    /// Create a manager that refreshes tokens after one hour.
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, credentials: Credentials) -> Self {
        Self {
            api,
            credentials,
            max_age: Duration::minutes(REFRESH_AFTER_MINUTES),
        }
    }

    /// Return a session that is safe to use for the next cycle.
    ///
    /// - `None`: logs in with the configured credentials.
    /// - stale: refreshes with the refresh token, replacing both tokens.
    /// - otherwise: returns the session unchanged.
    ///
    /// Failures are returned to the caller without retrying.
    pub async fn ensure_valid(&self, session: Option<Session>) -> Result<Session> {
        let Some(mut session) = session else {
            return self.login().await;
        };

        if session.is_stale(self.max_age) {
            let tokens = self
                .api
                .refresh_session(&session.refresh_jwt)
                .await
                .map_err(|e| MonitorError::Refresh(e.to_string()))?;
            session.apply_refresh(tokens);
            info!(
                handle = %session.handle,
                refreshed_at = %session.refreshed_at.to_rfc2822(),
                "Refreshed session token"
            );
        }

        Ok(session)
    }

    /// Perform a fresh login exchange.
    pub async fn login(&self) -> Result<Session> {
        let tokens = self
            .api
            .create_session(&self.credentials)
            .await
            .map_err(|e| MonitorError::Login(e.to_string()))?;
        let session = Session::from_tokens(tokens);
        info!(did = %session.did, handle = %session.handle, "Logged in");
        Ok(session)
    }
}
