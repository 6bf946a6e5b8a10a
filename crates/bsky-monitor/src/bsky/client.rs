//! XRPC client over reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::identity::PdsResolver;
use super::types::{FeedPage, FeedResponse, SessionTokens, XrpcErrorBody};
use super::{AuthApi, FeedApi, FeedRequest};
use crate::auth::Session;
use crate::config::{Credentials, FeedMode};
use crate::error::{MonitorError, Result};

const CREATE_SESSION: &str = "com.atproto.server.createSession";
const REFRESH_SESSION: &str = "com.atproto.server.refreshSession";
const GET_AUTHOR_FEED: &str = "app.bsky.feed.getAuthorFeed";
const GET_TIMELINE: &str = "app.bsky.feed.getTimeline";
const GET_BLOB: &str = "com.atproto.sync.getBlob";

/// Author feed filter that keeps only posts with media.
const MEDIA_FILTER: &str = "posts_with_media";

#[derive(Serialize)]
struct CreateSessionInput<'a> {
    identifier: &'a str,
    password: &'a str,
}

/// Client for the XRPC service host plus the PDS of each blob owner.
pub struct XrpcClient {
    host: Url,
    http: Client,
    pds: Arc<dyn PdsResolver>,
}

impl XrpcClient {
    /// Create a client for `host` (e.g. `https://bsky.social`).
    pub fn new(host: &str, pds: Arc<dyn PdsResolver>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("bsky-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            host: base_url(host)?,
            http,
            pds,
        })
    }

    fn method_url(base: &Url, method: &str) -> Result<Url> {
        base.join(&format!("xrpc/{method}"))
            .map_err(|e| MonitorError::Config(format!("invalid XRPC url for {method}: {e}")))
    }
}

/// Parse a host and make sure relative joins append to its path.
pub(crate) fn base_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw).map_err(|e| MonitorError::Config(format!("invalid host {raw}: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Turn a non-success response into an [`MonitorError::Api`].
async fn check(method: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<XrpcErrorBody>(&body)
        .ok()
        .and_then(|err| match (err.error, err.message) {
            (Some(error), Some(message)) => Some(format!("{error}: {message}")),
            (error, message) => error.or(message),
        })
        .unwrap_or(body);

    Err(MonitorError::Api {
        method,
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl AuthApi for XrpcClient {
    async fn create_session(&self, credentials: &Credentials) -> Result<SessionTokens> {
        let url = Self::method_url(&self.host, CREATE_SESSION)?;
        debug!(identifier = %credentials.identifier, "Creating session");

        let response = self
            .http
            .post(url)
            .json(&CreateSessionInput {
                identifier: &credentials.identifier,
                password: &credentials.password,
            })
            .send()
            .await?;

        Ok(check(CREATE_SESSION, response).await?.json().await?)
    }

    async fn refresh_session(&self, refresh_jwt: &str) -> Result<SessionTokens> {
        let url = Self::method_url(&self.host, REFRESH_SESSION)?;
        debug!("Refreshing session");

        let response = self.http.post(url).bearer_auth(refresh_jwt).send().await?;

        Ok(check(REFRESH_SESSION, response).await?.json().await?)
    }
}

#[async_trait]
impl FeedApi for XrpcClient {
    async fn get_feed(&self, session: &Session, request: &FeedRequest) -> Result<FeedPage> {
        let limit = request.limit.to_string();
        let mut query: Vec<(&str, &str)> = vec![("limit", limit.as_str())];
        if let Some(cursor) = request.cursor.as_deref() {
            query.push(("cursor", cursor));
        }

        let method = match request.mode {
            FeedMode::ByAccount => {
                query.push(("actor", request.actor.as_str()));
                query.push(("filter", MEDIA_FILTER));
                GET_AUTHOR_FEED
            }
            FeedMode::AllMediaTimeline | FeedMode::Nsfw => GET_TIMELINE,
        };

        let url = Self::method_url(&self.host, method)?;
        debug!(method, mode = %request.mode, cursor = ?request.cursor, "Fetching feed page");

        let response = self
            .http
            .get(url)
            .bearer_auth(&session.access_jwt)
            .query(&query)
            .send()
            .await?;

        let body: FeedResponse = check(method, response).await?.json().await?;
        Ok(body.into())
    }

    async fn get_blob(&self, session: &Session, did: &str, cid: &str) -> Result<Vec<u8>> {
        let pds = self.pds.pds_endpoint(did).await?;
        let url = Self::method_url(&base_url(pds.as_str())?, GET_BLOB)?;
        debug!(did, cid, pds = %pds, "Fetching blob");

        let response = self
            .http
            .get(url)
            .bearer_auth(&session.access_jwt)
            .query(&[("did", did), ("cid", cid)])
            .send()
            .await?;

        let bytes = check(GET_BLOB, response).await?.bytes().await?;
        Ok(bytes.into())
    }
}
