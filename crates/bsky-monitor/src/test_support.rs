//! Fixtures and fakes shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::auth::Session;
use crate::bsky::{
    Author, EmbedView, FeedApi, FeedPage, FeedRequest, ImageView, Label, PostView, SessionTokens,
};
use crate::error::{MonitorError, Result};

pub(crate) const AUTHOR_DID: &str = "did:plc:alice";
pub(crate) const AUTHOR_HANDLE: &str = "alice.bsky.social";

pub(crate) fn session() -> Session {
    Session::from_tokens(SessionTokens {
        access_jwt: "access-1".to_string(),
        refresh_jwt: "refresh-1".to_string(),
        did: "did:plc:watcher".to_string(),
        handle: "watcher.bsky.social".to_string(),
    })
}

pub(crate) fn post(cid: &str, embed: Option<EmbedView>) -> PostView {
    PostView {
        uri: format!("at://{AUTHOR_DID}/app.bsky.feed.post/{cid}"),
        cid: cid.to_string(),
        author: Author {
            did: AUTHOR_DID.to_string(),
            handle: AUTHOR_HANDLE.to_string(),
            display_name: None,
        },
        record: json!({"$type": "app.bsky.feed.post", "text": ""}),
        embed,
        labels: Vec::new(),
        indexed_at: None,
    }
}

pub(crate) fn labeled(mut post: PostView, val: &str) -> PostView {
    post.labels.push(Label {
        val: val.to_string(),
        src: None,
        uri: None,
    });
    post
}

/// Images embed whose entries are `(fullsize url, alt)`.
pub(crate) fn images_embed(images: &[(&str, &str)]) -> EmbedView {
    EmbedView::Images {
        images: images
            .iter()
            .map(|(fullsize, alt)| ImageView {
                thumb: format!("{fullsize}?thumb"),
                fullsize: (*fullsize).to_string(),
                alt: (*alt).to_string(),
            })
            .collect(),
    }
}

/// Post with a video view embed and a record carrying `blob_cid`.
pub(crate) fn video_post(cid: &str, blob_cid: &str) -> PostView {
    let mut post = post(
        cid,
        Some(EmbedView::Video {
            cid: blob_cid.to_string(),
            playlist: Some(format!("https://video.example/{blob_cid}/playlist.m3u8")),
            thumbnail: None,
        }),
    );
    post.record = json!({
        "$type": "app.bsky.feed.post",
        "text": "",
        "createdAt": "2024-11-02T10:00:00.000Z",
        "embed": {
            "$type": "app.bsky.embed.video",
            "video": {
                "$type": "blob",
                "ref": {"$link": blob_cid},
                "mimeType": "video/mp4",
                "size": 11
            }
        }
    });
    post
}

/// In-memory feed that serves the same page on every call.
#[derive(Default)]
pub(crate) struct FakeFeed {
    page: FeedPage,
    blobs: HashMap<String, Vec<u8>>,
    fail_feed: bool,
    feed_calls: AtomicUsize,
    blob_calls: AtomicUsize,
    pub(crate) requests: Mutex<Vec<FeedRequest>>,
}

impl FakeFeed {
    pub(crate) fn with_page(page: FeedPage) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_feed: true,
            ..Default::default()
        }
    }

    pub(crate) fn with_blob(mut self, cid: &str, bytes: &[u8]) -> Self {
        self.blobs.insert(cid.to_string(), bytes.to_vec());
        self
    }

    pub(crate) fn feed_calls(&self) -> usize {
        self.feed_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn blob_calls(&self) -> usize {
        self.blob_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedApi for FakeFeed {
    async fn get_feed(&self, _session: &Session, request: &FeedRequest) -> Result<FeedPage> {
        self.feed_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_feed {
            return Err(MonitorError::Api {
                method: "app.bsky.feed.getAuthorFeed",
                status: 502,
                message: "upstream unavailable".to_string(),
            });
        }
        Ok(self.page.clone())
    }

    async fn get_blob(&self, _session: &Session, did: &str, cid: &str) -> Result<Vec<u8>> {
        self.blob_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(did, AUTHOR_DID, "blobs are fetched from the post author");
        self.blobs.get(cid).cloned().ok_or_else(|| MonitorError::Api {
            method: "com.atproto.sync.getBlob",
            status: 404,
            message: format!("BlobNotFound: {cid}"),
        })
    }
}
