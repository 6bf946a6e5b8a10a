//! Bluesky feed and record types.
//!
//! The `*View` types mirror the display projection returned by the feed
//! endpoints. `FeedPostRecord` is the durable post record, which is the only
//! place blob references for videos survive.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tokens returned by `createSession` / `refreshSession`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_jwt: String,
    pub refresh_jwt: String,
    pub did: String,
    pub handle: String,
}

/// One page of a feed.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    /// Continuation cursor, if the server returned one.
    pub cursor: Option<String>,
    /// Posts in feed order.
    pub posts: Vec<PostView>,
}

/// Raw `getAuthorFeed` / `getTimeline` response body.
#[derive(Debug, Deserialize)]
pub(crate) struct FeedResponse {
    #[serde(default)]
    pub cursor: Option<String>,
    pub feed: Vec<FeedViewPost>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedViewPost {
    pub post: PostView,
}

impl From<FeedResponse> for FeedPage {
    fn from(response: FeedResponse) -> Self {
        Self {
            cursor: response.cursor.filter(|c| !c.is_empty()),
            posts: response.feed.into_iter().map(|item| item.post).collect(),
        }
    }
}

/// A post as seen through the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    /// `at://` URI of the post.
    pub uri: String,
    /// Content identifier of the post record; the dedup key.
    pub cid: String,
    pub author: Author,
    /// Raw record as returned by the view layer.
    #[serde(default)]
    pub record: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<EmbedView>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
}

impl PostView {
    /// Whether any label on the post carries exactly `value`.
    pub fn has_label(&self, value: &str) -> bool {
        self.labels.iter().any(|label| label.val == value)
    }
}

/// Post author.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub did: String,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Moderation label attached to a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub val: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Embed attached to a post, in its display projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum EmbedView {
    #[serde(rename = "app.bsky.embed.images#view")]
    Images { images: Vec<ImageView> },

    /// Only a playlist and thumbnail; the blob ref lives in the record.
    #[serde(rename = "app.bsky.embed.video#view")]
    Video {
        cid: String,
        #[serde(default)]
        playlist: Option<String>,
        #[serde(default)]
        thumbnail: Option<String>,
    },

    #[serde(rename = "app.bsky.embed.external#view")]
    External { external: ExternalView },

    #[serde(rename = "app.bsky.embed.recordWithMedia#view")]
    RecordWithMedia {
        #[serde(default)]
        record: Value,
        media: Box<EmbedView>,
    },

    /// Quote posts without media and any embed kind this crate does not know.
    #[serde(other)]
    Unsupported,
}

impl EmbedView {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Images { .. } => "images",
            Self::Video { .. } => "video",
            Self::External { .. } => "external",
            Self::RecordWithMedia { .. } => "recordWithMedia",
            Self::Unsupported => "unsupported",
        }
    }
}

/// One image of an images embed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageView {
    pub thumb: String,
    pub fullsize: String,
    #[serde(default)]
    pub alt: String,
}

/// Link card of an external embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalView {
    pub uri: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Durable `app.bsky.feed.post` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPostRecord {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<RecordEmbed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl FeedPostRecord {
    /// Video blob of the record, looking one level into record-with-media.
    pub fn video_blob(&self) -> Option<&BlobRef> {
        self.embed.as_ref().and_then(RecordEmbed::video_blob)
    }
}

/// Embed as stored in the post record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum RecordEmbed {
    #[serde(rename = "app.bsky.embed.images")]
    Images { images: Vec<RecordImage> },

    #[serde(rename = "app.bsky.embed.video")]
    Video {
        video: BlobRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },

    #[serde(rename = "app.bsky.embed.external")]
    External { external: ExternalView },

    #[serde(rename = "app.bsky.embed.record")]
    Record { record: StrongRef },

    #[serde(rename = "app.bsky.embed.recordWithMedia")]
    RecordWithMedia {
        record: QuotedRecord,
        media: Box<RecordEmbed>,
    },

    #[serde(other)]
    Unsupported,
}

impl RecordEmbed {
    fn video_blob(&self) -> Option<&BlobRef> {
        match self {
            Self::Video { video, .. } => Some(video),
            Self::RecordWithMedia { media, .. } => match media.as_ref() {
                Self::Video { video, .. } => Some(video),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Image entry of a stored images embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordImage {
    pub image: BlobRef,
    #[serde(default)]
    pub alt: String,
}

/// Wrapper around the quoted post of a record-with-media embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotedRecord {
    pub record: StrongRef,
}

/// URI + CID pointer to another record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}

/// Reference to a content-addressed blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRef {
    #[serde(rename = "ref")]
    pub reference: CidLink,
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
}

impl BlobRef {
    /// CID of the blob.
    pub fn cid(&self) -> &str {
        &self.reference.link
    }
}

/// `{"$link": "<cid>"}` as used for CIDs in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidLink {
    #[serde(rename = "$link")]
    pub link: String,
}

/// Error body returned by XRPC endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct XrpcErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feed_page_from_response() {
        let response: FeedResponse = serde_json::from_value(json!({
            "cursor": "",
            "feed": [{
                "post": {
                    "uri": "at://did:plc:abc/app.bsky.feed.post/1",
                    "cid": "bafyone",
                    "author": {"did": "did:plc:abc", "handle": "alice.bsky.social"},
                    "record": {"$type": "app.bsky.feed.post", "text": "hi"},
                    "labels": [{"val": "porn", "src": "did:plc:labeler"}],
                    "embed": {
                        "$type": "app.bsky.embed.images#view",
                        "images": [{"thumb": "t", "fullsize": "f", "alt": "a cat"}]
                    }
                }
            }]
        }))
        .unwrap();

        let page = FeedPage::from(response);
        assert!(page.cursor.is_none());
        assert_eq!(page.posts.len(), 1);
        let post = &page.posts[0];
        assert!(post.has_label("porn"));
        assert!(!post.has_label("nudity"));
        assert!(matches!(post.embed, Some(EmbedView::Images { ref images }) if images.len() == 1));
    }

    #[test]
    fn test_embed_view_variants() {
        let video: EmbedView = serde_json::from_value(json!({
            "$type": "app.bsky.embed.video#view",
            "cid": "bafkvideo",
            "playlist": "https://video.example/playlist.m3u8"
        }))
        .unwrap();
        assert_eq!(video.kind(), "video");

        let nested: EmbedView = serde_json::from_value(json!({
            "$type": "app.bsky.embed.recordWithMedia#view",
            "record": {"record": {"uri": "at://x", "cid": "y"}},
            "media": {
                "$type": "app.bsky.embed.images#view",
                "images": []
            }
        }))
        .unwrap();
        match nested {
            EmbedView::RecordWithMedia { media, .. } => assert_eq!(media.kind(), "images"),
            other => panic!("unexpected embed {other:?}"),
        }

        let quote: EmbedView = serde_json::from_value(json!({
            "$type": "app.bsky.embed.record#view",
            "record": {"uri": "at://x"}
        }))
        .unwrap();
        assert_eq!(quote.kind(), "unsupported");
    }

    #[test]
    fn test_record_video_blob_through_record_with_media() {
        let record: FeedPostRecord = serde_json::from_value(json!({
            "$type": "app.bsky.feed.post",
            "text": "quoted clip",
            "embed": {
                "$type": "app.bsky.embed.recordWithMedia",
                "record": {"record": {"uri": "at://did:plc:q/app.bsky.feed.post/2", "cid": "bafyq"}},
                "media": {
                    "$type": "app.bsky.embed.video",
                    "video": {
                        "$type": "blob",
                        "ref": {"$link": "bafkreivideo"},
                        "mimeType": "video/mp4",
                        "size": 1024
                    }
                }
            }
        }))
        .unwrap();

        let blob = record.video_blob().unwrap();
        assert_eq!(blob.cid(), "bafkreivideo");
        assert_eq!(blob.mime_type, "video/mp4");
    }
}
