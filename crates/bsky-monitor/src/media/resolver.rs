//! Embed resolution: classify a post's embed and download its media.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::naming::DownloadTarget;
use super::record::decode_post_record;
use crate::auth::Session;
use crate::bsky::{EmbedView, FeedApi, ImageView, PostView};
use crate::error::{MonitorError, Result};

/// One media item that could not be saved.
#[derive(Debug, Clone)]
pub struct MediaFailure {
    /// URL or blob CID of the item.
    pub item: String,
    pub error: String,
}

/// Outcome of resolving one post.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Files written during this resolution.
    pub written: Vec<PathBuf>,
    /// Blob files that already existed and were left alone.
    pub existing: Vec<PathBuf>,
    /// Items that failed; siblings were still attempted.
    pub failures: Vec<MediaFailure>,
}

impl Resolution {
    fn fail(&mut self, item: impl Into<String>, error: &MonitorError) {
        self.failures.push(MediaFailure {
            item: item.into(),
            error: error.to_string(),
        });
    }
}

/// Downloads the media attached to a post.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, post: &PostView, session: &Session) -> Result<Resolution>;
}

/// Resolver writing under `<output>/<author-handle>/`.
pub struct EmbedResolver {
    output_dir: PathBuf,
    http: Client,
    feed: Arc<dyn FeedApi>,
}

impl EmbedResolver {
    pub fn new(output_dir: impl Into<PathBuf>, feed: Arc<dyn FeedApi>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            output_dir: output_dir.into(),
            http,
            feed,
        })
    }

    async fn resolve_media(
        &self,
        post: &PostView,
        media: &EmbedView,
        session: &Session,
        resolution: &mut Resolution,
    ) {
        match media {
            EmbedView::Images { images } => self.save_images(post, images, resolution).await,
            EmbedView::Video { .. } => self.save_video(post, session, resolution).await,
            EmbedView::External { external } => {
                info!(cid = %post.cid, uri = %external.uri, "External link, nothing to download");
            }
            EmbedView::RecordWithMedia { media, .. } => {
                warn!(cid = %post.cid, nested = media.kind(), "Nested record with media, skipping");
            }
            EmbedView::Unsupported => {
                debug!(cid = %post.cid, "Embed has no downloadable media");
            }
        }
    }

    async fn save_images(
        &self,
        post: &PostView,
        images: &[ImageView],
        resolution: &mut Resolution,
    ) {
        if images.is_empty() {
            return;
        }

        let author_dir = self.output_dir.join(&post.author.handle);
        if let Err(e) = create_dir(&author_dir).await {
            warn!(cid = %post.cid, error = %e, "Cannot create author directory");
            for image in images {
                resolution.fail(&image.fullsize, &e);
            }
            return;
        }

        for (index, image) in images.iter().enumerate() {
            let target = DownloadTarget::image(
                &self.output_dir,
                &post.author.handle,
                &image.alt,
                &post.cid,
                index,
            );

            match self.download(&image.fullsize, &target).await {
                Ok(path) => {
                    info!(path = %path.display(), "Image saved");
                    resolution.written.push(path);
                }
                Err(e) => {
                    warn!(url = %image.fullsize, error = %e, "Failed to download image");
                    resolution.fail(&image.fullsize, &e);
                }
            }
        }
    }

    /// GET `url` and stream the body into `target`, replacing any existing file.
    async fn download(&self, url: &str, target: &DownloadTarget) -> Result<PathBuf> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let part = target.part_path();
        let mut file = fs::File::create(&part)
            .await
            .map_err(|e| MonitorError::io(&part, e))?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let written = match chunk {
                Ok(chunk) => file
                    .write_all(&chunk)
                    .await
                    .map_err(|e| MonitorError::io(&part, e)),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = written {
                discard(&part).await;
                return Err(e);
            }
        }
        if let Err(e) = file.flush().await {
            discard(&part).await;
            return Err(MonitorError::io(&part, e));
        }
        drop(file);

        commit(&part, &target.path()).await
    }

    async fn save_video(&self, post: &PostView, session: &Session, resolution: &mut Resolution) {
        let blob = match decode_post_record(&post.record).and_then(|record| {
            record.video_blob().cloned().ok_or_else(|| {
                MonitorError::Record("post record has no video blob".to_string())
            })
        }) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(cid = %post.cid, error = %e, "Could not recover video blob reference");
                resolution.fail(&post.cid, &e);
                return;
            }
        };

        let target = DownloadTarget::blob(
            &self.output_dir,
            &post.author.handle,
            &post.cid,
            &blob.mime_type,
        );
        let path = target.path();
        if fs::try_exists(&path).await.unwrap_or(false) {
            info!(path = %path.display(), "Blob exists");
            resolution.existing.push(path);
            return;
        }
        if let Err(e) = create_dir(&target.dir).await {
            warn!(cid = %post.cid, error = %e, "Cannot create blob directory");
            resolution.fail(blob.cid(), &e);
            return;
        }

        let bytes = match self
            .feed
            .get_blob(session, &post.author.did, blob.cid())
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(cid = %post.cid, blob = %blob.cid(), error = %e, "Failed to fetch blob");
                resolution.fail(blob.cid(), &e);
                return;
            }
        };

        let part = target.part_path();
        let saved = match fs::write(&part, &bytes).await {
            Ok(()) => commit(&part, &path).await,
            Err(e) => {
                discard(&part).await;
                Err(MonitorError::io(&part, e))
            }
        };

        match saved {
            Ok(path) => {
                info!(path = %path.display(), size = bytes.len(), "Blob downloaded");
                resolution.written.push(path);
            }
            Err(e) => {
                warn!(cid = %post.cid, error = %e, "Failed to save blob");
                resolution.fail(blob.cid(), &e);
            }
        }
    }
}

async fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| MonitorError::io(dir, e))
}

/// Move a finished `.part` file to its final name.
async fn commit(part: &Path, path: &Path) -> Result<PathBuf> {
    if let Err(e) = fs::rename(part, path).await {
        discard(part).await;
        return Err(MonitorError::io(path, e));
    }
    Ok(path.to_path_buf())
}

async fn discard(part: &Path) {
    if let Err(e) = fs::remove_file(part).await {
        debug!(path = %part.display(), error = %e, "Could not remove partial download");
    }
}

#[async_trait]
impl MediaResolver for EmbedResolver {
    async fn resolve(&self, post: &PostView, session: &Session) -> Result<Resolution> {
        let mut resolution = Resolution::default();
        let Some(embed) = post.embed.as_ref() else {
            return Ok(resolution);
        };

        debug!(cid = %post.cid, kind = embed.kind(), "Resolving embed");
        let media = match embed {
            EmbedView::RecordWithMedia { media, .. } => media.as_ref(),
            other => other,
        };
        self.resolve_media(post, media, session, &mut resolution).await;

        Ok(resolution)
    }
}
