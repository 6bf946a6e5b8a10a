//! The poll loop: fetch, dedup, filter, resolve concurrently, drain, sleep.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::auth::{Session, SessionManager};
use crate::bsky::{FeedApi, FeedPage, FeedRequest};
use crate::config::{CursorPolicy, FeedMode, MonitorConfig};
use crate::error::{MonitorError, Result};
use crate::filter::ContentFilter;
use crate::media::{MediaResolver, Resolution};
use crate::storage::ProcessedIdStore;

/// State carried from one cycle to the next.
#[derive(Debug, Default)]
pub struct MonitorState {
    /// Current session; `None` until the first login.
    pub session: Option<Session>,
    /// Continuation cursor returned by the last page.
    pub cursor: Option<String>,
}

/// Result of a single poll cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Posts on the fetched page.
    pub fetched: usize,
    /// Posts skipped because their CID was already processed.
    pub already_processed: usize,
    /// Posts rejected by the content filter.
    pub filtered: usize,
    /// Posts handed to the media resolver.
    pub dispatched: usize,
    /// Resolutions that completed without a fatal error.
    pub resolved: usize,
    /// Files written across all resolutions.
    pub files_written: usize,
    /// Per-item failures; none of them stopped the cycle.
    pub failures: Vec<String>,
}

type TaskOutcome = (String, Result<Resolution>, Result<()>);

/// Feed monitor.
pub struct Monitor {
    account: String,
    mode: FeedMode,
    page_size: u32,
    cursor_policy: CursorPolicy,
    poll_interval: Duration,
    permits: Arc<Semaphore>,
    filter: ContentFilter,
    sessions: SessionManager,
    feed: Arc<dyn FeedApi>,
    ledger: Arc<dyn ProcessedIdStore>,
    resolver: Arc<dyn MediaResolver>,
}

impl Monitor {
    #[must_use]
    pub fn new(
        config: &MonitorConfig,
        sessions: SessionManager,
        feed: Arc<dyn FeedApi>,
        ledger: Arc<dyn ProcessedIdStore>,
        resolver: Arc<dyn MediaResolver>,
    ) -> Self {
        Self {
            account: config.account.clone(),
            mode: config.mode,
            page_size: config.page_size(),
            cursor_policy: config.cursor_policy,
            poll_interval: config.poll_interval,
            permits: Arc::new(Semaphore::new(config.concurrency.max(1))),
            filter: ContentFilter::new(config.mode),
            sessions,
            feed,
            ledger,
            resolver,
        }
    }

    /// Poll forever, sleeping between cycles.
    ///
    /// Only fatal errors (session, feed page, ledger read) end the loop.
    pub async fn run(&self, state: &mut MonitorState) -> Result<()> {
        info!(
            mode = %self.mode,
            account = %self.account,
            interval_secs = self.poll_interval.as_secs(),
            "Starting monitor"
        );

        loop {
            let report = self.poll_cycle(state).await?;
            info!(
                fetched = report.fetched,
                dispatched = report.dispatched,
                files = report.files_written,
                failures = report.failures.len(),
                "Cycle complete"
            );

            debug!(secs = self.poll_interval.as_secs(), "Sleeping");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Run one cycle and wait for every resolution it started.
    pub async fn poll_cycle(&self, state: &mut MonitorState) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        let processed = self.ledger.load().await?;
        debug!(processed = processed.len(), "Loaded ledger");

        let session = self.sessions.ensure_valid(state.session.clone()).await?;
        state.session = Some(session.clone());

        let request = FeedRequest {
            mode: self.mode,
            actor: self.account.clone(),
            cursor: match self.cursor_policy {
                CursorPolicy::Head => None,
                CursorPolicy::Follow => state.cursor.clone(),
            },
            limit: self.page_size,
        };
        let FeedPage { cursor, posts } = self.feed.get_feed(&session, &request).await?;
        report.fetched = posts.len();
        state.cursor = cursor;

        let mut seen = HashSet::new();
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();

        for post in posts {
            if processed.contains(&post.cid) || !seen.insert(post.cid.clone()) {
                report.already_processed += 1;
                continue;
            }

            if !self.filter.admit(&post) {
                debug!(cid = %post.cid, "Post filtered out");
                report.filtered += 1;
                if let Err(e) = self.ledger.append(&post.cid).await {
                    warn!(cid = %post.cid, error = %e, "Failed to record filtered post");
                    report.failures.push(format!("{}: {e}", post.cid));
                }
                continue;
            }

            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|e| MonitorError::Scheduler(e.to_string()))?;
            let resolver = Arc::clone(&self.resolver);
            let ledger = Arc::clone(&self.ledger);
            let session = session.clone();

            info!(cid = %post.cid, author = %post.author.handle, "Resolving post");
            report.dispatched += 1;
            tasks.spawn(async move {
                let _permit = permit;
                let resolution = resolver.resolve(&post, &session).await;
                let recorded = ledger.append(&post.cid).await;
                (post.cid, resolution, recorded)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (cid, resolution, recorded) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "Resolution task panicked");
                    report.failures.push(e.to_string());
                    continue;
                }
            };

            match resolution {
                Ok(resolution) => {
                    report.resolved += 1;
                    report.files_written += resolution.written.len();
                    for failure in resolution.failures {
                        report
                            .failures
                            .push(format!("{cid}: {} ({})", failure.item, failure.error));
                    }
                }
                Err(e) => {
                    warn!(cid = %cid, error = %e, "Resolution failed");
                    report.failures.push(format!("{cid}: {e}"));
                }
            }

            if let Err(e) = recorded {
                warn!(cid = %cid, error = %e, "Failed to record processed post");
                report.failures.push(format!("{cid}: {e}"));
            }
        }

        Ok(report)
    }
}
