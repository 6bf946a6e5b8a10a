//! Configuration for the media monitor.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::{MonitorError, Result};

/// Default XRPC service host used for login and feed requests.
pub const DEFAULT_HOST: &str = "https://bsky.social";

/// Default PLC directory for `did:plc` resolution.
pub const DEFAULT_PLC_DIRECTORY: &str = "https://plc.directory";

/// Default root folder for downloaded media.
pub const DEFAULT_OUTPUT_DIR: &str = "files";

/// Default ledger file of processed post CIDs.
pub const DEFAULT_LEDGER_PATH: &str = "processed_ids.txt";

/// Default pause between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Default number of concurrent embed resolutions.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Label value that marks a post as restricted content.
pub const RESTRICTED_LABEL: &str = "porn";

/// Which feed is polled and how posts are admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedMode {
    /// Media posts of the monitored account (`getAuthorFeed`).
    #[default]
    ByAccount,
    /// The authenticated account's home timeline.
    AllMediaTimeline,
    /// Home timeline, restricted to posts carrying the restricted label.
    Nsfw,
}

impl FeedMode {
    /// Wire name accepted in `FEED_TYPE`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ByAccount => "byAccount",
            Self::AllMediaTimeline => "allMediaTimeline",
            Self::Nsfw => "nsfw",
        }
    }

    /// Page size requested per poll when none is configured.
    pub fn default_page_size(self) -> u32 {
        match self {
            Self::ByAccount => 5,
            Self::AllMediaTimeline | Self::Nsfw => 50,
        }
    }
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedMode {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "byAccount" | "by-account" => Ok(Self::ByAccount),
            "allMediaTimeline" | "timeline" => Ok(Self::AllMediaTimeline),
            "nsfw" => Ok(Self::Nsfw),
            other => Err(MonitorError::Config(format!(
                "unexpected feed type: {other} (expected byAccount, allMediaTimeline or nsfw)"
            ))),
        }
    }
}

/// How the continuation cursor is handled between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorPolicy {
    /// Always fetch the newest page; dedup skips what was already seen.
    #[default]
    Head,
    /// Thread the cursor returned by the previous page into the next poll.
    Follow,
}

/// Login identifier and app password of the monitoring account.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("password", &"***")
            .finish()
    }
}

/// Full monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Handle or DID of the account whose feed is watched.
    pub account: String,
    /// Monitoring account credentials.
    pub credentials: Credentials,
    /// Feed selection and admission policy.
    pub mode: FeedMode,
    /// XRPC host for auth and feed calls.
    pub host: String,
    /// PLC directory used to locate blob hosts.
    pub plc_directory: String,
    /// Root folder for downloads.
    pub output_dir: PathBuf,
    /// Processed-ID ledger path.
    pub ledger_path: PathBuf,
    /// Pause between cycles.
    pub poll_interval: Duration,
    /// Max concurrent embed resolutions.
    pub concurrency: usize,
    /// Page size override; the mode default is used when unset.
    pub page_size: Option<u32>,
    /// Cursor handling between cycles.
    pub cursor_policy: CursorPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            credentials: Credentials {
                identifier: String::new(),
                password: String::new(),
            },
            mode: FeedMode::default(),
            host: DEFAULT_HOST.to_string(),
            plc_directory: DEFAULT_PLC_DIRECTORY.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            poll_interval: DEFAULT_POLL_INTERVAL,
            concurrency: DEFAULT_CONCURRENCY,
            page_size: None,
            cursor_policy: CursorPolicy::default(),
        }
    }
}

impl MonitorConfig {
    /// Effective page size for the configured mode.
    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or_else(|| self.mode.default_page_size())
    }

    /// Check the configuration before anything touches the network.
    pub fn validate(&self) -> Result<()> {
        if self.account.trim().is_empty() && self.mode == FeedMode::ByAccount {
            return Err(MonitorError::Config(
                "an account to monitor is required (BSKY_ACCOUNT)".to_string(),
            ));
        }
        if self.credentials.identifier.is_empty() || self.credentials.password.is_empty() {
            return Err(MonitorError::Config(
                "login credentials are required (BSKY_USER / BSKY_PASS)".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(MonitorError::Config("concurrency must be at least 1".to_string()));
        }
        if self.page_size == Some(0) {
            return Err(MonitorError::Config("page size must be at least 1".to_string()));
        }
        for (name, value) in [("host", &self.host), ("plc directory", &self.plc_directory)] {
            Url::parse(value)
                .map_err(|e| MonitorError::Config(format!("invalid {name} {value}: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> MonitorConfig {
        MonitorConfig {
            account: "alice.bsky.social".to_string(),
            credentials: Credentials {
                identifier: "watcher.bsky.social".to_string(),
                password: "app-pass".to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_feed_mode_parse() {
        assert_eq!("byAccount".parse::<FeedMode>().unwrap(), FeedMode::ByAccount);
        assert_eq!(
            "allMediaTimeline".parse::<FeedMode>().unwrap(),
            FeedMode::AllMediaTimeline
        );
        assert_eq!("nsfw".parse::<FeedMode>().unwrap(), FeedMode::Nsfw);
        assert!("everything".parse::<FeedMode>().is_err());
    }

    #[test]
    fn test_page_size_defaults_by_mode() {
        let mut config = valid();
        assert_eq!(config.page_size(), 5);

        config.mode = FeedMode::Nsfw;
        assert_eq!(config.page_size(), 50);

        config.page_size = Some(20);
        assert_eq!(config.page_size(), 20);
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let mut config = valid();
        config.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.credentials.password.clear();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.host = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.account.clear();
        assert!(config.validate().is_err());
        config.mode = FeedMode::AllMediaTimeline;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let rendered = format!("{:?}", valid().credentials);
        assert!(!rendered.contains("app-pass"));
    }
}
