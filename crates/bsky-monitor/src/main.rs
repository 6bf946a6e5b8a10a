//! Bluesky media monitor CLI.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bsky_monitor::bsky::{DidDocumentResolver, XrpcClient};
use bsky_monitor::config::{
    Credentials, DEFAULT_HOST, DEFAULT_LEDGER_PATH, DEFAULT_OUTPUT_DIR, DEFAULT_PLC_DIRECTORY,
};
use bsky_monitor::media::EmbedResolver;
use bsky_monitor::storage::ProcessedIdLedger;
use bsky_monitor::{
    CursorPolicy, CycleReport, FeedMode, Monitor, MonitorConfig, MonitorState, SessionManager,
};

/// Bluesky media monitor - download images and videos posted to a feed.
#[derive(Parser)]
#[command(name = "bsky-monitor")]
#[command(about = "Poll a Bluesky feed and download attached media")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll forever, sleeping between cycles
    Monitor(MonitorArgs),

    /// Run a single poll cycle and print a summary (for CronJob use)
    Once(MonitorArgs),

    /// Log in once and print the session identity
    CheckSession(LoginArgs),
}

#[derive(Args)]
pub struct LoginArgs {
    /// Login identifier (handle or email)
    #[arg(long, env = "BSKY_USER")]
    user: String,

    /// App password
    #[arg(long, env = "BSKY_PASS", hide_env_values = true)]
    pass: String,

    /// XRPC service host
    #[arg(long, env = "BSKY_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// PLC directory for DID resolution
    #[arg(long, env = "BSKY_PLC_DIRECTORY", default_value = DEFAULT_PLC_DIRECTORY)]
    plc_directory: String,
}

#[derive(Args)]
pub struct MonitorArgs {
    #[command(flatten)]
    login: LoginArgs,

    /// Account whose media posts are watched (byAccount mode)
    #[arg(long, env = "BSKY_ACCOUNT", default_value = "")]
    account: String,

    /// Feed type: byAccount, allMediaTimeline or nsfw
    #[arg(long, env = "FEED_TYPE", default_value = "byAccount")]
    feed_type: FeedMode,

    /// Root folder for downloads
    #[arg(long, env = "BSKY_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Processed-ID ledger file
    #[arg(long, env = "BSKY_LEDGER", default_value = DEFAULT_LEDGER_PATH)]
    ledger: PathBuf,

    /// Seconds between poll cycles
    #[arg(long, env = "BSKY_POLL_INTERVAL_SECS", default_value = "120")]
    interval: u64,

    /// Max concurrent post resolutions
    #[arg(long, env = "BSKY_CONCURRENCY", default_value = "5")]
    concurrency: usize,

    /// Posts per page (defaults to 5 for byAccount, 50 for timelines)
    #[arg(long, env = "BSKY_PAGE_SIZE")]
    page_size: Option<u32>,

    /// Thread the feed cursor between cycles instead of re-reading the head
    #[arg(long, env = "BSKY_FOLLOW_CURSOR")]
    follow_cursor: bool,
}

impl MonitorArgs {
    fn into_config(self) -> MonitorConfig {
        MonitorConfig {
            account: self.account,
            credentials: self.login.credentials(),
            mode: self.feed_type,
            host: self.login.host,
            plc_directory: self.login.plc_directory,
            output_dir: self.output,
            ledger_path: self.ledger,
            poll_interval: Duration::from_secs(self.interval),
            concurrency: self.concurrency,
            page_size: self.page_size,
            cursor_policy: if self.follow_cursor {
                CursorPolicy::Follow
            } else {
                CursorPolicy::Head
            },
        }
    }
}

impl LoginArgs {
    fn credentials(&self) -> Credentials {
        Credentials {
            identifier: self.user.clone(),
            password: self.pass.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("bsky_monitor=debug,info")
    } else {
        EnvFilter::new("bsky_monitor=info,warn")
    };

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    match cli.command {
        Commands::Monitor(args) => run_monitor(args.into_config()).await,
        Commands::Once(args) => run_once(args.into_config()).await,
        Commands::CheckSession(args) => run_check_session(args).await,
    }
}

fn build_monitor(config: &MonitorConfig) -> Result<Monitor> {
    config.validate()?;

    let pds = Arc::new(
        DidDocumentResolver::new(&config.plc_directory)
            .context("Failed to set up DID resolution")?,
    );
    let client =
        Arc::new(XrpcClient::new(&config.host, pds).context("Failed to create XRPC client")?);
    let sessions = SessionManager::new(client.clone(), config.credentials.clone());
    let ledger = Arc::new(ProcessedIdLedger::new(config.ledger_path.clone()));
    let resolver = Arc::new(
        EmbedResolver::new(config.output_dir.clone(), client.clone())
            .context("Failed to create media resolver")?,
    );

    Ok(Monitor::new(config, sessions, client, ledger, resolver))
}

async fn run_monitor(config: MonitorConfig) -> Result<()> {
    let monitor = build_monitor(&config)?;
    let mut state = MonitorState::default();

    tokio::select! {
        result = monitor.run(&mut state) => result.context("Monitor stopped"),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received interrupt, shutting down");
            Ok(())
        }
    }
}

async fn run_once(config: MonitorConfig) -> Result<()> {
    let monitor = build_monitor(&config)?;
    let mut state = MonitorState::default();

    let report = monitor
        .poll_cycle(&mut state)
        .await
        .context("Poll cycle failed")?;
    print_report(&config, &report);
    Ok(())
}

async fn run_check_session(args: LoginArgs) -> Result<()> {
    let pds = Arc::new(DidDocumentResolver::new(&args.plc_directory)?);
    let client = Arc::new(XrpcClient::new(&args.host, pds)?);
    let sessions = SessionManager::new(client, args.credentials());

    let session = sessions.login().await.context("Login failed")?;
    println!("{} {}", "✓".green(), "Session established".bold());
    println!("  handle: {}", session.handle);
    println!("  did:    {}", session.did);
    Ok(())
}

fn print_report(config: &MonitorConfig, report: &CycleReport) {
    println!(
        "{} {} ({})",
        "Poll cycle complete".bold(),
        config.mode.to_string().cyan(),
        config.output_dir.display()
    );
    println!("  fetched:           {}", report.fetched);
    println!("  already processed: {}", report.already_processed);
    println!("  filtered:          {}", report.filtered);
    println!("  dispatched:        {}", report.dispatched);
    println!("  files written:     {}", report.files_written.to_string().green());

    if report.failures.is_empty() {
        return;
    }
    println!("  failures:          {}", report.failures.len().to_string().red());
    for failure in &report.failures {
        println!("    {} {failure}", "✗".red());
    }
}
