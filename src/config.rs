//! Configuration module for the spinbot service.
//!
//! Command line flags (each also readable from the environment) are parsed
//! with clap and resolved into a [`BotConfig`]. API credentials are loaded
//! separately, see [`crate::oauth::OAuthCredentials::from_env`].

use clap::{ArgAction, Parser};
use log::{info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::checkpoint::CheckpointStore;
use crate::error::{BotError, BotResult};
use crate::scheduler::DEFAULT_POLL_INTERVAL;
use crate::twitter::{RetryPolicy, DEFAULT_API_BASE};

/// Name of the messages file inside the config directory.
pub const MESSAGES_FILENAME: &str = "retweet_messages.txt";

pub const DEFAULT_SEARCH_TEXT: &str = "#spininelfianco";

/// WOEID of Rome.
pub const DEFAULT_TREND_WOEID: u64 = 721943;

/// Replies to mentions containing a search term with a canned message and a local trend.
#[derive(Debug, Clone, Parser)]
#[command(name = "spinbot", version, about)]
pub struct Cli {
    /// Text that a mention must contain (case-insensitive) to be answered
    #[arg(long = "search", env = "SPINBOT_SEARCH", default_value = DEFAULT_SEARCH_TEXT)]
    pub search_text: String,

    /// Location whose trends decorate the replies
    #[arg(long, env = "SPINBOT_TREND_WOEID", default_value_t = DEFAULT_TREND_WOEID)]
    pub trend_woeid: u64,

    /// Only log the replies instead of posting them (`--dry-run false` to go live)
    #[arg(long, env = "SPINBOT_DRY_RUN", default_value_t = true, action = ArgAction::Set)]
    pub dry_run: bool,

    /// Start the first poll from this mention id instead of the stored checkpoint
    #[arg(long, env = "SPINBOT_LAST_MENTION_ID")]
    pub last_mention_id: Option<u64>,

    /// Directory holding the messages file
    #[arg(long, env = "SPINBOT_CONFIG_DIR", default_value = "config")]
    pub config_dir: PathBuf,

    /// Directory holding the checkpoint file (created if missing)
    #[arg(long, env = "SPINBOT_VAR_DIR", default_value = "var")]
    pub var_dir: PathBuf,

    /// Seconds between two polls
    #[arg(long, env = "SPINBOT_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    pub interval_secs: u64,

    /// Enable exponential backoff on repeated fetch failures, capped at this many seconds
    #[arg(long, env = "SPINBOT_BACKOFF_MAX_SECS")]
    pub backoff_max_secs: Option<u64>,

    /// Base URL of the v1.1 REST API
    #[arg(long, env = "SPINBOT_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Serve /health and /status on this address
    #[arg(long, env = "SPINBOT_STATUS_ADDR")]
    pub status_addr: Option<SocketAddr>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub search_text: String,
    pub trend_woeid: u64,
    pub dry_run: bool,
    pub last_mention_id: Option<u64>,
    pub messages_path: PathBuf,
    pub var_dir: PathBuf,
    pub poll_interval: Duration,
    pub backoff_max: Option<Duration>,
    pub api_base: String,
    pub retry: RetryPolicy,
    pub status_addr: Option<SocketAddr>,
}

impl BotConfig {
    /// Validates the parsed flags and resolves paths and durations.
    pub fn from_cli(cli: Cli) -> BotResult<Self> {
        if cli.search_text.trim().is_empty() {
            return Err(BotError::Config("search text cannot be empty".into()));
        }
        if cli.interval_secs == 0 {
            return Err(BotError::Config("poll interval must be positive".into()));
        }
        if let Some(max) = cli.backoff_max_secs {
            if max < cli.interval_secs {
                warn!(
                    "Backoff maximum ({}s) is below the poll interval ({}s); the interval wins",
                    max, cli.interval_secs
                );
            }
        }

        let config = Self {
            search_text: cli.search_text,
            trend_woeid: cli.trend_woeid,
            dry_run: cli.dry_run,
            last_mention_id: cli.last_mention_id,
            messages_path: cli.config_dir.join(MESSAGES_FILENAME),
            var_dir: cli.var_dir,
            poll_interval: Duration::from_secs(cli.interval_secs),
            backoff_max: cli.backoff_max_secs.map(Duration::from_secs),
            api_base: cli.api_base,
            retry: RetryPolicy::default(),
            status_addr: cli.status_addr,
        };
        info!(
            "Configuration: search {:?}, WOEID {}, dry-run {}, interval {}s",
            config.search_text,
            config.trend_woeid,
            config.dry_run,
            config.poll_interval.as_secs()
        );
        Ok(config)
    }

    pub fn checkpoint_store(&self) -> CheckpointStore {
        CheckpointStore::in_dir(&self.var_dir)
    }
}
