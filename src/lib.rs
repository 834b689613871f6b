//! # Spinbot Library
//!
//! A Twitter/X bot that polls the mentions of its account, picks the ones
//! containing a search term and answers each with a canned message decorated
//! with one of the current trends of a location, then retweets the mention.
//!
//! ## Features
//!
//! - OAuth 1.0a signed client for the v1.1 trends, mentions, status and retweet endpoints
//! - Client-level retries and rate-limit waiting
//! - File-backed checkpoint of the last processed mention
//! - Dry-run mode that only logs the replies it would send
//! - Cancellable polling loop with optional backoff on repeated failures
//! - Optional `/health` and `/status` HTTP endpoints
//! - Structured logging
//!
//! ## Configuration
//!
//! - `xapi_consumer_key`, `xapi_consumer_secret`, `xapi_access_key`,
//!   `xapi_access_secret`: API credentials (required)
//! - `RUST_LOG`: log filter (defaults to `info`)
//! - command line flags, see [`config::Cli`]

pub mod app;
pub mod checkpoint;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod messages;
pub mod oauth;
pub mod poller;
pub mod pool;
pub mod scheduler;
pub mod status;
pub mod twitter;

// Re-export commonly used types and functions
pub use app::{run, run_with_api, run_with_sleeper};
pub use checkpoint::CheckpointStore;
pub use config::{BotConfig, Cli};
pub use dispatch::{compose_reply, DispatchMode, DispatchOutcome, ReplyDispatcher};
pub use error::{ApiError, BotError, BotResult};
pub use messages::load_messages;
pub use oauth::OAuthCredentials;
pub use poller::{FetchOutcome, PollReport, Session};
pub use scheduler::{Scheduler, Sleeper, TokioSleeper};
pub use status::{BotStatus, StatusHandle};
pub use twitter::{Mention, RetryPolicy, TwitterApi, TwitterClient};

#[cfg(test)]
mod testing;
