//! Twitter/X API integration module.
//!
//! This module contains the OAuth 1.0a client for the v1.1 endpoints used by
//! the bot: trends by location, the mentions timeline, status updates and
//! retweets.

mod api;
mod mentions;
mod trends;
mod tweets;

// Re-export public API
pub use api::{RetryPolicy, TwitterApi, TwitterClient, DEFAULT_API_BASE};
pub use mentions::{Mention, MentionAuthor};

// Crate-internal re-exports
pub(crate) use api::sanitize_for_logging;
