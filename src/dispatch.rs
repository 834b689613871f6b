//! Reply composition and dispatch.
//!
//! In live mode a matched mention gets a reply status followed by a retweet.
//! In dry-run mode nothing is sent and the would-be calls are only logged.

use log::{error, info, warn};

use crate::error::ApiError;
use crate::twitter::{Mention, TwitterApi};

/// Whether state-changing API calls are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Live,
    DryRun,
}

impl DispatchMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            DispatchMode::DryRun
        } else {
            DispatchMode::Live
        }
    }

    pub fn is_dry_run(self) -> bool {
        self == DispatchMode::DryRun
    }
}

/// What happened to one reply.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Reply posted and mention retweeted.
    Sent { status_id: u64 },
    /// Dry-run: only logged.
    Simulated,
    /// The API rejected the reply or the retweet; the reply is dropped.
    Failed(ApiError),
}

impl DispatchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DispatchOutcome::Failed(_))
    }
}

/// Builds `@<author> <message> [trend: <trend>]`.
pub fn compose_reply(author: &str, message: &str, trend: &str) -> String {
    format!("@{} {} [trend: {}]", author, message, trend)
}

/// Sends replies according to its [`DispatchMode`].
#[derive(Debug, Clone, Copy)]
pub struct ReplyDispatcher {
    mode: DispatchMode,
}

impl ReplyDispatcher {
    pub fn new(mode: DispatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Replies to `mention` with `status_text` and retweets it.
    ///
    /// API errors are logged and returned as [`DispatchOutcome::Failed`],
    /// never raised. A failed reply skips the retweet.
    pub async fn dispatch(
        &self,
        api: &dyn TwitterApi,
        status_text: &str,
        mention: &Mention,
    ) -> DispatchOutcome {
        if self.mode.is_dry_run() {
            warn!("API WOULD: update the status with \"{}\"", status_text);
            warn!("API WOULD: retweet to {}", mention.author());
            return DispatchOutcome::Simulated;
        }

        let status_id = match api.reply_to(status_text, mention.id).await {
            Ok(id) => id,
            Err(e) => {
                error!("API ERROR: cannot reply to {}: {}", mention.id, e);
                return DispatchOutcome::Failed(e);
            }
        };

        if let Err(e) = api.retweet(mention.id).await {
            error!("API ERROR: cannot retweet {}: {}", mention.id, e);
            return DispatchOutcome::Failed(e);
        }

        info!(
            "Replied to @{} with status {} and retweeted {}",
            mention.author(),
            status_id,
            mention.id
        );
        DispatchOutcome::Sent { status_id }
    }
}
