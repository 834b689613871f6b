//! In-memory progress snapshot shared with the status server.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::dispatch::DispatchOutcome;
use crate::poller::{FetchOutcome, PollReport};

/// Serializable view of the bot's progress.
#[derive(Debug, Clone, Serialize)]
pub struct BotStatus {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub search_term: String,
    pub cycles: u64,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_checkpoint: Option<u64>,
    pub replies_sent: u64,
    pub replies_simulated: u64,
    pub replies_failed: u64,
    pub fetch_failures: u64,
    pub consecutive_fetch_failures: u32,
    pub last_error: Option<String>,
}

/// Cloneable handle to the shared [`BotStatus`].
#[derive(Debug, Clone)]
pub struct StatusHandle {
    inner: Arc<RwLock<BotStatus>>,
}

impl StatusHandle {
    pub fn new(search_term: &str, dry_run: bool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(BotStatus {
                started_at: Utc::now(),
                dry_run,
                search_term: search_term.to_string(),
                cycles: 0,
                last_poll_at: None,
                last_checkpoint: None,
                replies_sent: 0,
                replies_simulated: 0,
                replies_failed: 0,
                fetch_failures: 0,
                consecutive_fetch_failures: 0,
                last_error: None,
            })),
        }
    }

    /// Folds one cycle's report into the snapshot.
    pub async fn record(&self, report: &PollReport) {
        let mut status = self.inner.write().await;
        status.cycles += 1;
        status.last_poll_at = Some(Utc::now());
        if report.checkpoint.is_some() {
            status.last_checkpoint = report.checkpoint;
        }
        status.replies_sent += report.sent() as u64;
        status.replies_simulated += report.simulated() as u64;
        status.replies_failed += report.failed() as u64;

        match &report.fetch {
            FetchOutcome::Failed(e) => {
                status.fetch_failures += 1;
                status.consecutive_fetch_failures += 1;
                status.last_error = Some(e.to_string());
            }
            FetchOutcome::Fetched(_) => {
                status.consecutive_fetch_failures = 0;
            }
        }
        if let Some(failed) = report.replies.iter().rev().find_map(|r| match &r.outcome {
            DispatchOutcome::Failed(e) => Some(e.to_string()),
            _ => None,
        }) {
            status.last_error = Some(failed);
        }
    }

    pub async fn snapshot(&self) -> BotStatus {
        self.inner.read().await.clone()
    }
}
