//! Mention polling.
//!
//! A [`Session`] owns everything one poll cycle needs: the API, the
//! checkpoint store, the message and trend pools, the search term and the
//! dispatcher. Each call to [`Session::poll_once`] fetches mentions newer than
//! the checkpoint, walks them oldest first, advances the checkpoint for every
//! mention and replies to the ones containing the search term.

use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use crate::checkpoint::CheckpointStore;
use crate::dispatch::{compose_reply, DispatchOutcome, ReplyDispatcher};
use crate::error::{ApiError, BotResult};
use crate::pool::TextPool;
use crate::twitter::{sanitize_for_logging, Mention, TwitterApi};

/// Result of the mentions fetch of one cycle.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The API answered with this many mentions (possibly zero).
    Fetched(usize),
    /// The API call failed; the cycle went on with no mentions.
    Failed(ApiError),
}

/// One matched mention and what happened to its reply.
#[derive(Debug)]
pub struct ReplyRecord {
    pub mention_id: u64,
    pub author: String,
    pub status_text: String,
    pub outcome: DispatchOutcome,
}

/// Summary of one poll cycle.
#[derive(Debug)]
pub struct PollReport {
    /// Mentions newer than this id were requested.
    pub since_id: u64,
    pub fetch: FetchOutcome,
    /// Mentions walked (and checkpointed), matched or not.
    pub processed: usize,
    /// Last id written to the checkpoint in this cycle.
    pub checkpoint: Option<u64>,
    pub replies: Vec<ReplyRecord>,
}

impl PollReport {
    fn new(since_id: u64, fetch: FetchOutcome) -> Self {
        Self {
            since_id,
            fetch,
            processed: 0,
            checkpoint: None,
            replies: Vec::new(),
        }
    }

    pub fn fetch_failed(&self) -> bool {
        matches!(self.fetch, FetchOutcome::Failed(_))
    }

    pub fn sent(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Sent { .. }))
    }

    pub fn simulated(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Simulated))
    }

    pub fn failed(&self) -> usize {
        self.count(DispatchOutcome::is_failure)
    }

    fn count(&self, pred: impl Fn(&DispatchOutcome) -> bool) -> usize {
        self.replies.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// State shared by every poll cycle.
pub struct Session {
    api: Arc<dyn TwitterApi>,
    checkpoint: CheckpointStore,
    messages: TextPool,
    trends: TextPool,
    search_term: String,
    start_id: Option<u64>,
    dispatcher: ReplyDispatcher,
    rng: StdRng,
}

impl Session {
    pub fn new(
        api: Arc<dyn TwitterApi>,
        checkpoint: CheckpointStore,
        messages: TextPool,
        trends: TextPool,
        search_term: impl Into<String>,
        dispatcher: ReplyDispatcher,
    ) -> Self {
        Self {
            api,
            checkpoint,
            messages,
            trends,
            search_term: search_term.into(),
            start_id: None,
            dispatcher,
            rng: StdRng::from_entropy(),
        }
    }

    /// Starts from `id` instead of the stored checkpoint.
    ///
    /// The id is used until a mentions fetch succeeds, at which point it is
    /// written to the checkpoint and later cycles read the checkpoint.
    pub fn with_start_id(mut self, id: Option<u64>) -> Self {
        self.start_id = id;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn dispatcher(&self) -> &ReplyDispatcher {
        &self.dispatcher
    }

    pub fn checkpoint(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    /// Builds the reply for `mention` from a random message and trend.
    pub fn compose(&mut self, mention: &Mention) -> String {
        let message = self.messages.pick(&mut self.rng);
        let trend = self.trends.pick(&mut self.rng);
        compose_reply(mention.author(), message, trend)
    }

    /// Runs one poll cycle.
    ///
    /// API failures are recorded in the returned report; only checkpoint
    /// I/O errors are returned as `Err`.
    pub async fn poll_once(&mut self) -> BotResult<PollReport> {
        let since_id = match self.start_id {
            Some(id) => id,
            None => self.checkpoint.retrieve()?,
        };
        info!("find mentions (from ID: {}) and reply ...", since_id);

        let mut mentions = match self.api.mentions_since(since_id).await {
            Ok(mentions) => mentions,
            Err(e) => {
                error!("API ERROR: cannot fetch mentions: {}", e);
                return Ok(PollReport::new(since_id, FetchOutcome::Failed(e)));
            }
        };
        if self.start_id.take().is_some() {
            self.checkpoint.store(since_id)?;
        }

        let mut report = PollReport::new(since_id, FetchOutcome::Fetched(mentions.len()));
        if mentions.is_empty() {
            info!("no mentions found.");
            return Ok(report);
        }

        mentions.sort_by_key(|m| m.id);
        let api = Arc::clone(&self.api);

        for mention in &mentions {
            self.checkpoint.store(mention.id)?;
            report.checkpoint = Some(mention.id);
            report.processed += 1;

            if !mention.contains_term(&self.search_term) {
                continue;
            }

            info!(
                "mention: {} - {}{}",
                mention.id,
                sanitize_for_logging(&mention.text, 280),
                mention
                    .created_at()
                    .map(|at| format!(" ({})", at.format("%Y-%m-%d %H:%M")))
                    .unwrap_or_default()
            );
            info!("found \"{}\". responding back ...", self.search_term);

            let status_text = self.compose(mention);
            let outcome = self
                .dispatcher
                .dispatch(api.as_ref(), &status_text, mention)
                .await;

            report.replies.push(ReplyRecord {
                mention_id: mention.id,
                author: mention.author().to_string(),
                status_text,
                outcome,
            });
        }

        info!(
            "processed {} mentions, {} matched \"{}\" ({} sent, {} simulated, {} failed)",
            report.processed,
            report.replies.len(),
            self.search_term,
            report.sent(),
            report.simulated(),
            report.failed()
        );
        Ok(report)
    }
}
