//! Test doubles: an in-memory [`TwitterApi`], a recording [`Sleeper`] and a
//! per-thread log capture.

use async_trait::async_trait;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::cell::RefCell;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::scheduler::Sleeper;
use crate::twitter::{Mention, TwitterApi};

#[derive(Default)]
pub(crate) struct FakeApi {
    mentions: Vec<Mention>,
    trends: Vec<String>,
    fail_trends: bool,
    fail_mentions: bool,
    mention_failures_left: Mutex<usize>,
    fail_replies: bool,
    fail_retweets: bool,
    since_ids: Mutex<Vec<u64>>,
    replies: Mutex<Vec<(String, u64)>>,
    retweets: Mutex<Vec<u64>>,
}

fn unavailable(operation: &str) -> ApiError {
    ApiError::Status {
        operation: operation.to_string(),
        status: 503,
        message: "Over capacity".to_string(),
    }
}

impl FakeApi {
    /// Serves `mentions` in the given order, filtered by `since_id`.
    pub(crate) fn with_mentions(mut self, mentions: Vec<Mention>) -> Self {
        self.mentions = mentions;
        self
    }

    pub(crate) fn with_trends(mut self, trends: &[&str]) -> Self {
        self.trends = trends.iter().map(|t| t.to_string()).collect();
        self
    }

    pub(crate) fn failing_trends(mut self) -> Self {
        self.fail_trends = true;
        self
    }

    pub(crate) fn failing_mentions(mut self) -> Self {
        self.fail_mentions = true;
        self
    }

    /// Fails the next `times` mentions fetches, then serves normally.
    pub(crate) fn failing_mentions_times(self, times: usize) -> Self {
        *self.mention_failures_left.lock().unwrap() = times;
        self
    }

    pub(crate) fn failing_replies(mut self) -> Self {
        self.fail_replies = true;
        self
    }

    pub(crate) fn failing_retweets(mut self) -> Self {
        self.fail_retweets = true;
        self
    }

    pub(crate) fn since_ids(&self) -> Vec<u64> {
        self.since_ids.lock().unwrap().clone()
    }

    pub(crate) fn replies(&self) -> Vec<(String, u64)> {
        self.replies.lock().unwrap().clone()
    }

    pub(crate) fn retweets(&self) -> Vec<u64> {
        self.retweets.lock().unwrap().clone()
    }
}

#[async_trait]
impl TwitterApi for FakeApi {
    async fn trend_names(&self, _woeid: u64) -> Result<Vec<String>, ApiError> {
        if self.fail_trends {
            return Err(unavailable("fetch_trends"));
        }
        Ok(self.trends.clone())
    }

    async fn mentions_since(&self, since_id: u64) -> Result<Vec<Mention>, ApiError> {
        self.since_ids.lock().unwrap().push(since_id);
        if self.fail_mentions {
            return Err(unavailable("fetch_mentions"));
        }
        {
            let mut left = self.mention_failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(unavailable("fetch_mentions"));
            }
        }
        Ok(self
            .mentions
            .iter()
            .filter(|m| m.id > since_id)
            .cloned()
            .collect())
    }

    async fn reply_to(&self, text: &str, in_reply_to: u64) -> Result<u64, ApiError> {
        if self.fail_replies {
            return Err(unavailable("update_status"));
        }
        let mut replies = self.replies.lock().unwrap();
        replies.push((text.to_string(), in_reply_to));
        Ok(1000 + replies.len() as u64)
    }

    async fn retweet(&self, id: u64) -> Result<u64, ApiError> {
        if self.fail_retweets {
            return Err(unavailable("retweet"));
        }
        self.retweets.lock().unwrap().push(id);
        Ok(2000 + id)
    }
}

/// Records requested sleeps without waiting and cancels after `limit` of them.
pub(crate) struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
    limit: usize,
    cancel: CancellationToken,
}

impl RecordingSleeper {
    pub(crate) fn new(limit: usize, cancel: CancellationToken) -> Self {
        Self {
            slept: Arc::new(Mutex::new(Vec::new())),
            limit,
            cancel,
        }
    }

    /// Shared view of the durations slept so far.
    pub(crate) fn slept(&self) -> Arc<Mutex<Vec<Duration>>> {
        self.slept.clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let mut slept = self.slept.lock().unwrap();
        slept.push(duration);
        if slept.len() >= self.limit {
            self.cancel.cancel();
        }
    }
}

thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Keeps every record on the thread that emitted it.
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED.with(|c| {
            c.borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Installs the capturing logger once and clears this thread's records.
pub(crate) fn capture_logs() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
    CAPTURED.with(|c| c.borrow_mut().clear());
}

/// Records logged on this thread since the last [`capture_logs`].
pub(crate) fn captured_logs() -> Vec<(Level, String)> {
    CAPTURED.with(|c| c.borrow().clone())
}
