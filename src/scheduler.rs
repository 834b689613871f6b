//! Periodic polling task.
//!
//! The scheduler runs one poll cycle, records it, then sleeps for the poll
//! interval until its [`CancellationToken`] fires. Sleeping goes through the
//! [`Sleeper`] trait so tests can drive the loop without real time passing.

use async_trait::async_trait;
use log::{info, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::BotResult;
use crate::poller::Session;
use crate::status::StatusHandle;

/// Default pause between polls, matching the platform's 5 minute rate-limit window.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Totals of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
}

pub struct Scheduler<S = TokioSleeper> {
    interval: Duration,
    backoff_max: Option<Duration>,
    sleeper: S,
    cancel: CancellationToken,
    status: StatusHandle,
}

impl Scheduler<TokioSleeper> {
    pub fn new(interval: Duration, cancel: CancellationToken, status: StatusHandle) -> Self {
        Self::with_sleeper(interval, TokioSleeper, cancel, status)
    }
}

impl<S: Sleeper> Scheduler<S> {
    pub fn with_sleeper(
        interval: Duration,
        sleeper: S,
        cancel: CancellationToken,
        status: StatusHandle,
    ) -> Self {
        Self {
            interval,
            backoff_max: None,
            sleeper,
            cancel,
            status,
        }
    }

    /// Doubles the wait after each consecutive mentions-fetch failure, up to `max`.
    ///
    /// `None` keeps the fixed interval regardless of failures.
    pub fn with_backoff(mut self, max: Option<Duration>) -> Self {
        self.backoff_max = max;
        self
    }

    /// Wait before the next cycle given the number of consecutive fetch failures.
    pub fn next_wait(&self, consecutive_failures: u32) -> Duration {
        match self.backoff_max {
            Some(max) if consecutive_failures > 0 => {
                let factor = 2u32.saturating_pow(consecutive_failures.min(16));
                self.interval
                    .saturating_mul(factor)
                    .min(max.max(self.interval))
            }
            _ => self.interval,
        }
    }

    /// Polls until cancelled.
    ///
    /// A running cycle is never interrupted; cancellation is observed before
    /// each cycle and during the sleep. Errors from [`Session::poll_once`]
    /// stop the loop and are returned.
    pub async fn run(&self, session: &mut Session) -> BotResult<RunSummary> {
        let mut cycles = 0;
        let mut consecutive_failures: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let report = session.poll_once().await?;
            cycles += 1;
            self.status.record(&report).await;

            if report.fetch_failed() {
                consecutive_failures += 1;
                if self.backoff_max.is_some() {
                    warn!(
                        "{} consecutive mentions fetch failures",
                        consecutive_failures
                    );
                }
            } else {
                consecutive_failures = 0;
            }

            let wait = self.next_wait(consecutive_failures);
            info!("next check in {} seconds", wait.as_secs());

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.sleeper.sleep(wait) => {}
            }
        }

        info!("Polling stopped after {} cycles", cycles);
        Ok(RunSummary { cycles })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointStore;
    use crate::dispatch::{DispatchMode, ReplyDispatcher};
    use crate::pool::TextPool;
    use crate::testing::{FakeApi, RecordingSleeper};
    use crate::twitter::Mention;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    fn session(api: Arc<FakeApi>, var_dir: &Path) -> Session {
        Session::new(
            api,
            CheckpointStore::in_dir(var_dir),
            TextPool::new("message", vec!["ciao".into()]).unwrap(),
            TextPool::new("trend", vec!["#Roma".into()]).unwrap(),
            "#spininelfianco",
            ReplyDispatcher::new(DispatchMode::Live),
        )
    }

    fn scheduler(
        limit: usize,
        backoff: Option<Duration>,
    ) -> (Scheduler<RecordingSleeper>, Arc<Mutex<Vec<Duration>>>, StatusHandle) {
        let cancel = CancellationToken::new();
        let status = StatusHandle::new("#spininelfianco", false);
        let sleeper = RecordingSleeper::new(limit, cancel.clone());
        let slept = sleeper.slept();
        let scheduler =
            Scheduler::with_sleeper(DEFAULT_POLL_INTERVAL, sleeper, cancel, status.clone())
                .with_backoff(backoff);
        (scheduler, slept, status)
    }

    #[tokio::test]
    async fn polls_at_fixed_interval_until_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(
            FakeApi::default().with_mentions(vec![Mention::new(6, "bob", "#spininelfianco")]),
        );
        let mut session = session(api.clone(), dir.path());
        let (scheduler, slept, status) = scheduler(3, None);

        let summary = scheduler.run(&mut session).await.unwrap();

        assert_eq!(summary.cycles, 3);
        assert_eq!(*slept.lock().unwrap(), vec![DEFAULT_POLL_INTERVAL; 3]);
        assert_eq!(api.since_ids(), vec![1, 6, 6]);
        assert_eq!(api.replies().len(), 1);

        let snapshot = status.snapshot().await;
        assert_eq!(snapshot.cycles, 3);
        assert_eq!(snapshot.replies_sent, 1);
        assert_eq!(snapshot.last_checkpoint, Some(6));
    }

    #[tokio::test]
    async fn fetch_failures_keep_fixed_interval_without_backoff() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::default().failing_mentions());
        let mut session = session(api, dir.path());
        let (scheduler, slept, status) = scheduler(2, None);

        scheduler.run(&mut session).await.unwrap();

        assert_eq!(*slept.lock().unwrap(), vec![DEFAULT_POLL_INTERVAL; 2]);
        let snapshot = status.snapshot().await;
        assert_eq!(snapshot.fetch_failures, 2);
        assert!(snapshot.last_error.unwrap().contains("Over capacity"));
    }

    #[tokio::test]
    async fn backoff_doubles_up_to_the_maximum() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::default().failing_mentions());
        let mut session = session(api, dir.path());
        let (scheduler, slept, _) = scheduler(3, Some(Duration::from_secs(1200)));

        scheduler.run(&mut session).await.unwrap();

        assert_eq!(
            *slept.lock().unwrap(),
            vec![
                Duration::from_secs(600),
                Duration::from_secs(1200),
                Duration::from_secs(1200)
            ]
        );
    }

    #[test]
    fn next_wait_resets_after_success() {
        let (scheduler, _, _) = scheduler(1, Some(Duration::from_secs(3600)));
        assert_eq!(scheduler.next_wait(0), DEFAULT_POLL_INTERVAL);
        assert_eq!(scheduler.next_wait(1), Duration::from_secs(600));
        assert_eq!(scheduler.next_wait(40), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_no_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::default());
        let mut session = session(api.clone(), dir.path());
        let (scheduler, _, _) = scheduler(1, None);
        scheduler.cancel.cancel();

        let summary = scheduler.run(&mut session).await.unwrap();
        assert_eq!(summary.cycles, 0);
        assert!(api.since_ids().is_empty());
    }

    #[tokio::test]
    async fn checkpoint_error_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let api = Arc::new(FakeApi::default());
        let mut session = session(api, &blocker);
        let (scheduler, slept, _) = scheduler(5, None);

        assert!(scheduler.run(&mut session).await.is_err());
        assert!(slept.lock().unwrap().is_empty());
    }
}
