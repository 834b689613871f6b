//! Startup sequence and the long-running bot loop.

use log::{error, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::BotConfig;
use crate::dispatch::{DispatchMode, ReplyDispatcher};
use crate::error::{BotError, BotResult};
use crate::handlers::status_router;
use crate::messages::load_messages;
use crate::oauth::OAuthCredentials;
use crate::poller::Session;
use crate::pool::TextPool;
use crate::scheduler::{RunSummary, Scheduler, Sleeper, TokioSleeper};
use crate::status::StatusHandle;
use crate::twitter::{TwitterApi, TwitterClient};

/// Loads credentials, builds the API client and runs the bot until Ctrl+C.
pub async fn run(config: BotConfig) -> BotResult<RunSummary> {
    let credentials = OAuthCredentials::from_env()?;
    let client = TwitterClient::new(credentials, &config.api_base, config.retry.clone())?;
    run_with_api(config, Arc::new(client), shutdown_on_ctrl_c()).await
}

/// Runs the bot against `api` until `cancel` fires.
pub async fn run_with_api(
    config: BotConfig,
    api: Arc<dyn TwitterApi>,
    cancel: CancellationToken,
) -> BotResult<RunSummary> {
    run_with_sleeper(config, api, TokioSleeper, cancel).await
}

/// Runs the bot against `api`, waiting between polls through `sleeper`.
///
/// Startup failures (checkpoint directory, trends fetch, messages file, empty
/// pools, status server bind) are fatal and returned before the first poll.
pub async fn run_with_sleeper<S: Sleeper>(
    config: BotConfig,
    api: Arc<dyn TwitterApi>,
    sleeper: S,
    cancel: CancellationToken,
) -> BotResult<RunSummary> {
    let checkpoint = config.checkpoint_store();
    checkpoint.ensure_dir()?;

    if config.dry_run {
        warn!("Running in dry-run mode: no write operation will be performed.");
    }
    info!(
        "start replying tweets containing \"{}\" ...",
        config.search_text
    );

    info!("API: fetch latest trends");
    let trends = TextPool::new("trend", api.trend_names(config.trend_woeid).await?)?;
    let messages = TextPool::new("message", load_messages(&config.messages_path)?)?;
    info!(
        "Loaded {} trends and {} reply messages",
        trends.len(),
        messages.len()
    );

    let status = StatusHandle::new(&config.search_text, config.dry_run);
    if let Some(addr) = config.status_addr {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(BotError::Server)?;
        info!("Starting status server on {}", addr);
        let app = status_router(status.clone());
        let server_cancel = cancel.clone();
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_cancel.cancelled().await })
                .await;
            if let Err(e) = result {
                error!("Status server error: {}", e);
            }
        });
    }

    let mut session = Session::new(
        api,
        checkpoint,
        messages,
        trends,
        config.search_text.clone(),
        ReplyDispatcher::new(DispatchMode::from_dry_run(config.dry_run)),
    )
    .with_start_id(config.last_mention_id);

    let scheduler = Scheduler::with_sleeper(config.poll_interval, sleeper, cancel, status)
        .with_backoff(config.backoff_max);
    scheduler.run(&mut session).await
}

/// Returns a token cancelled on the first Ctrl+C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, stopping after the current cycle");
                token.cancel();
            }
            Err(e) => error!("Cannot listen for shutdown signal: {}", e),
        }
    });
    cancel
}
