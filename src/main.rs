//! # Spinbot
//!
//! Polls the mentions of the bot account every few minutes and answers the
//! ones containing the search term with a canned message and a local trend.
//!
//! ## Environment Variables
//!
//! - `xapi_consumer_key`, `xapi_consumer_secret`: application keys
//! - `xapi_access_key`, `xapi_access_secret`: the bot account's access token pair
//! - `RUST_LOG`: log filter, `info` by default
//!
//! ## Example Usage
//!
//! ```bash
//! # Dry run (default): log the replies instead of sending them
//! cargo run
//!
//! # Go live, answering #spininelfianco with Rome's trends
//! cargo run -- --dry-run false
//!
//! # Another hashtag and location, with a status endpoint
//! cargo run -- --search '#forzaroma' --trend-woeid 23424853 --status-addr 0.0.0.0:3000
//! ```

use clap::Parser;
use log::{error, info};

use spinbot::{BotConfig, Cli};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize the logging system
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BotConfig::from_cli(Cli::parse())?;

    match spinbot::run(config).await {
        Ok(summary) => {
            info!("spinbot stopped after {} poll cycles", summary.cycles);
            Ok(())
        }
        Err(e) => {
            error!("spinbot failed: {}", e);
            Err(e.into())
        }
    }
}
