//! Trend Listing Script
//!
//! Prints the current trend names of a location, which is handy for picking
//! the `--trend-woeid` of the bot. Credentials are read from the same
//! `xapi_*` environment variables as the bot.
//!
//! ```bash
//! cargo run --bin list_trends -- 721943
//! ```

use spinbot::twitter::{RetryPolicy, TwitterApi, TwitterClient, DEFAULT_API_BASE};
use spinbot::OAuthCredentials;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let woeid: u64 = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .map_err(|_| format!("WOEID must be a number, got '{}'", arg))?,
        None => spinbot::config::DEFAULT_TREND_WOEID,
    };

    let credentials = OAuthCredentials::from_env()?;
    let client = TwitterClient::new(credentials, DEFAULT_API_BASE, RetryPolicy::none())?;

    println!("Trends for WOEID {}:", woeid);
    for (i, name) in client.trend_names(woeid).await?.iter().enumerate() {
        println!("{:>3}. {}", i + 1, name);
    }

    Ok(())
}
