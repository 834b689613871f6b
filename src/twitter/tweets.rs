//! Status updates and retweets.

use log::{debug, info};
use reqwest::Method;
use serde::Deserialize;

use crate::error::ApiError;

use super::api::{sanitize_for_logging, TwitterClient};

#[derive(Debug, Deserialize)]
struct PostedStatus {
    id: u64,
}

fn decode_posted(operation: &str, body: &str) -> Result<u64, ApiError> {
    serde_json::from_str::<PostedStatus>(body)
        .map(|status| status.id)
        .map_err(|e| ApiError::Decode {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
}

impl TwitterClient {
    /// Posts `text` as a reply to status `in_reply_to` via `statuses/update.json`.
    ///
    /// The API only threads the reply when `text` mentions the author of the
    /// original status.
    ///
    /// # Returns
    ///
    /// - `Ok(u64)`: The id of the posted status
    /// - `Err(ApiError)`: If the request fails or the API rejects the status
    pub async fn update_status(&self, text: &str, in_reply_to: u64) -> Result<u64, ApiError> {
        info!(
            "Replying to status {} with text: '{}'",
            in_reply_to,
            sanitize_for_logging(text, 280)
        );

        let form = vec![
            ("status".to_string(), text.to_string()),
            ("in_reply_to_status_id".to_string(), in_reply_to.to_string()),
        ];
        let body = self
            .make_signed_request(Method::POST, "statuses/update.json", &[], &form, "update_status")
            .await?;

        let id = decode_posted("update_status", &body)?;
        debug!("Posted status {}", id);
        Ok(id)
    }

    /// Retweets status `id` via `statuses/retweet/<id>.json`.
    pub async fn retweet_status(&self, id: u64) -> Result<u64, ApiError> {
        info!("Retweeting status {}", id);

        let path = format!("statuses/retweet/{}.json", id);
        let body = self
            .make_signed_request(Method::POST, &path, &[], &[], "retweet")
            .await?;

        let retweet_id = decode_posted("retweet", &body)?;
        debug!("Retweet created with id {}", retweet_id);
        Ok(retweet_id)
    }
}
