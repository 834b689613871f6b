//! Mentions timeline for the authenticated account.

use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::Method;
use serde::Deserialize;

use crate::error::ApiError;

use super::api::TwitterClient;

/// Timestamp format of v1.1 `created_at` fields, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Largest page the mentions timeline returns.
const MENTIONS_PAGE_SIZE: u32 = 200;

/// A status that mentions the bot account.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Mention {
    pub id: u64,
    pub text: String,
    pub user: MentionAuthor,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MentionAuthor {
    pub screen_name: String,
}

impl Mention {
    pub fn new(id: u64, screen_name: &str, text: &str) -> Self {
        Self {
            id,
            text: text.to_string(),
            user: MentionAuthor {
                screen_name: screen_name.to_string(),
            },
            created_at: None,
        }
    }

    pub fn author(&self) -> &str {
        &self.user.screen_name
    }

    /// True when `term` occurs in the text, ignoring case.
    pub fn contains_term(&self, term: &str) -> bool {
        self.text.to_lowercase().contains(&term.to_lowercase())
    }

    /// Parsed creation time, if present and well formed.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?;
        DateTime::parse_from_str(raw, CREATED_AT_FORMAT)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl TwitterClient {
    /// Fetches mentions newer than `since_id` from `statuses/mentions_timeline.json`.
    ///
    /// The API returns them newest first; ordering is left to the caller.
    pub async fn fetch_mentions(&self, since_id: u64) -> Result<Vec<Mention>, ApiError> {
        info!("Fetching mentions since ID {}", since_id);

        let query = vec![
            ("since_id".to_string(), since_id.to_string()),
            ("count".to_string(), MENTIONS_PAGE_SIZE.to_string()),
        ];
        let response_text = self
            .make_signed_request(
                Method::GET,
                "statuses/mentions_timeline.json",
                &query,
                &[],
                "fetch_mentions",
            )
            .await?;

        let mentions: Vec<Mention> =
            serde_json::from_str(&response_text).map_err(|e| ApiError::Decode {
                operation: "fetch_mentions".to_string(),
                reason: e.to_string(),
            })?;

        debug!("Mentions timeline returned {} statuses", mentions.len());
        Ok(mentions)
    }
}
