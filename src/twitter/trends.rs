//! Trends by location.

use log::info;
use reqwest::Method;
use serde::Deserialize;

use crate::error::ApiError;

use super::api::TwitterClient;

#[derive(Debug, Deserialize)]
struct TrendLocation {
    trends: Vec<Trend>,
}

#[derive(Debug, Deserialize)]
struct Trend {
    name: String,
}

impl TwitterClient {
    /// Fetches the trend names for location `woeid` from `trends/place.json`.
    ///
    /// Only the first result set is used.
    pub async fn fetch_trend_names(&self, woeid: u64) -> Result<Vec<String>, ApiError> {
        info!("Fetching latest trends for WOEID {}", woeid);

        let query = vec![("id".to_string(), woeid.to_string())];
        let response_text = self
            .make_signed_request(Method::GET, "trends/place.json", &query, &[], "fetch_trends")
            .await?;

        let locations: Vec<TrendLocation> =
            serde_json::from_str(&response_text).map_err(|e| ApiError::Decode {
                operation: "fetch_trends".to_string(),
                reason: e.to_string(),
            })?;

        let first = locations.into_iter().next().ok_or_else(|| ApiError::Decode {
            operation: "fetch_trends".to_string(),
            reason: "response holds no trend locations".to_string(),
        })?;

        let names: Vec<String> = first.trends.into_iter().map(|t| t.name).collect();
        info!("Found {} trends for WOEID {}", names.len(), woeid);
        Ok(names)
    }
}
