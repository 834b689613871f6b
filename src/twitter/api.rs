//! Core Twitter API utilities.
//!
//! This module contains the signed request helper shared by every endpoint,
//! the retry policy applied to it, and the [`TwitterApi`] trait the poller is
//! written against.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::{header::HeaderMap, Client, Method, StatusCode};
use std::time::Duration;
use url::Url;

use crate::error::ApiError;
use crate::oauth::{authorization_header, percent_encode, OAuthCredentials};

use super::mentions::Mention;

/// Default base URL of the v1.1 REST API.
pub const DEFAULT_API_BASE: &str = "https://api.twitter.com/1.1";

/// Extra seconds slept past the advertised rate-limit reset.
const RATE_LIMIT_MARGIN_SECS: i64 = 5;

/// The operations the bot needs from the platform.
#[async_trait]
pub trait TwitterApi: Send + Sync {
    /// Names of the current trends at location `woeid`.
    async fn trend_names(&self, woeid: u64) -> Result<Vec<String>, ApiError>;

    /// Mentions of the authenticated account with an id greater than `since_id`.
    async fn mentions_since(&self, since_id: u64) -> Result<Vec<Mention>, ApiError>;

    /// Posts `text` as a reply to status `in_reply_to`, returning the new status id.
    async fn reply_to(&self, text: &str, in_reply_to: u64) -> Result<u64, ApiError>;

    /// Retweets status `id`, returning the id of the retweet.
    async fn retweet(&self, id: u64) -> Result<u64, ApiError>;
}

/// Client-level retry behaviour, applied transparently to every request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retry_count: u32,
    /// Pause between retries on a retryable status.
    pub retry_delay: Duration,
    /// HTTP statuses that are retried.
    pub retry_statuses: Vec<u16>,
    /// Sleep until the rate-limit window resets on 429 instead of failing.
    /// These waits are unbounded and do not count against `retry_count`.
    pub wait_on_rate_limit: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 5,
            retry_delay: Duration::from_secs(10),
            retry_statuses: vec![401, 404, 500, 503],
            wait_on_rate_limit: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            retry_count: 0,
            retry_delay: Duration::ZERO,
            retry_statuses: Vec::new(),
            wait_on_rate_limit: false,
        }
    }
}

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// # Parameters
///
/// - `text`: The text to sanitize
/// - `max_len`: Maximum number of characters kept before truncation
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let truncated: String = sanitized.chars().take(max_len).collect();
        format!(
            "{}... [truncated, {} total bytes]",
            truncated,
            text.len()
        )
    } else {
        sanitized
    }
}

/// Pulls the human-readable message out of a v1.1 error body.
///
/// The API answers errors with `{"errors":[{"code":187,"message":"..."}]}`;
/// anything else is returned sanitized.
pub(crate) fn extract_error_message(body: &str, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            let first = json.get("errors")?.as_array()?.first()?.clone();
            let message = first.get("message")?.as_str()?.to_string();
            Some(match first.get("code").and_then(|c| c.as_i64()) {
                Some(code) => format!("{} (code {})", message, code),
                None => message,
            })
        });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string(),
        None => sanitize_for_logging(body, 200),
    }
}

fn rate_limit_wait(headers: &HeaderMap) -> Duration {
    let reset = headers
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());

    match reset {
        Some(reset) => {
            let secs = reset - chrono::Utc::now().timestamp() + RATE_LIMIT_MARGIN_SECS;
            Duration::from_secs(secs.max(0) as u64)
        }
        None => Duration::from_secs(60),
    }
}

fn encode_form(form: &[(String, String)]) -> String {
    form.iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// HTTP client for the v1.1 endpoints, authenticated with OAuth 1.0a.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    http: Client,
    base: Url,
    credentials: OAuthCredentials,
    retry: RetryPolicy,
}

impl TwitterClient {
    /// Creates a client rooted at `api_base` (for example [`DEFAULT_API_BASE`]).
    pub fn new(
        credentials: OAuthCredentials,
        api_base: &str,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        let mut base = api_base.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .map_err(|e| ApiError::Request(format!("invalid API base '{}': {}", api_base, e)))?;

        info!("Twitter API client targeting {}", base);
        Ok(Self {
            http: Client::new(),
            base,
            credentials,
            retry,
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Request(format!("invalid endpoint '{}': {}", path, e)))
    }

    /// Sends a signed request, retrying according to the client's [`RetryPolicy`].
    ///
    /// Each attempt is signed again so that nonce and timestamp stay fresh.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The API response body on success
    /// - `Err(ApiError)`: Transport failure, or the last non-success response
    pub(crate) async fn make_signed_request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        form: &[(String, String)],
        operation_name: &str,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(path)?;
        let mut signed_params = query.to_vec();
        signed_params.extend(form.iter().cloned());

        let mut attempt: u32 = 0;
        let mut rate_limit_waits: u32 = 0;
        loop {
            info!(
                "Making signed request for operation: {} (attempt {})",
                operation_name,
                attempt + 1
            );
            let auth_header =
                authorization_header(&self.credentials, method.as_str(), url.as_str(), &signed_params)?;
            debug!("Request URL: {} {}", method, url);
            debug!("Request headers: Authorization: OAuth [REDACTED]");

            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header("Authorization", auth_header);
            if !query.is_empty() {
                request = request.query(query);
            }
            if !form.is_empty() {
                request = request
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(encode_form(form));
            }

            let response = request.send().await.map_err(|e| {
                error!("Request for operation '{}' failed: {}", operation_name, e);
                ApiError::Transport {
                    operation: operation_name.to_string(),
                    source: e,
                }
            })?;

            let status = response.status();
            info!(
                "Received response with status: {} for operation: {}",
                status, operation_name
            );

            if status.is_success() {
                let response_text = response.text().await.map_err(|e| ApiError::Transport {
                    operation: operation_name.to_string(),
                    source: e,
                })?;
                debug!(
                    "Response summary for '{}': {} bytes received",
                    operation_name,
                    response_text.len()
                );
                return Ok(response_text);
            }

            if status == StatusCode::TOO_MANY_REQUESTS && self.retry.wait_on_rate_limit {
                let wait = rate_limit_wait(response.headers());
                rate_limit_waits += 1;
                warn!(
                    "Rate limit reached for operation '{}'. Sleeping for {} seconds (wait #{})",
                    operation_name,
                    wait.as_secs(),
                    rate_limit_waits
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            let can_retry = attempt < self.retry.retry_count;

            let error_text = response.text().await.unwrap_or_default();
            debug!(
                "Error response for '{}': {}",
                operation_name,
                sanitize_for_logging(&error_text, 200)
            );

            if can_retry && self.retry.retry_statuses.contains(&status.as_u16()) {
                attempt += 1;
                warn!(
                    "Operation '{}' returned {}, retrying in {} seconds ({}/{})",
                    operation_name,
                    status,
                    self.retry.retry_delay.as_secs(),
                    attempt,
                    self.retry.retry_count
                );
                tokio::time::sleep(self.retry.retry_delay).await;
                continue;
            }

            error!("Operation '{}' failed - Status: {}", operation_name, status);
            return Err(ApiError::Status {
                operation: operation_name.to_string(),
                status: status.as_u16(),
                message: extract_error_message(&error_text, status),
            });
        }
    }
}

#[async_trait]
impl TwitterApi for TwitterClient {
    async fn trend_names(&self, woeid: u64) -> Result<Vec<String>, ApiError> {
        self.fetch_trend_names(woeid).await
    }

    async fn mentions_since(&self, since_id: u64) -> Result<Vec<Mention>, ApiError> {
        self.fetch_mentions(since_id).await
    }

    async fn reply_to(&self, text: &str, in_reply_to: u64) -> Result<u64, ApiError> {
        self.update_status(text, in_reply_to).await
    }

    async fn retweet(&self, id: u64) -> Result<u64, ApiError> {
        self.retweet_status(id).await
    }
}

#[cfg(test)]
pub(crate) fn test_client(api_base: &str, retry: RetryPolicy) -> TwitterClient {
    let credentials = OAuthCredentials {
        consumer_key: "test-consumer-key".into(),
        consumer_secret: "test-consumer-secret".into(),
        access_key: "test-access-key".into(),
        access_secret: "test-access-secret".into(),
    };
    TwitterClient::new(credentials, api_base, retry).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_retries() -> RetryPolicy {
        RetryPolicy {
            retry_delay: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn endpoint_keeps_version_segment() {
        let client = test_client(DEFAULT_API_BASE, RetryPolicy::none());
        assert_eq!(
            client.endpoint("trends/place.json").unwrap().as_str(),
            "https://api.twitter.com/1.1/trends/place.json"
        );
    }

    #[test]
    fn error_message_from_v1_body() {
        let body = r#"{"errors":[{"code":187,"message":"Status is a duplicate."}]}"#;
        assert_eq!(
            extract_error_message(body, StatusCode::FORBIDDEN),
            "Status is a duplicate. (code 187)"
        );
        assert_eq!(
            extract_error_message("", StatusCode::SERVICE_UNAVAILABLE),
            "Service Unavailable"
        );
    }

    #[test]
    fn sanitize_truncates_on_char_boundaries() {
        let text = "héllo\nwörld and more";
        assert_eq!(sanitize_for_logging(text, 50), "héllo wörld and more");
        assert!(sanitize_for_logging(text, 3).starts_with("hél... [truncated"));
    }

    #[tokio::test]
    async fn retries_retryable_status_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/statuses/mentions_timeline.json"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/statuses/mentions_timeline.json"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), quick_retries());
        let body = client
            .make_signed_request(Method::GET, "statuses/mentions_timeline.json", &[], &[], "test")
            .await
            .unwrap();
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn non_retryable_status_fails_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/statuses/update.json"))
            .respond_with(ResponseTemplate::new(403).set_body_string(
                r#"{"errors":[{"code":187,"message":"Status is a duplicate."}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), quick_retries());
        let err = client
            .make_signed_request(
                Method::POST,
                "statuses/update.json",
                &[],
                &[("status".into(), "hi".into())],
                "update_status",
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("Status is a duplicate."));
    }

    #[tokio::test]
    async fn rate_limit_waits_do_not_use_up_retries() {
        let server = MockServer::start().await;
        let already_reset = (chrono::Utc::now().timestamp() - 60).to_string();
        Mock::given(method("GET"))
            .and(path("/statuses/mentions_timeline.json"))
            .respond_with(
                ResponseTemplate::new(429).insert_header("x-rate-limit-reset", already_reset.as_str()),
            )
            .up_to_n_times(4)
            .expect(4)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/statuses/mentions_timeline.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(
            &server.uri(),
            RetryPolicy {
                retry_count: 1,
                ..quick_retries()
            },
        );
        let body = client
            .make_signed_request(Method::GET, "statuses/mentions_timeline.json", &[], &[], "test")
            .await
            .unwrap();
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn rate_limit_fails_when_waiting_is_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), RetryPolicy::none());
        let err = client
            .make_signed_request(Method::GET, "trends/place.json", &[], &[], "trends")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(429));
    }

    #[tokio::test]
    async fn gives_up_after_retry_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let client = test_client(
            &server.uri(),
            RetryPolicy {
                retry_count: 2,
                ..quick_retries()
            },
        );
        let err = client
            .make_signed_request(Method::GET, "trends/place.json", &[], &[], "trends")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }
}
