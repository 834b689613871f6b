//! OAuth 1.0a authentication for the Twitter/X v1.1 API.
//!
//! This module builds the signed `Authorization` header required by the v1.1
//! endpoints (trends, mentions timeline, status updates and retweets). The
//! signature is HMAC-SHA1 over the request method, base URL and the sorted,
//! percent-encoded parameters.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use log::{debug, error, info, warn};
use rand::RngCore;
use sha1::Sha1;

use crate::error::{ApiError, BotError, BotResult};

type HmacSha1 = Hmac<Sha1>;

pub const CONSUMER_KEY_VAR: &str = "xapi_consumer_key";
pub const CONSUMER_SECRET_VAR: &str = "xapi_consumer_secret";
pub const ACCESS_KEY_VAR: &str = "xapi_access_key";
pub const ACCESS_SECRET_VAR: &str = "xapi_access_secret";

/// The four secrets identifying the application and the bot account.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_key: String,
    pub access_secret: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &mask_secret(&self.consumer_key))
            .field("consumer_secret", &"[REDACTED]")
            .field("access_key", &mask_secret(&self.access_key))
            .field("access_secret", &"[REDACTED]")
            .finish()
    }
}

impl OAuthCredentials {
    /// Loads the credentials from the `xapi_*` environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `xapi_consumer_key`, `xapi_consumer_secret`: the application keys
    /// - `xapi_access_key`, `xapi_access_secret`: the bot account's access token pair
    pub fn from_env() -> BotResult<Self> {
        info!("Loading Twitter credentials from environment variables");
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads the credentials through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> BotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let load = |name: &'static str| -> BotResult<String> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => {
                    debug!(
                        "Found {} with length {} (masked: {})",
                        name,
                        value.len(),
                        mask_secret(&value)
                    );
                    if value.len() < 10 {
                        warn!(
                            "{} seems unusually short ({} characters)",
                            name,
                            value.len()
                        );
                    }
                    Ok(value.trim().to_string())
                }
                Some(_) => {
                    error!("{} is set but empty", name);
                    Err(BotError::MissingCredential(name))
                }
                None => {
                    error!("Make sure the {} environment variable is set", name);
                    Err(BotError::MissingCredential(name))
                }
            }
        };

        Ok(Self {
            consumer_key: load(CONSUMER_KEY_VAR)?,
            consumer_secret: load(CONSUMER_SECRET_VAR)?,
            access_key: load(ACCESS_KEY_VAR)?,
            access_secret: load(ACCESS_SECRET_VAR)?,
        })
    }
}

/// Masks a secret for logging, keeping at most the first and last 8 characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let len = chars.len();
    let prefix: String = chars.iter().take(8).collect();
    if len > 16 {
        let suffix: String = chars[len - 8..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        format!("{}...", prefix)
    }
}

/// Percent-encodes `value` per RFC 3986 (everything but `A-Z a-z 0-9 - . _ ~`).
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Builds the OAuth 1.0a `Authorization` header for a request.
///
/// `params` must hold every query-string and form-body parameter of the
/// request, unencoded. `url` is the base URL without query string.
pub fn authorization_header(
    credentials: &OAuthCredentials,
    method: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<String, ApiError> {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    authorization_header_with(credentials, method, url, params, &generate_nonce(), &timestamp)
}

/// Same as [`authorization_header`] with a fixed nonce and timestamp.
pub fn authorization_header_with(
    credentials: &OAuthCredentials,
    method: &str,
    url: &str,
    params: &[(String, String)],
    nonce: &str,
    timestamp: &str,
) -> Result<String, ApiError> {
    let mut oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), credentials.consumer_key.clone()),
        ("oauth_nonce".into(), nonce.to_string()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), timestamp.to_string()),
        ("oauth_token".into(), credentials.access_key.clone()),
        ("oauth_version".into(), "1.0".into()),
    ];

    let base = signature_base_string(method, url, params, &oauth_params);
    let signature = sign(&base, &credentials.consumer_secret, &credentials.access_secret)?;
    oauth_params.push(("oauth_signature".into(), signature));
    oauth_params.sort();

    let fields: Vec<String> = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect();
    Ok(format!("OAuth {}", fields.join(", ")))
}

/// Builds `METHOD&enc(url)&enc(sorted parameter string)`.
pub fn signature_base_string(
    method: &str,
    url: &str,
    params: &[(String, String)],
    oauth_params: &[(String, String)],
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .chain(oauth_params.iter())
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let parameter_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&parameter_string)
    )
}

fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> Result<String, ApiError> {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| ApiError::Request(format!("invalid signing key: {}", e)))?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
