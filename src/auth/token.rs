//! OAuth2 client-credentials token source with transparent refresh.
//!
//! One exchange is in flight at a time: callers that arrive while a refresh
//! is running wait on the cache lock and then reuse the fresh token.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, debug_span, info, Instrument};
use zeroize::Zeroizing;

use super::credentials::BrokerCredentials;
use crate::error::{BridgeError, Result};
use crate::observability::metrics;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// OAuth2 error body (RFC 6749 section 5.2)
#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// `Auth` error for a rejected exchange, carrying whatever the endpoint explained
fn token_failure(endpoint: &str, status: StatusCode, body: &[u8]) -> BridgeError {
    let detail = match serde_json::from_slice::<TokenErrorResponse>(body) {
        Ok(oauth) if oauth.error_description.is_empty() => oauth.error,
        Ok(oauth) => format!("{}: {}", oauth.error, oauth.error_description),
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    };

    if detail.is_empty() {
        BridgeError::Auth(format!(
            "token endpoint {endpoint} returned {}",
            status.as_u16()
        ))
    } else {
        BridgeError::Auth(format!(
            "token endpoint {endpoint} returned {}: {detail}",
            status.as_u16()
        ))
    }
}

#[derive(Clone)]
struct AccessToken {
    value: Zeroizing<String>,
    /// `None` when the token endpoint did not declare a lifetime
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_expired(&self, now: Instant, leeway: Duration) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + leeway >= expires_at)
    }
}

pub struct TokenSource {
    http: Client,
    credentials: BrokerCredentials,
    leeway: Duration,
    cached: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("client_id", &self.credentials.client_id)
            .field("token_endpoint", &self.credentials.token_endpoint())
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    #[must_use]
    pub fn new(http: Client, credentials: BrokerCredentials, leeway: Duration) -> Self {
        Self {
            http,
            credentials,
            leeway,
            cached: Mutex::new(None),
        }
    }

    /// A valid access token, fetching a new one if none is cached or the
    /// cached one expires within the leeway
    ///
    /// # Errors
    /// Returns `Transport` if the token endpoint is unreachable, `Auth` if it
    /// rejects the client, and `Decode` for an unreadable token response
    pub async fn access_token(&self) -> Result<Zeroizing<String>> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired(Instant::now(), self.leeway) {
                return Ok(token.value.clone());
            }
            debug!("Access token for client {} expired", self.credentials.client_id);
        }

        let token = self.fetch().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch(&self) -> Result<AccessToken> {
        let endpoint = self.credentials.token_endpoint();
        let span = debug_span!("broker.token.fetch", token.endpoint = %endpoint);

        async move {
            let requested_at = Instant::now();
            let response = self
                .http
                .post(&endpoint)
                .basic_auth(
                    &self.credentials.client_id,
                    Some(self.credentials.client_secret.as_str()),
                )
                .form(&[("grant_type", "client_credentials")])
                .send()
                .await?;

            let status = response.status();
            let body = response.bytes().await?;
            if !status.is_success() {
                return Err(token_failure(&endpoint, status, &body));
            }

            let parsed: TokenResponse = serde_json::from_slice(&body)
                .map_err(|e| BridgeError::decode("token response", e))?;

            metrics::increment_token_refreshes();
            info!(
                "Obtained access token for client {}",
                self.credentials.client_id
            );

            Ok(AccessToken {
                value: Zeroizing::new(parsed.access_token),
                expires_at: parsed
                    .expires_in
                    .map(|secs| requested_at + Duration::from_secs(secs)),
            })
        }
        .instrument(span)
        .await
    }
}
