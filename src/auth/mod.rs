//! # Auth Manager
//!
//! Resolves a named credential secret into a [`BrokerSession`]: the broker URL,
//! a pooled HTTP transport, and an auto-refreshing bearer token source for one
//! tenant.
//!
//! Sessions are immutable. Talking to another tenant means resolving another
//! session and building a new client from it; nothing is swapped in place.

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::Secret;
use reqwest::Client;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::cluster::ObjectProvider;
use crate::config::{BridgeConfig, HttpClientConfig};
use crate::error::Result;

pub mod credentials;
pub mod token;

pub use credentials::BrokerCredentials;
pub use token::TokenSource;

/// Build the pooled transport shared by token and broker calls
///
/// # Errors
/// Returns `Transport` if the TLS backend cannot be initialized
pub fn build_http_client(config: &HttpClientConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .tcp_keepalive(config.tcp_keepalive())
        .pool_idle_timeout(config.pool_idle_timeout())
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .build()?)
}

/// Resolved, immutable connection context for one broker tenant
#[derive(Clone)]
pub struct BrokerSession {
    broker_url: String,
    http: Client,
    tokens: Arc<TokenSource>,
}

impl std::fmt::Debug for BrokerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerSession")
            .field("broker_url", &self.broker_url)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl BrokerSession {
    /// Build a session directly from tenant credentials
    ///
    /// # Errors
    /// Returns `Transport` if the HTTP client cannot be built
    pub fn new(
        credentials: BrokerCredentials,
        http_config: &HttpClientConfig,
        token_expiry_leeway: Duration,
    ) -> Result<Self> {
        let http = build_http_client(http_config)?;
        let broker_url = credentials.broker_url.clone();
        let tokens = Arc::new(TokenSource::new(
            http.clone(),
            credentials,
            token_expiry_leeway,
        ));
        Ok(Self {
            broker_url,
            http,
            tokens,
        })
    }

    #[must_use]
    pub fn broker_url(&self) -> &str {
        &self.broker_url
    }

    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Current bearer token, refreshed transparently when expired
    ///
    /// # Errors
    /// Propagates token exchange failures
    pub async fn bearer_token(&self) -> Result<Zeroizing<String>> {
        self.tokens.access_token().await
    }
}

pub struct AuthManager {
    secrets: Arc<dyn ObjectProvider<Secret>>,
    http: HttpClientConfig,
    token_expiry_leeway: Duration,
    default_secret_name: String,
    default_secret_namespace: String,
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("http", &self.http)
            .field("token_expiry_leeway", &self.token_expiry_leeway)
            .field("default_secret_name", &self.default_secret_name)
            .field("default_secret_namespace", &self.default_secret_namespace)
            .finish_non_exhaustive()
    }
}

impl AuthManager {
    #[must_use]
    pub fn new(secrets: Arc<dyn ObjectProvider<Secret>>, config: &BridgeConfig) -> Self {
        Self {
            secrets,
            http: config.http,
            token_expiry_leeway: config.token_expiry_leeway(),
            default_secret_name: config.sm_secret_name.clone(),
            default_secret_namespace: config.sm_secret_namespace.clone(),
        }
    }

    /// Resolve the tenant described by an explicitly requested credential secret
    ///
    /// # Errors
    /// Returns `NotFound` if the secret is absent, `Auth` if it is malformed,
    /// and `Kube` for any other API failure
    pub async fn resolve(&self, secret_name: &str, secret_namespace: &str) -> Result<BrokerSession> {
        let secret = self.secrets.get(secret_name, secret_namespace).await?;
        let credentials = BrokerCredentials::from_secret(&secret)?;
        info!(
            "Resolved broker tenant {} from secret {}/{}",
            credentials.broker_url, secret_namespace, secret_name
        );
        BrokerSession::new(credentials, &self.http, self.token_expiry_leeway)
    }

    /// Resolve the default tenant configured at startup
    ///
    /// An absent default secret is not fatal: the bridge stays usable and
    /// `None` is returned so callers can resolve a tenant explicitly later.
    ///
    /// # Errors
    /// Any failure other than the secret being absent
    pub async fn resolve_default(&self) -> Result<Option<BrokerSession>> {
        match self
            .resolve(&self.default_secret_name, &self.default_secret_namespace)
            .await
        {
            Ok(session) => Ok(Some(session)),
            Err(e) if e.is_not_found() => {
                warn!(
                    "Default credential secret {}/{} not found; broker calls need an explicit tenant",
                    self.default_secret_namespace, self.default_secret_name
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
