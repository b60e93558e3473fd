//! # Bridge Configuration
//!
//! Process-level settings loaded from environment variables.

use std::time::Duration;

use crate::constants::{
    DEFAULT_BINDING_SECRET_NAMESPACE, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_POOL_IDLE_TIMEOUT_SECS,
    DEFAULT_POOL_MAX_IDLE_PER_HOST, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SM_SECRET_NAME,
    DEFAULT_SM_SECRET_NAMESPACE, DEFAULT_TCP_KEEPALIVE_SECS, DEFAULT_TOKEN_EXPIRY_LEEWAY_SECS,
};

/// Bridge configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Name of the tenant credential secret resolved at startup
    pub sm_secret_name: String,
    /// Namespace of the tenant credential secret
    pub sm_secret_namespace: String,
    /// Namespace for binding secrets whose target namespace was not given
    pub default_binding_secret_namespace: String,
    /// Transport tuning for broker and token endpoints
    pub http: HttpClientConfig,
    /// Refresh access tokens this long before they expire (seconds)
    pub token_expiry_leeway_secs: u64,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Record prometheus metrics
    pub enable_metrics: bool,
}

/// Connection and timeout settings shared by every broker transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpClientConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub tcp_keepalive_secs: u64,
    pub pool_idle_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            tcp_keepalive_secs: DEFAULT_TCP_KEEPALIVE_SECS,
            pool_idle_timeout_secs: DEFAULT_POOL_IDLE_TIMEOUT_SECS,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
        }
    }
}

impl HttpClientConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            request_timeout_secs: env_var_or_default(
                "BROKER_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            connect_timeout_secs: env_var_or_default(
                "BROKER_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            ),
            tcp_keepalive_secs: env_var_or_default(
                "BROKER_TCP_KEEPALIVE_SECS",
                DEFAULT_TCP_KEEPALIVE_SECS,
            ),
            pool_idle_timeout_secs: env_var_or_default(
                "BROKER_POOL_IDLE_TIMEOUT_SECS",
                DEFAULT_POOL_IDLE_TIMEOUT_SECS,
            ),
            pool_max_idle_per_host: env_var_or_default(
                "BROKER_POOL_MAX_IDLE_PER_HOST",
                DEFAULT_POOL_MAX_IDLE_PER_HOST,
            ),
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn tcp_keepalive(&self) -> Duration {
        Duration::from_secs(self.tcp_keepalive_secs)
    }

    #[must_use]
    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sm_secret_name: DEFAULT_SM_SECRET_NAME.to_string(),
            sm_secret_namespace: DEFAULT_SM_SECRET_NAMESPACE.to_string(),
            default_binding_secret_namespace: DEFAULT_BINDING_SECRET_NAMESPACE.to_string(),
            http: HttpClientConfig::default(),
            token_expiry_leeway_secs: DEFAULT_TOKEN_EXPIRY_LEEWAY_SECS,
            log_level: "INFO".to_string(),
            log_format: "text".to_string(),
            enable_metrics: true,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            sm_secret_name: env_var_or_default_str("SM_SECRET_NAME", DEFAULT_SM_SECRET_NAME),
            sm_secret_namespace: env_var_or_default_str(
                "SM_SECRET_NAMESPACE",
                DEFAULT_SM_SECRET_NAMESPACE,
            ),
            default_binding_secret_namespace: env_var_or_default_str(
                "DEFAULT_BINDING_SECRET_NAMESPACE",
                DEFAULT_BINDING_SECRET_NAMESPACE,
            ),
            http: HttpClientConfig::from_env(),
            token_expiry_leeway_secs: env_var_or_default(
                "TOKEN_EXPIRY_LEEWAY_SECS",
                DEFAULT_TOKEN_EXPIRY_LEEWAY_SECS,
            ),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "text"),
            enable_metrics: env_var_or_default_bool("ENABLE_METRICS", true),
        }
    }

    #[must_use]
    pub fn token_expiry_leeway(&self) -> Duration {
        Duration::from_secs(self.token_expiry_leeway_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key).ok().map_or(default, |v| parse_bool(&v))
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
