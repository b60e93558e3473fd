//! # Errors
//!
//! Error taxonomy shared by the broker client, the credential store and the
//! binding orchestrator. Every variant carries enough detail to be rendered
//! to a caller without further lookups.

use thiserror::Error;

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Network, DNS or timeout failure before a broker response was received
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Decoded broker failure body
    #[error("broker returned {status}: {message}")]
    Broker { status: u16, message: String },

    /// Local precondition failed; nothing was sent over the wire
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{kind} \"{name}\" in \"{namespace}\" namespace not found")]
    NotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    #[error("secret \"{name}\" in \"{namespace}\" namespace already exists")]
    Conflict { name: String, namespace: String },

    /// Malformed success or error body
    #[error("failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Token exchange rejected or unusable tenant credentials
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl BridgeError {
    pub(crate) fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn not_found(kind: impl Into<String>, name: &str, namespace: &str) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    pub(crate) fn conflict(name: &str, namespace: &str) -> Self {
        Self::Conflict {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    /// HTTP status a routing layer should answer with for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Broker { status, .. } => *status,
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Kube(kube::Error::Api(api_err)) => api_err.code,
            Self::Transport(_) | Self::Decode { .. } | Self::Kube(_) | Self::Auth(_) => 500,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
