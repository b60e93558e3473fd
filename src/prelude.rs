//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use service_manager_bridge::prelude::*;
//! ```

// Tenant resolution
pub use crate::auth::{AuthManager, BrokerCredentials, BrokerSession};

// Broker protocol
pub use crate::broker::{
    BrokerClient, Collection, ServiceBinding, ServiceBroker, ServiceInstance,
    ServiceInstanceUpdateRequest, ServiceOffering, ServiceOfferingDetails, ServicePlan,
    WriteOutcome,
};

// Cluster objects and binding secrets
pub use crate::cluster::{
    CredentialStore, InMemoryProvider, KubeObjectProvider, LabelSet, ObjectProvider, SecretTarget,
};

// Orchestration
pub use crate::bindings::{BindingManager, CreateBindingRequest};

pub use crate::config::{BridgeConfig, HttpClientConfig};
pub use crate::error::{BridgeError, Result};
