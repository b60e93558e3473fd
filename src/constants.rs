//! # Constants
//!
//! Shared constants used throughout the bridge.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default tenant credential secret resolved at startup
pub const DEFAULT_SM_SECRET_NAME: &str = "sap-btp-service-operator";

/// Namespace of the default tenant credential secret
pub const DEFAULT_SM_SECRET_NAMESPACE: &str = "kyma-system";

/// Namespace used for binding secrets when the caller does not name one
pub const DEFAULT_BINDING_SECRET_NAMESPACE: &str = "default";

/// Suffix appended to the binding ID when the caller does not name a secret
pub const GENERATED_SECRET_NAME_SUFFIX: &str = "-secret";

/// Default per-request budget for broker calls (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default dial timeout for broker connections (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default TCP keep-alive interval for broker connections (seconds)
pub const DEFAULT_TCP_KEEPALIVE_SECS: u64 = 30;

/// Default idle-connection reuse window (seconds)
pub const DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Default upper bound on idle connections kept per broker host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 100;

/// Tokens are refreshed this many seconds before the broker-declared expiry
pub const DEFAULT_TOKEN_EXPIRY_LEEWAY_SECS: u64 = 30;

// Broker REST surface
pub const SERVICE_OFFERINGS_PATH: &str = "/v1/service_offerings";
pub const SERVICE_PLANS_PATH: &str = "/v1/service_plans";
pub const SERVICE_INSTANCES_PATH: &str = "/v1/service_instances";
pub const SERVICE_BINDINGS_PATH: &str = "/v1/service_bindings";
pub const PARAMETERS_PATH_SEGMENT: &str = "parameters";

/// Query key for the broker's field filter language
pub const FIELD_QUERY_KEY: &str = "fieldQuery";

// Keys of the tenant credential secret
pub const CLIENT_ID_KEY: &str = "clientid";
pub const CLIENT_SECRET_KEY: &str = "clientsecret";
pub const SM_URL_KEY: &str = "sm_url";
pub const TOKEN_URL_KEY: &str = "tokenurl";
pub const TOKEN_URL_SUFFIX_KEY: &str = "tokenurlsuffix";
