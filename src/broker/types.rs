//! Broker resource shapes.
//!
//! Collections arrive as `{"num_items": n, "items": [...]}`. Unknown fields
//! are ignored so that newer broker versions keep decoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Label values are sets on the broker side
pub type BrokerLabels = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection<T> {
    #[serde(default)]
    pub num_items: usize,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            num_items: 0,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub bindable: bool,
    #[serde(default)]
    pub catalog_id: String,
    #[serde(default)]
    pub catalog_name: String,
    #[serde(default)]
    pub broker_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePlan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub catalog_id: String,
    #[serde(default)]
    pub catalog_name: String,
    #[serde(default)]
    pub free: bool,
    #[serde(default)]
    pub bindable: bool,
    pub service_offering_id: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// An offering together with the plans that reference it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOfferingDetails {
    #[serde(flatten)]
    pub offering: ServiceOffering,
    pub plans: Vec<ServicePlan>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub service_plan_id: String,
    /// Only filled by the instance-with-plan-name fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_plan_name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subaccount_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BrokerLabels,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub parameters: Value,
}

/// Partial instance update
///
/// The instance ID travels in the URL path only and is never serialized.
/// When `shared` is set no other field may be.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceInstanceUpdateRequest {
    #[serde(skip)]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BrokerLabels>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
}

impl ServiceInstanceUpdateRequest {
    /// Names of the fields set alongside `shared`, empty when the request is valid
    #[must_use]
    pub fn fields_conflicting_with_shared(&self) -> Vec<&'static str> {
        if self.shared.is_none() {
            return Vec::new();
        }
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.service_plan_id.is_some() {
            fields.push("service_plan_id");
        }
        if self.parameters.is_some() {
            fields.push("parameters");
        }
        if self.labels.as_ref().is_some_and(|labels| !labels.is_empty()) {
            fields.push("labels");
        }
        fields
    }
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceBinding {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub service_instance_id: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub parameters: Value,
    /// Broker-issued secret material
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub credentials: Value,
    /// Where the credentials were materialized, if anywhere
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_namespace: Option<String>,
}

impl std::fmt::Debug for ServiceBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBinding")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("service_instance_id", &self.service_instance_id)
            .field("parameters", &self.parameters)
            .field(
                "credentials",
                &if self.credentials.is_null() {
                    "<none>"
                } else {
                    "<redacted>"
                },
            )
            .field("secret_name", &self.secret_name)
            .field("secret_namespace", &self.secret_namespace)
            .finish()
    }
}

/// Broker failure body
///
/// At least one of `error` and `description` must be present; any other JSON
/// object fails to decode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "RawErrorResponse")]
pub struct ErrorResponse {
    pub error: String,
    pub description: String,
}

#[derive(Deserialize)]
struct RawErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    description: String,
}

impl TryFrom<RawErrorResponse> for ErrorResponse {
    type Error = &'static str;

    fn try_from(raw: RawErrorResponse) -> Result<Self, Self::Error> {
        if raw.error.is_empty() && raw.description.is_empty() {
            return Err("error body carries neither `error` nor `description`");
        }
        Ok(Self {
            error: raw.error,
            description: raw.description,
        })
    }
}

impl ErrorResponse {
    /// `error` and `description` joined into one message
    #[must_use]
    pub fn message(&self) -> String {
        match (self.error.is_empty(), self.description.is_empty()) {
            (false, false) => format!("{}: {}", self.error, self.description),
            (false, true) => self.error.clone(),
            (true, false) => self.description.clone(),
            (true, true) => "no error details provided".to_string(),
        }
    }
}

/// Result of a broker write
///
/// `Accepted` means the broker queued the operation and no final resource is
/// available yet. Resolving it later is up to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<T> {
    Completed(T),
    Accepted,
}

impl<T> WriteOutcome<T> {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// The final resource, if the broker returned one
    pub fn into_completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Accepted => None,
        }
    }
}
