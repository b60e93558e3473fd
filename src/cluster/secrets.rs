//! # Credential Store
//!
//! Binding credentials persisted as uniquely-owned, label-indexed Kubernetes
//! secrets.
//!
//! Secrets belonging to a binding are only ever found through their identity
//! labels, never by name: the caller may have chosen any name and namespace.
//!
//! ## Conflict detection
//!
//! `create` first looks the target up so that an occupied `(name, namespace)`
//! is reported before any write, then relies on the provider's atomic
//! create-if-absent. A concurrent creator winning the race between the two
//! steps is still rejected by the provider with the same `Conflict`.
//!
//! A binding owns at most one managed secret per namespace. Creating a
//! second one under a different name in the same namespace is a `Conflict`
//! naming the secret that already holds the binding's credentials.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::labels::{self, LabelSet, SERVICE_BINDING_ID_LABEL};
use super::ObjectProvider;
use crate::error::{BridgeError, Result};
use crate::observability::metrics;

/// Where a binding's credentials are written
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretTarget {
    pub name: String,
    pub namespace: String,
}

impl SecretTarget {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    fn of(secret: &Secret) -> Result<Self> {
        let name = secret
            .metadata
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BridgeError::Validation("secret name must be set".to_string()))?;
        let namespace = secret
            .metadata
            .namespace
            .clone()
            .filter(|namespace| !namespace.is_empty())
            .ok_or_else(|| {
                BridgeError::Validation(format!("secret \"{name}\" has no namespace"))
            })?;
        Ok(Self { name, namespace })
    }
}

#[derive(Clone)]
pub struct CredentialStore {
    provider: Arc<dyn ObjectProvider<Secret>>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

impl CredentialStore {
    #[must_use]
    pub fn new(provider: Arc<dyn ObjectProvider<Secret>>) -> Self {
        Self { provider }
    }

    /// Create a secret, failing with `Conflict` if its target is occupied
    ///
    /// A secret labeled with a binding ID also conflicts with any managed
    /// secret of that binding already present in the same namespace. The
    /// existing object is never modified, whatever labels it carries.
    pub async fn create(&self, secret: &Secret) -> Result<Secret> {
        let target = SecretTarget::of(secret)?;

        if let Some(binding_id) = secret.labels().get(SERVICE_BINDING_ID_LABEL) {
            let owned = self
                .owned_in_namespace(binding_id, &target.namespace)
                .await?;
            if let Some(existing) = owned {
                return Err(self.conflict(&existing));
            }
        }

        match self.provider.get(&target.name, &target.namespace).await {
            Ok(_) => return Err(self.conflict(&target)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        match self.provider.create(secret).await {
            Ok(created) => {
                metrics::increment_managed_secrets_created();
                info!(
                    "Created secret {} in namespace {}",
                    target.name, target.namespace
                );
                Ok(created)
            }
            Err(e) if e.is_conflict() => Err(self.conflict(&target)),
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, name: &str, namespace: &str) -> Result<Secret> {
        self.provider.get(name, namespace).await
    }

    /// All secrets, in any namespace, carrying every label in `labels`
    pub async fn get_all_by_labels(&self, labels: &LabelSet) -> Result<Vec<Secret>> {
        self.provider.list_by_labels(labels).await
    }

    pub async fn delete(&self, secret: &Secret) -> Result<()> {
        let target = SecretTarget::of(secret)?;
        self.provider.delete(&target.name, &target.namespace).await?;
        info!(
            "Deleted secret {} in namespace {}",
            target.name, target.namespace
        );
        Ok(())
    }

    /// Delete every managed secret carrying the binding's identity label
    ///
    /// Returns how many secrets were removed. Finding none is success, and a
    /// secret that disappears between the lookup and the delete is skipped.
    pub async fn delete_for_binding(&self, binding_id: &str) -> Result<usize> {
        let secrets = self
            .get_all_by_labels(&labels::for_binding(binding_id))
            .await?;

        let mut deleted = 0;
        for secret in &secrets {
            match self.delete(secret).await {
                Ok(()) => deleted += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        metrics::increment_managed_secrets_deleted(deleted);
        Ok(deleted)
    }

    /// Map of binding ID to the target of its managed secret
    ///
    /// If a binding somehow owns several secrets, the first in listing order wins.
    pub async fn targets_by_binding(&self) -> Result<HashMap<String, SecretTarget>> {
        let secrets = self.get_all_by_labels(&labels::ownership()).await?;
        let mut targets = HashMap::new();
        for secret in &secrets {
            let Some(binding_id) = secret.labels().get(SERVICE_BINDING_ID_LABEL) else {
                continue;
            };
            let Ok(target) = SecretTarget::of(secret) else {
                continue;
            };
            targets.entry(binding_id.clone()).or_insert(target);
        }
        Ok(targets)
    }

    /// Target of the managed secret `binding_id` already owns in `namespace`
    async fn owned_in_namespace(
        &self,
        binding_id: &str,
        namespace: &str,
    ) -> Result<Option<SecretTarget>> {
        let owned = self
            .get_all_by_labels(&labels::for_binding(binding_id))
            .await?;
        Ok(owned
            .iter()
            .filter_map(|secret| SecretTarget::of(secret).ok())
            .find(|target| target.namespace == namespace))
    }

    fn conflict(&self, target: &SecretTarget) -> BridgeError {
        metrics::increment_secret_conflicts();
        warn!(
            "Secret {} already exists in namespace {}",
            target.name, target.namespace
        );
        BridgeError::conflict(&target.name, &target.namespace)
    }
}

/// Build the managed secret holding a binding's credentials
///
/// # Errors
/// Returns a `Decode` error when `credentials` is neither an object nor null
pub fn managed_secret(
    target: &SecretTarget,
    binding_id: &str,
    instance_id: &str,
    credentials: &Value,
) -> Result<Secret> {
    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(target.name.clone()),
            namespace: Some(target.namespace.clone()),
            labels: Some(labels::managed_secret(binding_id, instance_id)),
            ..ObjectMeta::default()
        },
        data: Some(credentials_to_data(credentials)?),
        type_: Some("Opaque".to_string()),
        ..Secret::default()
    })
}

/// Flatten broker-issued credentials into secret data entries
///
/// String values are stored verbatim; any other value is stored as its
/// compact JSON text so that nested objects survive the round trip.
pub fn credentials_to_data(credentials: &Value) -> Result<BTreeMap<String, ByteString>> {
    if credentials.is_null() {
        return Ok(BTreeMap::new());
    }

    let fields: Map<String, Value> = serde_json::from_value(credentials.clone())
        .map_err(|e| BridgeError::decode("binding credentials", e))?;

    Ok(fields
        .into_iter()
        .map(|(key, value)| {
            let bytes = match value {
                Value::String(text) => text.into_bytes(),
                other => other.to_string().into_bytes(),
            };
            (key, ByteString(bytes))
        })
        .collect())
}
