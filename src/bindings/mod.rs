//! # Binding Lifecycle
//!
//! Coordinates the broker and the credential store for binding creation,
//! credential restore and deletion.
//!
//! ## Ordering
//!
//! - **Create**: broker first. A broker-accepted (202) binding has no
//!   credentials yet, so no secret is written. A secret conflict after a
//!   successful broker create is surfaced as-is; the broker binding stays.
//! - **Restore**: credentials are fetched from the broker again and written
//!   to the requested target under the same conflict rules as create.
//! - **Delete**: broker first, secrets only after the broker succeeded. A
//!   failed broker delete leaves every secret in place.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, info_span, warn, Instrument};

use crate::broker::{ServiceBinding, ServiceBroker, WriteOutcome};
use crate::cluster::secrets::managed_secret;
use crate::cluster::{CredentialStore, SecretTarget};
use crate::constants::GENERATED_SECRET_NAME_SUFFIX;
use crate::error::Result;

/// Caller input for a new binding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateBindingRequest {
    pub name: String,
    pub service_instance_id: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub parameters: Value,
    /// Secret to write the credentials to; generated from the binding ID when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_namespace: Option<String>,
}

pub struct BindingManager {
    broker: Arc<dyn ServiceBroker>,
    secrets: CredentialStore,
    default_secret_namespace: String,
}

impl std::fmt::Debug for BindingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingManager")
            .field("secrets", &self.secrets)
            .field("default_secret_namespace", &self.default_secret_namespace)
            .finish_non_exhaustive()
    }
}

impl BindingManager {
    #[must_use]
    pub fn new(
        broker: Arc<dyn ServiceBroker>,
        secrets: CredentialStore,
        default_secret_namespace: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            secrets,
            default_secret_namespace: default_secret_namespace.into(),
        }
    }

    fn secret_target(
        &self,
        binding_id: &str,
        secret_name: Option<&str>,
        secret_namespace: Option<&str>,
    ) -> SecretTarget {
        secret_target(
            binding_id,
            secret_name,
            secret_namespace,
            &self.default_secret_namespace,
        )
    }

    /// Create a binding and materialize its credentials
    ///
    /// Returns `Accepted` when the broker queued the binding; nothing is
    /// written to the cluster in that case.
    ///
    /// # Errors
    /// Broker failures are returned unchanged. `Conflict` means the broker
    /// binding exists but its secret target was occupied.
    pub async fn create_binding(
        &self,
        request: &CreateBindingRequest,
    ) -> Result<WriteOutcome<ServiceBinding>> {
        let span = info_span!(
            "binding.create",
            binding.name = %request.name,
            service_instance.id = %request.service_instance_id
        );

        async move {
            let outgoing = ServiceBinding {
                name: request.name.clone(),
                service_instance_id: request.service_instance_id.clone(),
                parameters: request.parameters.clone(),
                ..ServiceBinding::default()
            };

            let mut binding = match self.broker.create_service_binding(&outgoing).await? {
                WriteOutcome::Completed(binding) => binding,
                WriteOutcome::Accepted => {
                    info!(
                        "Binding {} accepted by broker, credentials not yet available",
                        request.name
                    );
                    return Ok(WriteOutcome::Accepted);
                }
            };
            info!("Created binding {} with ID {}", binding.name, binding.id);

            if binding.service_instance_id.is_empty() {
                binding
                    .service_instance_id
                    .clone_from(&request.service_instance_id);
            }
            let target = self.secret_target(
                &binding.id,
                request.secret_name.as_deref(),
                request.secret_namespace.as_deref(),
            );

            if let Err(e) = self.materialize(&binding, &target).await {
                warn!(
                    "Binding {} was created by the broker but its secret was not written: {}",
                    binding.id, e
                );
                return Err(e);
            }

            binding.secret_name = Some(target.name);
            binding.secret_namespace = Some(target.namespace);
            Ok(WriteOutcome::Completed(binding))
        }
        .instrument(span)
        .await
    }

    /// Re-create the secret of an existing binding from broker-held credentials
    ///
    /// # Errors
    /// `Conflict` if the target is occupied; broker failures unchanged
    pub async fn restore_binding_secret(
        &self,
        binding_id: &str,
        secret_name: Option<&str>,
        secret_namespace: Option<&str>,
    ) -> Result<ServiceBinding> {
        let span = info_span!("binding.restore", binding.id = %binding_id);

        async move {
            let mut binding = self.broker.service_binding(binding_id).await?;
            let target = self.secret_target(binding_id, secret_name, secret_namespace);

            self.materialize(&binding, &target).await?;
            info!(
                "Restored secret {} in namespace {} for binding {}",
                target.name, target.namespace, binding_id
            );

            binding.secret_name = Some(target.name);
            binding.secret_namespace = Some(target.namespace);
            Ok(binding)
        }
        .instrument(span)
        .await
    }

    /// Delete a binding at the broker, then every secret labeled with it
    ///
    /// Secrets are removed for accepted deletions too: the broker has taken
    /// ownership of tearing the binding down.
    ///
    /// # Errors
    /// Broker failures are returned unchanged and leave all secrets in place.
    /// A cluster failure after the broker delete is logged together with the
    /// fact that the broker binding is already gone, then returned as-is.
    pub async fn delete_binding(&self, binding_id: &str) -> Result<WriteOutcome<()>> {
        let span = info_span!("binding.delete", binding.id = %binding_id);

        async move {
            let outcome = self.broker.delete_service_binding(binding_id).await?;
            let deleted = match self.secrets.delete_for_binding(binding_id).await {
                Ok(deleted) => deleted,
                Err(e) => {
                    warn!(
                        "Binding {} was deleted by the broker but its managed secrets remain: {}",
                        binding_id, e
                    );
                    return Err(e);
                }
            };
            info!(
                "Deleted binding {} and {} managed secret(s)",
                binding_id, deleted
            );
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Bindings, optionally of one instance, with the targets of their managed secrets
    ///
    /// # Errors
    /// Broker or cluster lookup failures
    pub async fn bindings_with_secrets(
        &self,
        instance_id: Option<&str>,
    ) -> Result<Vec<ServiceBinding>> {
        let (bindings, targets) = futures::try_join!(
            self.broker.service_bindings_for(instance_id),
            self.secrets.targets_by_binding()
        )?;

        Ok(bindings
            .items
            .into_iter()
            .map(|mut binding| {
                if let Some(target) = targets.get(&binding.id) {
                    binding.secret_name = Some(target.name.clone());
                    binding.secret_namespace = Some(target.namespace.clone());
                }
                binding
            })
            .collect())
    }

    /// One binding with the target of its managed secret, if any
    ///
    /// # Errors
    /// Broker or cluster lookup failures
    pub async fn binding_with_secret(&self, binding_id: &str) -> Result<ServiceBinding> {
        let (mut binding, targets) = futures::try_join!(
            self.broker.service_binding(binding_id),
            self.secrets.targets_by_binding()
        )?;
        if let Some(target) = targets.get(&binding.id) {
            binding.secret_name = Some(target.name.clone());
            binding.secret_namespace = Some(target.namespace.clone());
        }
        Ok(binding)
    }

    async fn materialize(&self, binding: &ServiceBinding, target: &SecretTarget) -> Result<()> {
        let secret = managed_secret(
            target,
            &binding.id,
            &binding.service_instance_id,
            &binding.credentials,
        )?;
        self.secrets.create(&secret).await?;
        Ok(())
    }
}

/// Secret target for a binding, generated where the caller left it open
///
/// An absent or empty name becomes `<binding-id>-secret`; an absent or empty
/// namespace becomes `default_namespace`.
#[must_use]
pub fn secret_target(
    binding_id: &str,
    secret_name: Option<&str>,
    secret_namespace: Option<&str>,
    default_namespace: &str,
) -> SecretTarget {
    let name = secret_name
        .filter(|name| !name.is_empty())
        .map_or_else(
            || format!("{binding_id}{GENERATED_SECRET_NAME_SUFFIX}"),
            str::to_string,
        );
    let namespace = secret_namespace
        .filter(|namespace| !namespace.is_empty())
        .unwrap_or(default_namespace);
    SecretTarget::new(name, namespace)
}
