//! # Binding Commands
//!
//! Binding lifecycle commands backed by the binding orchestrator.
//!
//! Credentials are stripped from everything printed; they only live in the
//! managed secrets.

use anyhow::{Context, Result};
use serde_json::Value;
use service_manager_bridge::bindings::{BindingManager, CreateBindingRequest};
use service_manager_bridge::broker::{ServiceBinding, WriteOutcome};

use super::{print_json, print_outcome};

fn without_credentials(mut binding: ServiceBinding) -> ServiceBinding {
    binding.credentials = Value::Null;
    binding
}

pub async fn list_command(bindings: &BindingManager, instance_id: Option<&str>) -> Result<()> {
    let listed = bindings
        .bindings_with_secrets(instance_id)
        .await
        .context("Failed to list service bindings")?;
    let listed: Vec<ServiceBinding> = listed.into_iter().map(without_credentials).collect();
    print_json(&listed)
}

pub async fn create_command(
    bindings: &BindingManager,
    name: String,
    service_instance_id: String,
    parameters: Option<&str>,
    secret_name: Option<String>,
    secret_namespace: Option<String>,
) -> Result<()> {
    let parameters = parameters
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--parameters must be a JSON object")?
        .unwrap_or(Value::Null);

    let request = CreateBindingRequest {
        name,
        service_instance_id,
        parameters,
        secret_name,
        secret_namespace,
    };

    let outcome = bindings
        .create_binding(&request)
        .await
        .with_context(|| format!("Failed to create service binding {}", request.name))?;
    let outcome = match outcome {
        WriteOutcome::Completed(binding) => WriteOutcome::Completed(without_credentials(binding)),
        WriteOutcome::Accepted => WriteOutcome::Accepted,
    };
    print_outcome(&outcome)
}

pub async fn restore_command(
    bindings: &BindingManager,
    id: &str,
    secret_name: Option<&str>,
    secret_namespace: Option<&str>,
) -> Result<()> {
    let binding = bindings
        .restore_binding_secret(id, secret_name, secret_namespace)
        .await
        .with_context(|| format!("Failed to restore secret of service binding {id}"))?;
    print_json(&without_credentials(binding))
}

pub async fn delete_command(bindings: &BindingManager, id: &str) -> Result<()> {
    let outcome = bindings
        .delete_binding(id)
        .await
        .with_context(|| format!("Failed to delete service binding {id}"))?;
    print_outcome(&outcome)
}
