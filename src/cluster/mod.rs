//! # Cluster Objects
//!
//! Uniform access to namespaced Kubernetes objects, and the binding-secret
//! store built on top of it.
//!
//! - [`ObjectProvider`]: get/list/create/delete, generic over object kind
//! - [`KubeObjectProvider`]: API-server backed implementation
//! - [`InMemoryProvider`]: process-local implementation for tests and dry runs
//! - [`CredentialStore`]: managed binding secrets with ownership labels and conflict detection

use async_trait::async_trait;

use crate::error::Result;

pub mod kube_provider;
pub mod labels;
pub mod memory;
pub mod secrets;

pub use kube_provider::KubeObjectProvider;
pub use labels::LabelSet;
pub use memory::InMemoryProvider;
pub use secrets::{CredentialStore, SecretTarget};

/// Namespaced object storage, implemented once per backend
///
/// `create` must be create-if-absent: when an object already occupies the
/// target `(name, namespace)` it fails with [`crate::BridgeError::Conflict`]
/// and leaves the existing object untouched.
#[async_trait]
pub trait ObjectProvider<K>: Send + Sync {
    /// Fetch one object, failing with `NotFound` if absent
    async fn get(&self, name: &str, namespace: &str) -> Result<K>;

    /// All objects in one namespace
    async fn list(&self, namespace: &str) -> Result<Vec<K>>;

    /// Objects in any namespace whose labels contain every key/value in `labels`
    async fn list_by_labels(&self, labels: &LabelSet) -> Result<Vec<K>>;

    /// Atomically create the object at its metadata name and namespace
    async fn create(&self, object: &K) -> Result<K>;

    /// Delete one object, failing with `NotFound` if absent
    async fn delete(&self, name: &str, namespace: &str) -> Result<()>;
}
