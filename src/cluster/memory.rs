//! Process-local [`ObjectProvider`] keyed by `(namespace, name)`.
//!
//! The existence check and the insert happen under one lock, so `create`
//! is create-if-absent against concurrent callers.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use kube::{Resource, ResourceExt};

use super::labels::{matches, LabelSet};
use super::ObjectProvider;
use crate::error::{BridgeError, Result};

type ObjectKey = (String, String);

#[derive(Debug)]
pub struct InMemoryProvider<K> {
    objects: Mutex<BTreeMap<ObjectKey, K>>,
}

impl<K> Default for InMemoryProvider<K> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<K> InMemoryProvider<K>
where
    K: Resource<DynamicType = ()> + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all namespaces
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every stored object
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ObjectKey, K>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn kind() -> String {
        K::kind(&()).to_lowercase()
    }
}

#[async_trait]
impl<K> ObjectProvider<K> for InMemoryProvider<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    async fn get(&self, name: &str, namespace: &str) -> Result<K> {
        self.lock()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| BridgeError::not_found(Self::kind(), name, namespace))
    }

    async fn list(&self, namespace: &str) -> Result<Vec<K>> {
        Ok(self
            .lock()
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn list_by_labels(&self, labels: &LabelSet) -> Result<Vec<K>> {
        Ok(self
            .lock()
            .values()
            .filter(|object| matches(object.meta().labels.as_ref(), labels))
            .cloned()
            .collect())
    }

    async fn create(&self, object: &K) -> Result<K> {
        let name = object.name_any();
        let namespace = object.namespace().ok_or_else(|| {
            BridgeError::Validation(format!("{} \"{name}\" has no namespace", Self::kind()))
        })?;

        let mut objects = self.lock();
        let key = (namespace.clone(), name.clone());
        if objects.contains_key(&key) {
            return Err(BridgeError::conflict(&name, &namespace));
        }

        let mut stored = object.clone();
        let meta = stored.meta_mut();
        meta.uid = Some(uuid::Uuid::new_v4().to_string());
        meta.resource_version = Some("1".to_string());
        objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, name: &str, namespace: &str) -> Result<()> {
        self.lock()
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| BridgeError::not_found(Self::kind(), name, namespace))
    }
}
