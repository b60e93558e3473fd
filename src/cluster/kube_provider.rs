//! API-server backed [`ObjectProvider`].
//!
//! The API server rejects a create on an occupied name with 409, so `create`
//! is atomic create-if-absent here without any client-side locking.

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{Api, DeleteParams, ListParams, PostParams},
    Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::labels::{to_selector, LabelSet};
use super::ObjectProvider;
use crate::error::{BridgeError, Result};

pub struct KubeObjectProvider<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeObjectProvider<K> {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> Debug for KubeObjectProvider<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeObjectProvider")
            .field("kind", &std::any::type_name::<K>())
            .finish_non_exhaustive()
    }
}

fn kind_of<K: Resource<DynamicType = ()>>() -> String {
    K::kind(&()).to_lowercase()
}

#[async_trait]
impl<K> ObjectProvider<K> for KubeObjectProvider<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Serialize
        + Debug
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, name: &str, namespace: &str) -> Result<K> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(object) => Ok(object),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
                Err(BridgeError::not_found(kind_of::<K>(), name, namespace))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, namespace: &str) -> Result<Vec<K>> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn list_by_labels(&self, labels: &LabelSet) -> Result<Vec<K>> {
        let api: Api<K> = Api::all(self.client.clone());
        let selector = to_selector(labels);
        debug!("Listing {} objects with selector {}", kind_of::<K>(), selector);
        Ok(api
            .list(&ListParams::default().labels(&selector))
            .await?
            .items)
    }

    async fn create(&self, object: &K) -> Result<K> {
        let name = object.name_any();
        let namespace = object.namespace().ok_or_else(|| {
            BridgeError::Validation(format!("{} \"{name}\" has no namespace", kind_of::<K>()))
        })?;

        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        match api.create(&PostParams::default(), object).await {
            Ok(created) => Ok(created),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
                Err(BridgeError::conflict(&name, &namespace))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, name: &str, namespace: &str) -> Result<()> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
                Err(BridgeError::not_found(kind_of::<K>(), name, namespace))
            }
            Err(e) => Err(e.into()),
        }
    }
}
