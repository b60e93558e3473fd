//! Binding lifecycle tests
//!
//! Drive the binding orchestrator against the in-process fake broker and an
//! in-memory secret store.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{FakeBroker, INSTANCE_ID};
use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use serde_json::json;
use service_manager_bridge::bindings::{BindingManager, CreateBindingRequest};
use service_manager_bridge::broker::{ServiceBroker, WriteOutcome};
use service_manager_bridge::cluster::labels::{
    self, MANAGED_BY_LABEL_KEY, OPERATOR_NAME, SERVICE_BINDING_ID_LABEL,
    SERVICE_INSTANCE_ID_LABEL,
};
use service_manager_bridge::cluster::secrets::managed_secret;
use service_manager_bridge::cluster::{
    CredentialStore, InMemoryProvider, LabelSet, ObjectProvider, SecretTarget,
};
use service_manager_bridge::{BridgeError, Result};

struct Fixture {
    broker: Arc<FakeBroker>,
    provider: Arc<InMemoryProvider<Secret>>,
    store: CredentialStore,
    manager: BindingManager,
}

fn fixture() -> Fixture {
    let broker = Arc::new(FakeBroker::new());
    let provider = Arc::new(InMemoryProvider::<Secret>::new());
    let store = CredentialStore::new(Arc::clone(&provider) as Arc<dyn ObjectProvider<Secret>>);
    let manager = BindingManager::new(
        Arc::clone(&broker) as Arc<dyn ServiceBroker>,
        store.clone(),
        "default",
    );
    Fixture {
        broker,
        provider,
        store,
        manager,
    }
}

/// Secret storage that reads normally but refuses every delete
struct UndeletableSecrets {
    inner: InMemoryProvider<Secret>,
}

#[async_trait]
impl ObjectProvider<Secret> for UndeletableSecrets {
    async fn get(&self, name: &str, namespace: &str) -> Result<Secret> {
        self.inner.get(name, namespace).await
    }

    async fn list(&self, namespace: &str) -> Result<Vec<Secret>> {
        self.inner.list(namespace).await
    }

    async fn list_by_labels(&self, labels: &LabelSet) -> Result<Vec<Secret>> {
        self.inner.list_by_labels(labels).await
    }

    async fn create(&self, object: &Secret) -> Result<Secret> {
        self.inner.create(object).await
    }

    async fn delete(&self, _name: &str, _namespace: &str) -> Result<()> {
        Err(BridgeError::Auth(
            "service account may not delete secrets".to_string(),
        ))
    }
}

fn request(name: &str, secret: Option<(&str, &str)>) -> CreateBindingRequest {
    CreateBindingRequest {
        name: name.to_string(),
        service_instance_id: INSTANCE_ID.to_string(),
        parameters: json!({"param1": "value1", "param2": "value2"}),
        secret_name: secret.map(|(name, _)| name.to_string()),
        secret_namespace: secret.map(|(_, namespace)| namespace.to_string()),
    }
}

fn completed<T>(outcome: WriteOutcome<T>) -> T {
    match outcome {
        WriteOutcome::Completed(value) => value,
        WriteOutcome::Accepted => panic!("expected a completed broker operation"),
    }
}

#[tokio::test]
async fn test_create_writes_exactly_one_labeled_secret() {
    let f = fixture();

    let binding = completed(
        f.manager
            .create_binding(&request("sb-test-01", Some(("binding-secret-01", "default"))))
            .await
            .expect("binding creation should succeed"),
    );

    assert_eq!(binding.secret_name.as_deref(), Some("binding-secret-01"));
    assert_eq!(binding.secret_namespace.as_deref(), Some("default"));

    let secrets = f
        .store
        .get_all_by_labels(&labels::managed_secret(&binding.id, INSTANCE_ID))
        .await
        .unwrap();
    assert_eq!(secrets.len(), 1);
    assert_eq!(f.provider.len(), 1);

    let secret = &secrets[0];
    let secret_labels = secret.metadata.labels.as_ref().unwrap();
    assert_eq!(secret_labels[MANAGED_BY_LABEL_KEY], OPERATOR_NAME);
    assert_eq!(secret_labels[SERVICE_BINDING_ID_LABEL], binding.id);
    assert_eq!(secret_labels[SERVICE_INSTANCE_ID_LABEL], INSTANCE_ID);

    let data = secret.data.as_ref().unwrap();
    assert_eq!(data["username"].0, b"user-sb-test-01");
    let uaa: serde_json::Value = serde_json::from_slice(&data["uaa"].0).unwrap();
    assert_eq!(uaa["clientid"], "uaa-client");
}

#[tokio::test]
async fn test_create_without_target_generates_secret_name() {
    let f = fixture();

    let binding = completed(
        f.manager
            .create_binding(&request("sb-test-02", None))
            .await
            .unwrap(),
    );

    let expected = format!("{}-secret", binding.id);
    assert_eq!(binding.secret_name.as_deref(), Some(expected.as_str()));
    assert!(f.store.get(&expected, "default").await.is_ok());
}

#[tokio::test]
async fn test_restore_conflicts_until_binding_is_deleted() {
    let f = fixture();

    let binding = completed(
        f.manager
            .create_binding(&request("b1", Some(("s", "default"))))
            .await
            .unwrap(),
    );
    assert_eq!(f.provider.len(), 1);

    let err = f
        .manager
        .restore_binding_secret(&binding.id, Some("s"), Some("default"))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        err.to_string(),
        "secret \"s\" in \"default\" namespace already exists"
    );

    f.manager.delete_binding(&binding.id).await.unwrap();
    assert!(f.provider.is_empty());

    let restored = f
        .manager
        .restore_binding_secret(&binding.id, Some("s"), Some("default"))
        .await
        .expect("restore should succeed once the target is free");
    assert_eq!(restored.secret_name.as_deref(), Some("s"));

    let secret = f.store.get("s", "default").await.unwrap();
    assert_eq!(
        secret.metadata.labels.unwrap()[SERVICE_BINDING_ID_LABEL],
        binding.id
    );
}

#[tokio::test]
async fn test_accepted_create_writes_no_secret() {
    let f = fixture();
    f.broker.respond_accepted();

    let outcome = f
        .manager
        .create_binding(&request("sb-async", Some(("async-secret", "default"))))
        .await
        .unwrap();

    assert!(outcome.is_accepted());
    assert!(f.provider.is_empty());
}

#[tokio::test]
async fn test_restore_to_another_name_in_same_namespace_conflicts() {
    let f = fixture();
    let binding = completed(
        f.manager
            .create_binding(&request("b1", Some(("s", "default"))))
            .await
            .unwrap(),
    );

    let err = f
        .manager
        .restore_binding_secret(&binding.id, Some("s2"), Some("default"))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "secret \"s\" in \"default\" namespace already exists"
    );

    let owned = f
        .store
        .get_all_by_labels(&labels::for_binding(&binding.id))
        .await
        .unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].metadata.name.as_deref(), Some("s"));

    let elsewhere = f
        .manager
        .restore_binding_secret(&binding.id, Some("s2"), Some("apps"))
        .await
        .expect("a second namespace may hold its own copy");
    assert_eq!(elsewhere.secret_namespace.as_deref(), Some("apps"));
}

#[tokio::test]
async fn test_secret_cleanup_failure_after_broker_delete_is_returned() {
    let broker = Arc::new(FakeBroker::new());
    let provider = Arc::new(UndeletableSecrets {
        inner: InMemoryProvider::new(),
    });
    let store = CredentialStore::new(Arc::clone(&provider) as Arc<dyn ObjectProvider<Secret>>);
    let manager = BindingManager::new(
        Arc::clone(&broker) as Arc<dyn ServiceBroker>,
        store.clone(),
        "default",
    );
    let binding = completed(
        manager
            .create_binding(&request("sb-stuck", Some(("stuck", "default"))))
            .await
            .unwrap(),
    );

    let err = manager.delete_binding(&binding.id).await.unwrap_err();

    assert!(matches!(err, BridgeError::Auth(_)));
    assert!(broker.calls().contains(&"delete_service_binding".to_string()));
    assert!(store.get("stuck", "default").await.is_ok());
}

#[tokio::test]
async fn test_failed_broker_delete_keeps_secrets() {
    let f = fixture();
    f.broker.add_binding("sb-existing", "existing", json!({"username": "user3"}));
    let secret = managed_secret(
        &SecretTarget::new("service-binding-3-secret", "kyma-system"),
        "sb-existing",
        INSTANCE_ID,
        &json!({"username": "user3", "password": "pass3"}),
    )
    .unwrap();
    f.store.create(&secret).await.unwrap();

    f.broker.respond_with_errors(403);
    let err = f.manager.delete_binding("sb-existing").await.unwrap_err();

    match err {
        BridgeError::Broker { status, .. } => assert_eq!(status, 403),
        other => panic!("expected broker error, got {other:?}"),
    }
    assert!(f
        .store
        .get("service-binding-3-secret", "kyma-system")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_delete_removes_secrets_in_every_namespace() {
    let f = fixture();
    f.broker.add_binding("sb-multi", "multi", json!({"username": "u"}));
    for (name, namespace) in [("one", "default"), ("two", "apps")] {
        let secret = managed_secret(
            &SecretTarget::new(name, namespace),
            "sb-multi",
            INSTANCE_ID,
            &json!({"username": "u"}),
        )
        .unwrap();
        f.store.create(&secret).await.unwrap();
    }

    f.manager.delete_binding("sb-multi").await.unwrap();

    let remaining = f
        .store
        .get_all_by_labels(&labels::for_binding("sb-multi"))
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_delete_without_secrets_succeeds() {
    let f = fixture();
    f.broker.add_binding("sb-bare", "bare", serde_json::Value::Null);

    let outcome = f.manager.delete_binding("sb-bare").await.unwrap();
    assert_eq!(outcome, WriteOutcome::Completed(()));
}

#[tokio::test]
async fn test_create_conflict_leaves_broker_binding_and_existing_secret() {
    let f = fixture();
    let existing = Secret {
        metadata: ObjectMeta {
            name: Some("sb-test-01-secret".to_string()),
            namespace: Some("default".to_string()),
            ..ObjectMeta::default()
        },
        string_data: Some(BTreeMap::from([("foo".to_string(), "bar".to_string())])),
        ..Secret::default()
    };
    f.provider.create(&existing).await.unwrap();

    let err = f
        .manager
        .create_binding(&request("sb-test-01", Some(("sb-test-01-secret", "default"))))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 409);
    assert!(f.broker.calls().contains(&"create_service_binding".to_string()));
    assert!(!f.broker.calls().contains(&"delete_service_binding".to_string()));

    let untouched = f.store.get("sb-test-01-secret", "default").await.unwrap();
    assert!(untouched.metadata.labels.is_none());
    assert_eq!(untouched.string_data, existing.string_data);
}

#[tokio::test]
async fn test_broker_create_failure_writes_no_secret() {
    let f = fixture();
    f.broker.respond_with_errors(400);

    let err = f
        .manager
        .create_binding(&request("sb-test-01", Some(("s", "default"))))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert!(f.provider.is_empty());
}

#[tokio::test]
async fn test_listing_enriches_bindings_with_secret_targets() {
    let f = fixture();
    let with_secret = completed(
        f.manager
            .create_binding(&request("with-secret", Some(("creds", "apps"))))
            .await
            .unwrap(),
    );
    f.broker.add_binding("sb-no-secret", "no-secret", serde_json::Value::Null);

    let listed = f.manager.bindings_with_secrets(Some(INSTANCE_ID)).await.unwrap();
    assert_eq!(listed.len(), 2);

    let enriched = listed.iter().find(|b| b.id == with_secret.id).unwrap();
    assert_eq!(enriched.secret_name.as_deref(), Some("creds"));
    assert_eq!(enriched.secret_namespace.as_deref(), Some("apps"));

    let bare = listed.iter().find(|b| b.id == "sb-no-secret").unwrap();
    assert!(bare.secret_name.is_none());

    let single = f.manager.binding_with_secret(&with_secret.id).await.unwrap();
    assert_eq!(single.secret_namespace.as_deref(), Some("apps"));
}
