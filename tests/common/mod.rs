//! Common test utilities
//!
//! Provides rustls initialization for Pact tests and an in-process fake broker
//! for orchestrator tests.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use std::collections::BTreeMap;
use std::sync::{Mutex, Once, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};
use service_manager_bridge::broker::{
    Collection, ServiceBinding, ServiceBroker, ServiceInstance, ServiceInstanceUpdateRequest,
    ServiceOffering, ServiceOfferingDetails, ServicePlan, WriteOutcome,
};
use service_manager_bridge::{BridgeError, Result};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

pub const INSTANCE_ID: &str = "a7e240d6-e348-4fc0-a54c-7b7bfe9b9da6";

/// How the fake broker answers writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Data,
    Accepted,
    Errors { status: u16 },
}

#[derive(Debug)]
struct State {
    mode: Mode,
    bindings: BTreeMap<String, ServiceBinding>,
    next_id: u32,
    calls: Vec<String>,
}

/// In-process broker serving bindings from fixture data
///
/// Deleted bindings stay retrievable, like a broker that still serves a
/// binding while it is being deprovisioned.
#[derive(Debug)]
pub struct FakeBroker {
    state: Mutex<State>,
}

impl Default for FakeBroker {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                mode: Mode::Data,
                bindings: BTreeMap::new(),
                next_id: 1,
                calls: Vec::new(),
            }),
        }
    }
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with_data(&self) {
        self.lock().mode = Mode::Data;
    }

    pub fn respond_accepted(&self) {
        self.lock().mode = Mode::Accepted;
    }

    pub fn respond_with_errors(&self, status: u16) {
        self.lock().mode = Mode::Errors { status };
    }

    /// Seed a binding as if it had been created earlier
    pub fn add_binding(&self, id: &str, name: &str, credentials: Value) {
        self.lock().bindings.insert(
            id.to_string(),
            ServiceBinding {
                id: id.to_string(),
                name: name.to_string(),
                service_instance_id: INSTANCE_ID.to_string(),
                credentials,
                ..ServiceBinding::default()
            },
        );
    }

    /// Broker operations received so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: &str) -> Mode {
        let mut state = self.lock();
        state.calls.push(call.to_string());
        state.mode.clone()
    }

    fn failure(status: u16) -> BridgeError {
        BridgeError::Broker {
            status,
            message: "Forbidden: fake broker configured to fail".to_string(),
        }
    }

    fn not_found(what: &str) -> BridgeError {
        BridgeError::Broker {
            status: 404,
            message: format!("NotFound: {what} not found"),
        }
    }
}

#[async_trait]
impl ServiceBroker for FakeBroker {
    async fn service_offerings(&self) -> Result<Collection<ServiceOffering>> {
        self.record("service_offerings");
        Ok(Collection::default())
    }

    async fn service_offering_details(&self, offering_id: &str) -> Result<ServiceOfferingDetails> {
        self.record("service_offering_details");
        Err(Self::not_found(offering_id))
    }

    async fn service_plan(&self, plan_id: &str) -> Result<ServicePlan> {
        self.record("service_plan");
        Err(Self::not_found(plan_id))
    }

    async fn service_instances(&self) -> Result<Collection<ServiceInstance>> {
        self.record("service_instances");
        Ok(Collection::default())
    }

    async fn service_instance(&self, instance_id: &str) -> Result<ServiceInstance> {
        self.record("service_instance");
        Err(Self::not_found(instance_id))
    }

    async fn service_instance_parameters(&self, instance_id: &str) -> Result<Value> {
        self.record("service_instance_parameters");
        Err(Self::not_found(instance_id))
    }

    async fn create_service_instance(
        &self,
        _instance: &ServiceInstance,
    ) -> Result<WriteOutcome<ServiceInstance>> {
        self.record("create_service_instance");
        Ok(WriteOutcome::Accepted)
    }

    async fn update_service_instance(
        &self,
        _request: &ServiceInstanceUpdateRequest,
    ) -> Result<WriteOutcome<ServiceInstance>> {
        self.record("update_service_instance");
        Ok(WriteOutcome::Accepted)
    }

    async fn delete_service_instance(&self, _instance_id: &str) -> Result<WriteOutcome<()>> {
        self.record("delete_service_instance");
        Ok(WriteOutcome::Accepted)
    }

    async fn service_bindings_for(
        &self,
        instance_id: Option<&str>,
    ) -> Result<Collection<ServiceBinding>> {
        if let Mode::Errors { status } = self.record("service_bindings_for") {
            return Err(Self::failure(status));
        }
        let items: Vec<ServiceBinding> = self
            .lock()
            .bindings
            .values()
            .filter(|binding| instance_id.is_none_or(|id| binding.service_instance_id == id))
            .cloned()
            .collect();
        Ok(Collection {
            num_items: items.len(),
            items,
        })
    }

    async fn service_binding(&self, binding_id: &str) -> Result<ServiceBinding> {
        if let Mode::Errors { status } = self.record("service_binding") {
            return Err(Self::failure(status));
        }
        self.lock()
            .bindings
            .get(binding_id)
            .cloned()
            .ok_or_else(|| Self::not_found(binding_id))
    }

    async fn service_binding_parameters(&self, binding_id: &str) -> Result<Value> {
        self.record("service_binding_parameters");
        self.lock()
            .bindings
            .get(binding_id)
            .map(|binding| binding.parameters.clone())
            .ok_or_else(|| Self::not_found(binding_id))
    }

    async fn create_service_binding(
        &self,
        binding: &ServiceBinding,
    ) -> Result<WriteOutcome<ServiceBinding>> {
        match self.record("create_service_binding") {
            Mode::Errors { status } => Err(Self::failure(status)),
            Mode::Accepted => Ok(WriteOutcome::Accepted),
            Mode::Data => {
                let mut state = self.lock();
                let id = format!("sb-{:04}", state.next_id);
                state.next_id += 1;
                let created = ServiceBinding {
                    id: id.clone(),
                    credentials: json!({
                        "username": format!("user-{}", binding.name),
                        "password": "pass",
                        "uaa": {"clientid": "uaa-client", "url": "https://uaa.example.com"},
                    }),
                    ..binding.clone()
                };
                state.bindings.insert(id, created.clone());
                Ok(WriteOutcome::Completed(created))
            }
        }
    }

    async fn delete_service_binding(&self, binding_id: &str) -> Result<WriteOutcome<()>> {
        match self.record("delete_service_binding") {
            Mode::Errors { status } => Err(Self::failure(status)),
            Mode::Accepted => Ok(WriteOutcome::Accepted),
            Mode::Data if self.lock().bindings.contains_key(binding_id) => {
                Ok(WriteOutcome::Completed(()))
            }
            Mode::Data => Err(Self::not_found(binding_id)),
        }
    }
}
