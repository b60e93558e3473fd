//! # Broker Protocol Client
//!
//! Typed CRUD over the broker's offerings, plans, instances and bindings.
//!
//! ## Status handling
//!
//! - Reads decode any 2xx body into the resource shape
//! - Writes distinguish a final resource (200/201), an accepted operation
//!   (202, see [`WriteOutcome::Accepted`]) and failure
//! - Every other status becomes [`crate::BridgeError::Broker`] carrying the
//!   joined `{error, description}` body; an unreadable body is a
//!   [`crate::BridgeError::Decode`] instead
//!
//! Each call is attempted exactly once.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub mod client;
pub mod types;

pub use client::BrokerClient;
pub use types::{
    BrokerLabels, Collection, ErrorResponse, ServiceBinding, ServiceInstance,
    ServiceInstanceUpdateRequest, ServiceOffering, ServiceOfferingDetails, ServicePlan,
    WriteOutcome,
};

/// Broker operations used by the binding orchestrator and the CLI
#[async_trait]
pub trait ServiceBroker: Send + Sync {
    async fn service_offerings(&self) -> Result<Collection<ServiceOffering>>;

    /// One offering joined with the plans that reference it
    async fn service_offering_details(&self, offering_id: &str) -> Result<ServiceOfferingDetails>;

    async fn service_plan(&self, plan_id: &str) -> Result<ServicePlan>;

    async fn service_instances(&self) -> Result<Collection<ServiceInstance>>;

    async fn service_instance(&self, instance_id: &str) -> Result<ServiceInstance>;

    /// An instance with `service_plan_name` filled from its plan
    ///
    /// Fails with whichever lookup failed; there is no partial result.
    async fn service_instance_with_plan_name(&self, instance_id: &str) -> Result<ServiceInstance> {
        let mut instance = self.service_instance(instance_id).await?;
        let plan = self.service_plan(&instance.service_plan_id).await?;
        instance.service_plan_name = Some(plan.name);
        Ok(instance)
    }

    async fn service_instance_parameters(&self, instance_id: &str) -> Result<Value>;

    async fn create_service_instance(
        &self,
        instance: &ServiceInstance,
    ) -> Result<WriteOutcome<ServiceInstance>>;

    /// Validated locally; an invalid request never reaches the broker
    async fn update_service_instance(
        &self,
        request: &ServiceInstanceUpdateRequest,
    ) -> Result<WriteOutcome<ServiceInstance>>;

    async fn delete_service_instance(&self, instance_id: &str) -> Result<WriteOutcome<()>>;

    /// All bindings, or only those of one instance
    async fn service_bindings_for(
        &self,
        instance_id: Option<&str>,
    ) -> Result<Collection<ServiceBinding>>;

    async fn service_binding(&self, binding_id: &str) -> Result<ServiceBinding>;

    async fn service_binding_parameters(&self, binding_id: &str) -> Result<Value>;

    async fn create_service_binding(
        &self,
        binding: &ServiceBinding,
    ) -> Result<WriteOutcome<ServiceBinding>>;

    async fn delete_service_binding(&self, binding_id: &str) -> Result<WriteOutcome<()>>;
}
