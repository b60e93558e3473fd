//! Broker REST client bound to one [`BrokerSession`].

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, info_span, Instrument};

use super::types::{
    Collection, ErrorResponse, ServiceBinding, ServiceInstance, ServiceInstanceUpdateRequest,
    ServiceOffering, ServiceOfferingDetails, ServicePlan, WriteOutcome,
};
use super::ServiceBroker;
use crate::auth::BrokerSession;
use crate::constants::{
    FIELD_QUERY_KEY, PARAMETERS_PATH_SEGMENT, SERVICE_BINDINGS_PATH, SERVICE_INSTANCES_PATH,
    SERVICE_OFFERINGS_PATH, SERVICE_PLANS_PATH,
};
use crate::error::{BridgeError, Result};
use crate::observability::metrics;

const NO_BODY: Option<&Value> = None;

/// Raw broker reply, kept until the caller decides how to read it
struct BrokerResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl BrokerResponse {
    fn decode<T: DeserializeOwned>(&self, context: &str) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| BridgeError::decode(context, e))
    }

    /// Body of a 2xx reply, or the broker error it carries
    fn into_resource<T: DeserializeOwned>(self, context: &str) -> Result<T> {
        if self.status.is_success() {
            self.decode(context)
        } else {
            Err(self.into_error())
        }
    }

    fn into_error(self) -> BridgeError {
        let status = self.status.as_u16();
        match serde_json::from_slice::<ErrorResponse>(&self.body) {
            Ok(body) => BridgeError::Broker {
                status,
                message: body.message(),
            },
            Err(e) => BridgeError::decode(format!("broker error body (status {status})"), e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrokerClient {
    session: BrokerSession,
}

impl BrokerClient {
    #[must_use]
    pub fn new(session: BrokerSession) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn broker_url(&self) -> &str {
        self.session.broker_url()
    }

    async fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.session.bearer_token().await?;
        Ok(self
            .session
            .http()
            .request(method, format!("{}{}", self.session.broker_url(), path))
            .bearer_auth(token.as_str())
            .header(CONTENT_TYPE, "application/json"))
    }

    /// One round-trip with tracing and metrics
    async fn call<B: Serialize + Sync + ?Sized>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<BrokerResponse> {
        let span = info_span!("broker.request", broker.operation = operation, broker.path = %path);

        async move {
            let started = Instant::now();
            debug!("Dispatching {} {}", method, path);

            let result = async {
                let mut request = self.authorized(method, path).await?;
                if !query.is_empty() {
                    request = request.query(query);
                }
                if let Some(body) = body {
                    request = request.json(body);
                }
                let response = request.send().await?;
                let status = response.status();
                let body = response.bytes().await?.to_vec();
                Ok::<_, BridgeError>(BrokerResponse { status, body })
            }
            .await;

            let outcome = match &result {
                Ok(response) if response.status == StatusCode::ACCEPTED => "accepted",
                Ok(response) if response.status.is_success() => "completed",
                _ => "error",
            };
            metrics::record_broker_request(operation, outcome, started.elapsed().as_secs_f64());
            if let Ok(response) = &result {
                debug!("Broker answered {} for {}", response.status.as_u16(), operation);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.call(operation, Method::GET, path, query, NO_BODY)
            .await?
            .into_resource(operation)
    }

    async fn create<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> Result<WriteOutcome<T>> {
        let response = self
            .call(operation, Method::POST, path, &[], Some(body))
            .await?;
        match response.status {
            StatusCode::OK | StatusCode::CREATED => {
                Ok(WriteOutcome::Completed(response.decode(operation)?))
            }
            StatusCode::ACCEPTED => Ok(WriteOutcome::Accepted),
            _ => Err(response.into_error()),
        }
    }

    async fn delete(&self, operation: &'static str, path: &str) -> Result<WriteOutcome<()>> {
        let response = self
            .call(operation, Method::DELETE, path, &[], NO_BODY)
            .await?;
        match response.status {
            StatusCode::OK => Ok(WriteOutcome::Completed(())),
            StatusCode::ACCEPTED => Ok(WriteOutcome::Accepted),
            _ => Err(response.into_error()),
        }
    }

    async fn service_offering(&self, offering_id: &str) -> Result<ServiceOffering> {
        self.get(
            "get_offering",
            &format!("{SERVICE_OFFERINGS_PATH}/{offering_id}"),
            &[],
        )
        .await
    }

    async fn service_plans_for_offering(&self, offering_id: &str) -> Result<Vec<ServicePlan>> {
        let plans: Collection<ServicePlan> = self
            .get(
                "list_plans",
                SERVICE_PLANS_PATH,
                &[(FIELD_QUERY_KEY, field_equals("service_offering_id", offering_id))],
            )
            .await?;
        Ok(plans.items)
    }
}

/// Broker field-query expression matching one field exactly
fn field_equals(field: &str, value: &str) -> String {
    format!("{field} eq '{value}'")
}

fn validate_update(request: &ServiceInstanceUpdateRequest) -> Result<()> {
    if request.id.is_empty() {
        return Err(BridgeError::Validation(
            "service instance id is required for an update".to_string(),
        ));
    }
    let conflicting = request.fields_conflicting_with_shared();
    if !conflicting.is_empty() {
        return Err(BridgeError::Validation(format!(
            "shared must be updated on its own, but the request also sets: {}",
            conflicting.join(", ")
        )));
    }
    Ok(())
}

#[async_trait]
impl ServiceBroker for BrokerClient {
    async fn service_offerings(&self) -> Result<Collection<ServiceOffering>> {
        self.get("list_offerings", SERVICE_OFFERINGS_PATH, &[]).await
    }

    async fn service_offering_details(&self, offering_id: &str) -> Result<ServiceOfferingDetails> {
        let (offering, plans) = futures::try_join!(
            self.service_offering(offering_id),
            self.service_plans_for_offering(offering_id)
        )?;
        Ok(ServiceOfferingDetails { offering, plans })
    }

    async fn service_plan(&self, plan_id: &str) -> Result<ServicePlan> {
        self.get("get_plan", &format!("{SERVICE_PLANS_PATH}/{plan_id}"), &[])
            .await
    }

    async fn service_instances(&self) -> Result<Collection<ServiceInstance>> {
        self.get("list_instances", SERVICE_INSTANCES_PATH, &[]).await
    }

    async fn service_instance(&self, instance_id: &str) -> Result<ServiceInstance> {
        self.get(
            "get_instance",
            &format!("{SERVICE_INSTANCES_PATH}/{instance_id}"),
            &[],
        )
        .await
    }

    async fn service_instance_parameters(&self, instance_id: &str) -> Result<Value> {
        self.get(
            "get_instance_parameters",
            &format!("{SERVICE_INSTANCES_PATH}/{instance_id}/{PARAMETERS_PATH_SEGMENT}"),
            &[],
        )
        .await
    }

    async fn create_service_instance(
        &self,
        instance: &ServiceInstance,
    ) -> Result<WriteOutcome<ServiceInstance>> {
        let outcome = self
            .create("create_instance", SERVICE_INSTANCES_PATH, instance)
            .await?;
        info!(
            "Service instance {} {}",
            instance.name,
            describe(&outcome)
        );
        Ok(outcome)
    }

    async fn update_service_instance(
        &self,
        request: &ServiceInstanceUpdateRequest,
    ) -> Result<WriteOutcome<ServiceInstance>> {
        validate_update(request)?;

        let response = self
            .call(
                "update_instance",
                Method::PATCH,
                &format!("{SERVICE_INSTANCES_PATH}/{}", request.id),
                &[],
                Some(request),
            )
            .await?;
        match response.status {
            StatusCode::OK => Ok(WriteOutcome::Completed(response.decode("update_instance")?)),
            StatusCode::ACCEPTED => Ok(WriteOutcome::Accepted),
            _ => Err(response.into_error()),
        }
    }

    async fn delete_service_instance(&self, instance_id: &str) -> Result<WriteOutcome<()>> {
        let outcome = self
            .delete(
                "delete_instance",
                &format!("{SERVICE_INSTANCES_PATH}/{instance_id}"),
            )
            .await?;
        info!("Service instance {} deletion {}", instance_id, describe(&outcome));
        Ok(outcome)
    }

    async fn service_bindings_for(
        &self,
        instance_id: Option<&str>,
    ) -> Result<Collection<ServiceBinding>> {
        let query = instance_id
            .map(|id| vec![(FIELD_QUERY_KEY, field_equals("service_instance_id", id))])
            .unwrap_or_default();
        self.get("list_bindings", SERVICE_BINDINGS_PATH, &query)
            .await
    }

    async fn service_binding(&self, binding_id: &str) -> Result<ServiceBinding> {
        self.get(
            "get_binding",
            &format!("{SERVICE_BINDINGS_PATH}/{binding_id}"),
            &[],
        )
        .await
    }

    async fn service_binding_parameters(&self, binding_id: &str) -> Result<Value> {
        self.get(
            "get_binding_parameters",
            &format!("{SERVICE_BINDINGS_PATH}/{binding_id}/{PARAMETERS_PATH_SEGMENT}"),
            &[],
        )
        .await
    }

    async fn create_service_binding(
        &self,
        binding: &ServiceBinding,
    ) -> Result<WriteOutcome<ServiceBinding>> {
        let outcome = self
            .create("create_binding", SERVICE_BINDINGS_PATH, binding)
            .await?;
        info!("Service binding {} {}", binding.name, describe(&outcome));
        Ok(outcome)
    }

    async fn delete_service_binding(&self, binding_id: &str) -> Result<WriteOutcome<()>> {
        let outcome = self
            .delete(
                "delete_binding",
                &format!("{SERVICE_BINDINGS_PATH}/{binding_id}"),
            )
            .await?;
        info!("Service binding {} deletion {}", binding_id, describe(&outcome));
        Ok(outcome)
    }
}

fn describe<T>(outcome: &WriteOutcome<T>) -> &'static str {
    match outcome {
        WriteOutcome::Completed(_) => "completed",
        WriteOutcome::Accepted => "accepted by broker",
    }
}
