//! # Catalog Commands
//!
//! Read-only broker queries: offerings, plans and instances.

use anyhow::{Context, Result};
use service_manager_bridge::broker::ServiceBroker;

use super::print_json;

pub async fn offerings_command(broker: &dyn ServiceBroker) -> Result<()> {
    let offerings = broker
        .service_offerings()
        .await
        .context("Failed to list service offerings")?;
    print_json(&offerings)
}

pub async fn offering_command(broker: &dyn ServiceBroker, id: &str) -> Result<()> {
    let details = broker
        .service_offering_details(id)
        .await
        .with_context(|| format!("Failed to get service offering {id}"))?;
    print_json(&details)
}

pub async fn instances_command(broker: &dyn ServiceBroker) -> Result<()> {
    let instances = broker
        .service_instances()
        .await
        .context("Failed to list service instances")?;
    print_json(&instances)
}

pub async fn instance_command(broker: &dyn ServiceBroker, id: &str, parameters: bool) -> Result<()> {
    if parameters {
        let parameters = broker
            .service_instance_parameters(id)
            .await
            .with_context(|| format!("Failed to get parameters of service instance {id}"))?;
        return print_json(&parameters);
    }

    let instance = broker
        .service_instance_with_plan_name(id)
        .await
        .with_context(|| format!("Failed to get service instance {id}"))?;
    print_json(&instance)
}
