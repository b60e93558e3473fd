//! Identity labels carried by every managed binding secret.

use std::collections::BTreeMap;

/// Standard label for the tool managing a resource
pub const MANAGED_BY_LABEL_KEY: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL_KEY`] on secrets this bridge owns
pub const OPERATOR_NAME: &str = "service-manager-bridge";

/// Binding ID whose credentials the secret holds
pub const SERVICE_BINDING_ID_LABEL: &str = "service-manager-bridge.octopilot.io/service-binding-id";

/// Instance ID the binding belongs to
pub const SERVICE_INSTANCE_ID_LABEL: &str =
    "service-manager-bridge.octopilot.io/service-instance-id";

pub type LabelSet = BTreeMap<String, String>;

/// Ownership marker alone, matching every managed secret
#[must_use]
pub fn ownership() -> LabelSet {
    LabelSet::from([(MANAGED_BY_LABEL_KEY.to_string(), OPERATOR_NAME.to_string())])
}

/// Ownership plus binding identity: the selector used to find a binding's secrets
#[must_use]
pub fn for_binding(binding_id: &str) -> LabelSet {
    let mut labels = ownership();
    labels.insert(SERVICE_BINDING_ID_LABEL.to_string(), binding_id.to_string());
    labels
}

/// Full label set written onto a new managed secret
#[must_use]
pub fn managed_secret(binding_id: &str, instance_id: &str) -> LabelSet {
    let mut labels = for_binding(binding_id);
    labels.insert(
        SERVICE_INSTANCE_ID_LABEL.to_string(),
        instance_id.to_string(),
    );
    labels
}

/// Render a label set as a Kubernetes equality selector (`k1=v1,k2=v2`)
#[must_use]
pub fn to_selector(labels: &LabelSet) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// True when every key in `selector` is present in `labels` with the same value
#[must_use]
pub fn matches(labels: Option<&LabelSet>, selector: &LabelSet) -> bool {
    selector.iter().all(|(key, value)| {
        labels
            .and_then(|labels| labels.get(key))
            .is_some_and(|actual| actual == value)
    })
}
