//! Tenant credentials read from a named credential secret.

use k8s_openapi::api::core::v1::Secret;
use zeroize::Zeroizing;

use crate::constants::{
    CLIENT_ID_KEY, CLIENT_SECRET_KEY, SM_URL_KEY, TOKEN_URL_KEY, TOKEN_URL_SUFFIX_KEY,
};
use crate::error::{BridgeError, Result};

/// Client-credentials grant inputs for one broker tenant
#[derive(Clone)]
pub struct BrokerCredentials {
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
    pub broker_url: String,
    pub token_url: String,
    pub token_url_suffix: String,
}

impl std::fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("broker_url", &self.broker_url)
            .field("token_url", &self.token_url)
            .field("token_url_suffix", &self.token_url_suffix)
            .finish()
    }
}

impl BrokerCredentials {
    /// Read the five tenant keys from a credential secret
    ///
    /// Values are taken from `data`, falling back to `stringData` for
    /// objects that have not been round-tripped through the API server.
    /// `tokenurlsuffix` may be absent; every other key is required.
    ///
    /// # Errors
    /// Returns `Auth` when a required key is missing, empty or not UTF-8
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let reader = SecretReader { secret };
        Ok(Self {
            client_id: reader.required(CLIENT_ID_KEY)?,
            client_secret: Zeroizing::new(reader.required(CLIENT_SECRET_KEY)?),
            broker_url: reader
                .required(SM_URL_KEY)?
                .trim_end_matches('/')
                .to_string(),
            token_url: reader.required(TOKEN_URL_KEY)?,
            token_url_suffix: reader.optional(TOKEN_URL_SUFFIX_KEY)?.unwrap_or_default(),
        })
    }

    /// Full URL of the token endpoint
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}{}", self.token_url, self.token_url_suffix)
    }
}

struct SecretReader<'a> {
    secret: &'a Secret,
}

impl SecretReader<'_> {
    fn optional(&self, key: &str) -> Result<Option<String>> {
        if let Some(bytes) = self.secret.data.as_ref().and_then(|data| data.get(key)) {
            let value = String::from_utf8(bytes.0.clone()).map_err(|_| {
                BridgeError::Auth(format!("key {key} of {} is not valid UTF-8", self.describe()))
            })?;
            return Ok(Some(value));
        }
        Ok(self
            .secret
            .string_data
            .as_ref()
            .and_then(|data| data.get(key))
            .cloned())
    }

    fn required(&self, key: &str) -> Result<String> {
        match self.optional(key)? {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(BridgeError::Auth(format!(
                "{} has no value for key {key}",
                self.describe()
            ))),
        }
    }

    fn describe(&self) -> String {
        format!(
            "credential secret {}/{}",
            self.secret.metadata.namespace.as_deref().unwrap_or_default(),
            self.secret.metadata.name.as_deref().unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn credential_secret(entries: &[(&str, &str)]) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("sap-btp-service-operator".to_string()),
                namespace: Some("kyma-system".to_string()),
                ..ObjectMeta::default()
            },
            data: Some(
                entries
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Secret::default()
        }
    }

    #[test]
    fn test_from_secret_reads_all_keys() {
        let creds = BrokerCredentials::from_secret(&credential_secret(&[
            ("clientid", "sb-client"),
            ("clientsecret", "s3cr3t"),
            ("sm_url", "https://service-manager.example.com/"),
            ("tokenurl", "https://auth.example.com"),
            ("tokenurlsuffix", "/oauth/token"),
        ]))
        .unwrap();

        assert_eq!(creds.client_id, "sb-client");
        assert_eq!(creds.client_secret.as_str(), "s3cr3t");
        assert_eq!(creds.broker_url, "https://service-manager.example.com");
        assert_eq!(
            creds.token_endpoint(),
            "https://auth.example.com/oauth/token"
        );
    }

    #[test]
    fn test_missing_key_names_the_key() {
        let err = BrokerCredentials::from_secret(&credential_secret(&[
            ("clientid", "sb-client"),
            ("sm_url", "https://sm"),
            ("tokenurl", "https://auth"),
        ]))
        .unwrap_err();

        assert!(matches!(err, BridgeError::Auth(_)));
        assert!(err.to_string().contains("clientsecret"));
        assert!(err.to_string().contains("kyma-system/sap-btp-service-operator"));
    }

    #[test]
    fn test_string_data_is_accepted_and_suffix_is_optional() {
        let mut secret = credential_secret(&[]);
        secret.data = None;
        secret.string_data = Some(BTreeMap::from([
            ("clientid".to_string(), "id".to_string()),
            ("clientsecret".to_string(), "secret".to_string()),
            ("sm_url".to_string(), "https://sm".to_string()),
            ("tokenurl".to_string(), "https://auth/oauth/token".to_string()),
        ]));

        let creds = BrokerCredentials::from_secret(&secret).unwrap();
        assert_eq!(creds.token_endpoint(), "https://auth/oauth/token");
    }

    #[test]
    fn test_debug_redacts_client_secret() {
        let creds = BrokerCredentials::from_secret(&credential_secret(&[
            ("clientid", "id"),
            ("clientsecret", "do-not-print"),
            ("sm_url", "https://sm"),
            ("tokenurl", "https://auth"),
        ]))
        .unwrap();
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("do-not-print"));
        assert!(rendered.contains("<redacted>"));
    }
}
