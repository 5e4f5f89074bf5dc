//! HTTP client for the secret store.
//!
//! Secrets are fetched with `GET /v1/secrets/{ref}`. The response mirrors a
//! secrets-manager `GetSecretValue` payload: a text `secret_string` or a
//! base64-encoded `secret_binary`.

use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use node_reaper_core::CredentialRef;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::credential::ClusterCredential;
use crate::error::{CredentialError, Result};
use crate::provider::CredentialProvider;
use crate::CredentialConfig;

/// Raw secret value returned by the secret store.
#[derive(Deserialize)]
struct SecretValue {
    #[serde(default)]
    secret_string: Option<String>,
    #[serde(default)]
    secret_binary: Option<String>,
}

/// Credential provider backed by the secret store's REST API.
pub struct HttpSecretProvider {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpSecretProvider {
    /// Create a new provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Config` if the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &CredentialConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| CredentialError::Config(format!("failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            CredentialError::Config(format!("invalid base URL {:?}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CredentialError::Config(format!(
                "base URL {base_url} cannot carry a path"
            )));
        }

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    fn secret_url(&self, credential_ref: &CredentialRef) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v1", "secrets", credential_ref.as_str()]);
        }
        url
    }

    fn decode(credential_ref: &CredentialRef, value: SecretValue) -> Result<ClusterCredential> {
        if let Some(text) = value.secret_string.filter(|s| !s.trim().is_empty()) {
            return Ok(ClusterCredential::new(text));
        }

        let encoded = value.secret_binary.ok_or_else(|| {
            CredentialError::InvalidSecret(format!("secret {credential_ref} has no payload"))
        })?;
        let bytes = BASE64_STANDARD.decode(encoded.trim()).map_err(|e| {
            CredentialError::InvalidSecret(format!("secret {credential_ref} is not base64: {e}"))
        })?;
        let text = String::from_utf8(bytes).map_err(|_| {
            CredentialError::InvalidSecret(format!("secret {credential_ref} is not UTF-8"))
        })?;
        if text.trim().is_empty() {
            return Err(CredentialError::InvalidSecret(format!(
                "secret {credential_ref} is empty"
            )));
        }

        Ok(ClusterCredential::new(text))
    }
}

#[async_trait]
impl CredentialProvider for HttpSecretProvider {
    async fn get_cluster_credential(
        &self,
        credential_ref: &CredentialRef,
    ) -> Result<ClusterCredential> {
        debug!(credential_ref = %credential_ref, "Fetching cluster credential");

        let mut request = self.client.get(self.secret_url(credential_ref));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CredentialError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        match status {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(CredentialError::AccessDenied(format!(
                    "secret store returned {status} for {credential_ref}"
                )));
            }
            StatusCode::NOT_FOUND => {
                return Err(CredentialError::AccessDenied(format!(
                    "secret {credential_ref} does not exist or is not visible"
                )));
            }
            _ => {
                return Err(CredentialError::Transient(format!(
                    "secret store returned {status}"
                )));
            }
        }

        let value: SecretValue = response
            .json()
            .await
            .map_err(|e| CredentialError::Transient(format!("invalid response: {e}")))?;

        Self::decode(credential_ref, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KUBECONFIG: &str = "apiVersion: v1\nkind: Config\n";

    fn provider_for(server: &MockServer, token: Option<&str>) -> HttpSecretProvider {
        let config = CredentialConfig {
            base_url: server.uri(),
            token: token.map(str::to_string),
            timeout_seconds: 5,
        };
        HttpSecretProvider::new(&config).unwrap()
    }

    fn reference() -> CredentialRef {
        CredentialRef::new("eks-kubeconfig").unwrap()
    }

    async fn materialized_contents(credential: ClusterCredential) -> String {
        let materialized = credential.materialize(None).unwrap();
        let contents = tokio::fs::read_to_string(materialized.path()).await.unwrap();
        materialized.release().unwrap();
        contents
    }

    #[tokio::test]
    async fn fetches_secret_string_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secrets/eks-kubeconfig"))
            .and(header("authorization", "Bearer s3cr3t"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "secret_string": KUBECONFIG })),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("s3cr3t"));
        let credential = provider.get_cluster_credential(&reference()).await.unwrap();

        assert_eq!(materialized_contents(credential).await, KUBECONFIG);
    }

    #[tokio::test]
    async fn decodes_secret_binary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secrets/eks-kubeconfig"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "secret_binary": BASE64_STANDARD.encode(KUBECONFIG)
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, None);
        let credential = provider.get_cluster_credential(&reference()).await.unwrap();

        assert_eq!(materialized_contents(credential).await, KUBECONFIG);
    }

    #[tokio::test]
    async fn forbidden_is_access_denied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let provider = provider_for(&server, None);
        let result = provider.get_cluster_credential(&reference()).await;

        assert!(matches!(result, Err(CredentialError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = provider_for(&server, None);
        let err = provider
            .get_cluster_credential(&reference())
            .await
            .unwrap_err();

        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn empty_payload_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let provider = provider_for(&server, None);
        let result = provider.get_cluster_credential(&reference()).await;

        assert!(matches!(result, Err(CredentialError::InvalidSecret(_))));
    }
}
