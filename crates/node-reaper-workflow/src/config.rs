//! Configuration for the workflow and the HTTP service.
//!
//! Both structs are read from environment variables at startup.

use std::fmt;
use std::path::PathBuf;

use node_reaper_cluster::{ClusterError, EvacuationOptions};
use node_reaper_core::{CredentialRef, IdError};
use node_reaper_credentials::CredentialConfig;
use node_reaper_inventory::InventoryConfig;
use thiserror::Error;

/// Errors in environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `REAPER_CREDENTIAL_REF` is not a valid reference.
    #[error("invalid REAPER_CREDENTIAL_REF: {0}")]
    CredentialRef(#[from] IdError),

    /// A drain setting is invalid.
    #[error(transparent)]
    Evacuation(#[from] ClusterError),

    /// A numeric setting could not be parsed.
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber {
        /// The environment variable.
        key: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Configuration for [`DecommissionWorkflow`](crate::DecommissionWorkflow).
#[derive(Debug, Clone, Default)]
pub struct WorkflowConfig {
    /// Secret holding the cluster kubeconfig.
    pub credential_ref: CredentialRef,

    /// Directory for materialized credentials. Uses the system temp dir if unset.
    pub credential_dir: Option<PathBuf>,

    /// Report success when the node is already gone at removal time.
    pub treat_absent_node_as_removed: bool,

    /// Drain policy and timeout.
    pub evacuation: EvacuationOptions,
}

impl WorkflowConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `REAPER_CREDENTIAL_REF`: Secret holding the kubeconfig
    /// - `REAPER_CREDENTIAL_DIR`: Directory for materialized credentials
    /// - `REAPER_TREAT_ABSENT_AS_REMOVED`: `true` to accept an already-absent node
    /// - `REAPER_DRAIN_TIMEOUT_SECS`, `REAPER_DRAIN_GRACE_PERIOD_SECS`: see
    ///   [`EvacuationOptions::from_env`]
    ///
    /// # Errors
    ///
    /// Returns an error if `REAPER_CREDENTIAL_REF` is set to an invalid
    /// reference or a drain setting is not a valid number of seconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_vars(|key| std::env::var(key).ok())?;
        config.evacuation = EvacuationOptions::from_env()?;
        Ok(config)
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(val) = var("REAPER_CREDENTIAL_REF") {
            config.credential_ref = CredentialRef::new(val)?;
        }
        if let Some(val) = var("REAPER_CREDENTIAL_DIR") {
            if !val.is_empty() {
                config.credential_dir = Some(PathBuf::from(val));
            }
        }
        if let Some(val) = var("REAPER_TREAT_ABSENT_AS_REMOVED") {
            config.treat_absent_node_as_removed = parse_flag(&val);
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Configuration for the `node-reaper` service binary.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    pub listen_addr: String,

    /// Base URL of the inventory service.
    pub inventory_url: String,

    /// Base URL of the secret store.
    pub secrets_url: String,

    /// Bearer token for the secret store.
    pub secrets_token: Option<String>,

    /// Timeout for inventory and secret store requests, in seconds.
    pub http_timeout_seconds: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `LISTEN_ADDR`: Address the HTTP server binds to
    /// - `REAPER_INVENTORY_URL`: Inventory service base URL
    /// - `REAPER_SECRETS_URL`: Secret store base URL
    /// - `REAPER_SECRETS_TOKEN`: Secret store bearer token
    /// - `REAPER_HTTP_TIMEOUT_SECS`: Inventory and secret store request timeout
    /// - `REAPER_MAX_BODY_BYTES`: Maximum request body size
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(val) = var("LISTEN_ADDR") {
            config.listen_addr = val;
        }
        if let Some(val) = var("REAPER_INVENTORY_URL") {
            config.inventory_url = val;
        }
        if let Some(val) = var("REAPER_SECRETS_URL") {
            config.secrets_url = val;
        }
        if let Some(val) = var("REAPER_SECRETS_TOKEN") {
            if !val.is_empty() {
                config.secrets_token = Some(val);
            }
        }
        if let Some(val) = var("REAPER_HTTP_TIMEOUT_SECS") {
            config.http_timeout_seconds = parse_positive("REAPER_HTTP_TIMEOUT_SECS", val)?;
        }
        if let Some(val) = var("REAPER_MAX_BODY_BYTES") {
            config.max_body_bytes = parse_positive("REAPER_MAX_BODY_BYTES", val)?;
        }

        Ok(config)
    }

    /// Settings for the inventory client.
    #[must_use]
    pub fn inventory_config(&self) -> InventoryConfig {
        InventoryConfig {
            base_url: self.inventory_url.clone(),
            timeout_seconds: self.http_timeout_seconds,
        }
    }

    /// Settings for the secret store client.
    #[must_use]
    pub fn credential_config(&self) -> CredentialConfig {
        CredentialConfig {
            base_url: self.secrets_url.clone(),
            token: self.secrets_token.clone(),
            timeout_seconds: self.http_timeout_seconds,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            inventory_url: InventoryConfig::default().base_url,
            secrets_url: CredentialConfig::default().base_url,
            secrets_token: None,
            http_timeout_seconds: 10,
            max_body_bytes: 64 * 1024,
        }
    }
}

fn parse_positive<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::InvalidNumber { key, value }),
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("listen_addr", &self.listen_addr)
            .field("inventory_url", &self.inventory_url)
            .field("secrets_url", &self.secrets_url)
            .field("secrets_token", &self.secrets_token.as_ref().map(|_| "<redacted>"))
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn workflow_defaults() {
        let config = WorkflowConfig::default();
        assert_eq!(config.credential_ref.as_str(), "kubeconfig");
        assert!(config.credential_dir.is_none());
        assert!(!config.treat_absent_node_as_removed);
        assert_eq!(config.evacuation, EvacuationOptions::policy());
    }

    #[test]
    fn workflow_from_vars() {
        let config = WorkflowConfig::from_vars(vars(&[
            ("REAPER_CREDENTIAL_REF", "prod/eks-kubeconfig"),
            ("REAPER_CREDENTIAL_DIR", "/run/reaper"),
            ("REAPER_TREAT_ABSENT_AS_REMOVED", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(config.credential_ref.as_str(), "prod/eks-kubeconfig");
        assert_eq!(config.credential_dir, Some(PathBuf::from("/run/reaper")));
        assert!(config.treat_absent_node_as_removed);
    }

    #[test]
    fn workflow_rejects_bad_credential_ref() {
        let result = WorkflowConfig::from_vars(vars(&[("REAPER_CREDENTIAL_REF", "has space")]));
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::CredentialRef(IdError::InvalidCharacters)
        ));
    }

    #[test]
    fn absent_flag_parsing() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("maybe"));
    }

    #[test]
    fn service_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.inventory_url, "http://inventory.infra.svc:8080");
        assert_eq!(config.secrets_url, "http://secrets.infra.svc:8080");
        assert_eq!(config.http_timeout_seconds, 10);
        assert_eq!(config.max_body_bytes, 64 * 1024);
    }

    #[test]
    fn service_from_vars_builds_client_configs() {
        let config = ServiceConfig::from_vars(vars(&[
            ("LISTEN_ADDR", "127.0.0.1:9000"),
            ("REAPER_INVENTORY_URL", "http://inv:80"),
            ("REAPER_SECRETS_URL", "http://sec:80"),
            ("REAPER_SECRETS_TOKEN", "s3cret"),
            ("REAPER_HTTP_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.inventory_config().timeout_seconds, 3);
        assert_eq!(config.inventory_config().base_url, "http://inv:80");

        let credentials = config.credential_config();
        assert_eq!(credentials.base_url, "http://sec:80");
        assert_eq!(credentials.token.as_deref(), Some("s3cret"));
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn service_rejects_bad_numbers() {
        for value in ["0", "-1", "lots"] {
            let err =
                ServiceConfig::from_vars(vars(&[("REAPER_MAX_BODY_BYTES", value)])).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidNumber {
                    key: "REAPER_MAX_BODY_BYTES",
                    ..
                }
            ));
        }
    }
}
