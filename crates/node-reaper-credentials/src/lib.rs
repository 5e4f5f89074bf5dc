//! Scoped cluster credentials for node-reaper.
//!
//! This crate fetches the kubeconfig used to reach the cluster and gives it a
//! strictly scoped lifetime:
//!
//! - [`CredentialProvider`] fetches a [`ClusterCredential`] from a secret store
//! - [`ClusterCredential::materialize`] writes it to a private temporary file
//! - [`MaterializedCredential::release`] deletes that file
//!
//! Credentials are passed explicitly to every cluster operation; nothing is
//! exported through the process environment.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌────────────────────┐
//! │   Workflow       │────▶│ CredentialProvider │
//! │                  │     │ (trait)            │
//! └────────┬─────────┘     └─────────┬──────────┘
//!          │                         │ HTTPS
//!          │               ┌─────────▼──────────┐
//!          │               │   Secret store     │
//!          │               └────────────────────┘
//!          ▼
//! ┌──────────────────────┐
//! │ MaterializedCredential│  temp kubeconfig, 0600,
//! │ (scoped file)        │  deleted on release/drop
//! └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use node_reaper_core::CredentialRef;
//! use node_reaper_credentials::{CredentialConfig, CredentialProvider, HttpSecretProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = HttpSecretProvider::new(&CredentialConfig::default())?;
//! let credential = provider
//!     .get_cluster_credential(&CredentialRef::new("eks-kubeconfig")?)
//!     .await?;
//!
//! let scoped = credential.materialize(None)?;
//! // ... hand scoped.path() to the cluster client ...
//! scoped.release()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::fmt;

pub mod client;
pub mod credential;
pub mod error;
pub mod provider;

pub use client::HttpSecretProvider;
pub use credential::{ClusterCredential, MaterializedCredential};
pub use error::{CredentialError, Result};
pub use provider::CredentialProvider;

#[cfg(any(test, feature = "test-utils"))]
pub use provider::mock::StaticCredentialProvider;

/// Configuration for the secret store client.
#[derive(Clone)]
pub struct CredentialConfig {
    /// Base URL of the secret store (e.g., `http://secrets:8080`).
    pub base_url: String,
    /// Optional bearer token presented to the secret store.
    pub token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            base_url: "http://secrets.infra.svc:8080".to_string(),
            token: None,
            timeout_seconds: 10,
        }
    }
}
