//! The credential provider interface.

use async_trait::async_trait;
use node_reaper_core::CredentialRef;

use crate::credential::ClusterCredential;
use crate::error::Result;

/// Supplies cluster access credentials from a secret store.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Fetch the cluster credential stored under `credential_ref`.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::AccessDenied` if the store refuses access and
    /// `CredentialError::Transient` if it is unavailable.
    async fn get_cluster_credential(
        &self,
        credential_ref: &CredentialRef,
    ) -> Result<ClusterCredential>;
}

/// A credential provider for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::CredentialError;

    /// Returns a fixed kubeconfig, or a configured failure.
    pub struct StaticCredentialProvider {
        kubeconfig: String,
        denied: Mutex<Option<String>>,
        calls: AtomicUsize,
    }

    impl StaticCredentialProvider {
        /// Create a provider that hands out `kubeconfig`.
        #[must_use]
        pub fn new(kubeconfig: impl Into<String>) -> Self {
            Self {
                kubeconfig: kubeconfig.into(),
                denied: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        /// Make every fetch fail with `AccessDenied`.
        pub fn deny(&self, reason: impl Into<String>) {
            *self.denied.lock() = Some(reason.into());
        }

        /// Number of fetches performed.
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Default for StaticCredentialProvider {
        fn default() -> Self {
            Self::new("apiVersion: v1\nkind: Config\n")
        }
    }

    #[async_trait]
    impl CredentialProvider for StaticCredentialProvider {
        async fn get_cluster_credential(
            &self,
            _credential_ref: &CredentialRef,
        ) -> Result<ClusterCredential> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(reason) = self.denied.lock().clone() {
                return Err(CredentialError::AccessDenied(reason));
            }

            Ok(ClusterCredential::new(self.kubeconfig.clone()))
        }
    }
}
