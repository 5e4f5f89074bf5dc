//! Kubernetes cluster control implementation.
//!
//! This module provides the `KubeClusterControl` which drains and deregisters
//! nodes through the Kubernetes API using kube-rs. Every call builds its own
//! client from the credential it is handed; nothing is cached between calls.

use async_trait::async_trait;
use futures::future::try_join_all;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, DeleteParams, EvictParams, ListParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::wait::{await_condition, conditions};
use kube::{Client, Config};
use node_reaper_core::NodeName;
use node_reaper_credentials::MaterializedCredential;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::drain::{describe_blocked, plan_evacuation, PodRef};
use crate::types::{ClusterConfig, EvacuationOptions};
use crate::{ClusterError, Result};

/// The `ClusterControl` trait defines the node decommission operations.
///
/// Both operations are single blocking calls parameterized by an explicit
/// target and credential.
#[async_trait]
pub trait ClusterControl: Send + Sync {
    /// Cordon the node and evict its workloads, waiting until they are gone.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::Evacuation` if a pod blocks the drain or the API
    /// rejects a request, and `ClusterError::EvacuationTimeout` if the drain
    /// outlasts `options.timeout`.
    async fn evacuate_node(
        &self,
        node: &NodeName,
        credential: &MaterializedCredential,
        options: &EvacuationOptions,
    ) -> Result<()>;

    /// Delete the node's registration from the control plane.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::NodeNotFound` if the node is not registered, and
    /// `ClusterError::Removal` if the deletion fails.
    async fn remove_node_registration(
        &self,
        node: &NodeName,
        credential: &MaterializedCredential,
    ) -> Result<()>;
}

/// Kubernetes-based cluster control.
#[derive(Debug, Clone, Default)]
pub struct KubeClusterControl {
    config: ClusterConfig,
}

impl KubeClusterControl {
    /// Create a new cluster control with the given client configuration.
    #[must_use]
    pub const fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Build a client from the kubeconfig file held by `credential`.
    async fn client_for(&self, credential: &MaterializedCredential) -> Result<Client> {
        let kubeconfig = Kubeconfig::read_from(credential.path())
            .map_err(|e| ClusterError::Client(format!("failed to read kubeconfig: {e}")))?;

        let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| ClusterError::Client(format!("failed to load kubeconfig: {e}")))?;
        config.connect_timeout = Some(self.config.connect_timeout());
        config.read_timeout = Some(self.config.read_timeout());

        Client::try_from(config)
            .map_err(|e| ClusterError::Client(format!("failed to create client: {e}")))
    }

    /// Mark the node unschedulable.
    ///
    /// Returns `false` if the node is not registered.
    async fn cordon(nodes: &Api<Node>, node: &NodeName) -> Result<bool> {
        let patch = json!({ "spec": { "unschedulable": true } });

        match nodes
            .patch(node.as_str(), &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => {
                info!(node = %node, "Cordoned node");
                Ok(true)
            }
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(false),
            Err(e) => Err(ClusterError::Evacuation {
                node: node.clone(),
                cause: format!("failed to cordon: {e}"),
            }),
        }
    }

    async fn drain(
        client: Client,
        node: &NodeName,
        options: &EvacuationOptions,
    ) -> Result<()> {
        let nodes: Api<Node> = Api::all(client.clone());
        if !Self::cordon(&nodes, node).await? {
            warn!(node = %node, "Node not registered, nothing to cordon");
        }

        let all_pods: Api<Pod> = Api::all(client.clone());
        let params = ListParams::default().fields(&format!("spec.nodeName={node}"));
        let pod_list = all_pods
            .list(&params)
            .await
            .map_err(|e| ClusterError::Evacuation {
                node: node.clone(),
                cause: format!("failed to list pods: {e}"),
            })?;

        let plan = plan_evacuation(&pod_list.items, options).map_err(|blocked| {
            ClusterError::Evacuation {
                node: node.clone(),
                cause: format!(
                    "cannot evict {} pod(s): {}",
                    blocked.len(),
                    describe_blocked(&blocked)
                ),
            }
        })?;

        info!(
            node = %node,
            evict = plan.evict.len(),
            skipped = plan.skipped.len(),
            "Evacuating node"
        );

        let evict_params = EvictParams {
            delete_options: options.grace_period_seconds.map(|secs| DeleteParams {
                grace_period_seconds: Some(secs),
                ..DeleteParams::default()
            }),
            ..EvictParams::default()
        };

        try_join_all(plan.evict.iter().map(|pod| {
            let pods: Api<Pod> = Api::namespaced(client.clone(), &pod.namespace);
            let evict_params = &evict_params;
            async move {
                Self::evict_pod(&pods, pod, evict_params, options).await?;
                Self::wait_for_deletion(pods, pod).await
            }
        }))
        .await
        .map_err(|cause| ClusterError::Evacuation {
            node: node.clone(),
            cause,
        })?;

        info!(node = %node, evicted = plan.evict.len(), "Node drained");
        Ok(())
    }

    /// Evict one pod, retrying while a disruption budget refuses it.
    async fn evict_pod(
        pods: &Api<Pod>,
        pod: &PodRef,
        params: &EvictParams,
        options: &EvacuationOptions,
    ) -> std::result::Result<(), String> {
        loop {
            match pods.evict(&pod.name, params).await {
                Ok(_) => {
                    debug!(pod = %pod, "Evicted pod");
                    return Ok(());
                }
                Err(kube::Error::Api(e)) if e.code == 404 => {
                    debug!(pod = %pod, "Pod already gone");
                    return Ok(());
                }
                Err(kube::Error::Api(e)) if e.code == 429 => {
                    debug!(
                        pod = %pod,
                        message = %e.message,
                        "Eviction refused by disruption budget, retrying"
                    );
                    tokio::time::sleep(options.eviction_retry_interval).await;
                }
                Err(e) => return Err(format!("failed to evict pod {pod}: {e}")),
            }
        }
    }

    /// Wait until the evicted pod object is deleted.
    async fn wait_for_deletion(pods: Api<Pod>, pod: &PodRef) -> std::result::Result<(), String> {
        let Some(uid) = pod.uid.as_deref() else {
            return Ok(());
        };

        await_condition(pods, &pod.name, conditions::is_deleted(uid))
            .await
            .map(|_| ())
            .map_err(|e| format!("failed waiting for pod {pod} to terminate: {e}"))
    }
}

#[async_trait]
impl ClusterControl for KubeClusterControl {
    async fn evacuate_node(
        &self,
        node: &NodeName,
        credential: &MaterializedCredential,
        options: &EvacuationOptions,
    ) -> Result<()> {
        let client = self.client_for(credential).await?;

        let drain = Self::drain(client, node, options);

        if let Ok(result) = tokio::time::timeout(options.timeout, drain).await {
            result
        } else {
            warn!(
                node = %node,
                timeout_secs = options.timeout.as_secs(),
                "Evacuation timed out"
            );
            Err(ClusterError::EvacuationTimeout {
                node: node.clone(),
                timeout: options.timeout,
            })
        }
    }

    async fn remove_node_registration(
        &self,
        node: &NodeName,
        credential: &MaterializedCredential,
    ) -> Result<()> {
        let client = self.client_for(credential).await?;
        let nodes: Api<Node> = Api::all(client);

        match nodes.delete(node.as_str(), &DeleteParams::default()).await {
            Ok(_) => {
                info!(node = %node, "Deleted node registration");
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 404 => {
                warn!(node = %node, "Node not found, already deregistered");
                Err(ClusterError::NodeNotFound(node.clone()))
            }
            Err(e) => Err(ClusterError::Removal {
                node: node.clone(),
                cause: e.to_string(),
            }),
        }
    }
}

/// A mock cluster for testing without a real Kubernetes cluster.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::time::Duration;

    /// A failure to inject into `evacuate_node`.
    #[derive(Debug, Clone)]
    pub enum EvacuationFault {
        /// The drain times out after the given duration.
        Timeout(Duration),
        /// The drain fails with the given cause.
        Failed(String),
    }

    /// A mock cluster that tracks registered nodes in memory.
    #[derive(Default)]
    pub struct MockClusterControl {
        registered: Mutex<HashSet<NodeName>>,
        evacuation_fault: Mutex<Option<EvacuationFault>>,
        removal_fault: Mutex<Option<String>>,
        evacuations: Mutex<Vec<NodeName>>,
        removals: Mutex<Vec<NodeName>>,
        credential_paths: Mutex<Vec<PathBuf>>,
    }

    impl MockClusterControl {
        /// Create a new mock cluster with no nodes.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a node.
        ///
        /// # Panics
        ///
        /// Panics if `name` is not a valid node name.
        #[must_use]
        pub fn with_node(self, name: &str) -> Self {
            self.registered
                .lock()
                .insert(NodeName::new(name).expect("valid node name"));
            self
        }

        /// Make every evacuation fail.
        pub fn fail_evacuation(&self, fault: EvacuationFault) {
            *self.evacuation_fault.lock() = Some(fault);
        }

        /// Make every removal fail with the given cause.
        pub fn fail_removal(&self, cause: impl Into<String>) {
            *self.removal_fault.lock() = Some(cause.into());
        }

        /// Check whether a node is still registered.
        #[must_use]
        pub fn is_registered(&self, name: &str) -> bool {
            self.registered
                .lock()
                .iter()
                .any(|n| n.as_str() == name)
        }

        /// Nodes passed to `evacuate_node`, in call order.
        #[must_use]
        pub fn evacuations(&self) -> Vec<NodeName> {
            self.evacuations.lock().clone()
        }

        /// Nodes passed to `remove_node_registration`, in call order.
        #[must_use]
        pub fn removals(&self) -> Vec<NodeName> {
            self.removals.lock().clone()
        }

        /// Credential file paths seen by any call.
        #[must_use]
        pub fn credential_paths(&self) -> Vec<PathBuf> {
            self.credential_paths.lock().clone()
        }

        fn check_credential(&self, credential: &MaterializedCredential) -> Result<()> {
            let path = credential.path().to_path_buf();
            let exists = path.exists();
            self.credential_paths.lock().push(path);
            if exists {
                Ok(())
            } else {
                Err(ClusterError::Client("kubeconfig file missing".to_string()))
            }
        }
    }

    #[async_trait]
    impl ClusterControl for MockClusterControl {
        async fn evacuate_node(
            &self,
            node: &NodeName,
            credential: &MaterializedCredential,
            _options: &EvacuationOptions,
        ) -> Result<()> {
            self.evacuations.lock().push(node.clone());
            self.check_credential(credential)?;

            match self.evacuation_fault.lock().clone() {
                Some(EvacuationFault::Timeout(timeout)) => Err(ClusterError::EvacuationTimeout {
                    node: node.clone(),
                    timeout,
                }),
                Some(EvacuationFault::Failed(cause)) => Err(ClusterError::Evacuation {
                    node: node.clone(),
                    cause,
                }),
                None => Ok(()),
            }
        }

        async fn remove_node_registration(
            &self,
            node: &NodeName,
            credential: &MaterializedCredential,
        ) -> Result<()> {
            self.removals.lock().push(node.clone());
            self.check_credential(credential)?;

            if let Some(cause) = self.removal_fault.lock().clone() {
                return Err(ClusterError::Removal {
                    node: node.clone(),
                    cause,
                });
            }

            if self.registered.lock().remove(node) {
                Ok(())
            } else {
                Err(ClusterError::NodeNotFound(node.clone()))
            }
        }
    }
}
