//! The decommission workflow.
//!
//! [`DecommissionWorkflow`] takes the node backing a terminating instance out
//! of the cluster: resolve its node name, fetch a scoped credential, drain the
//! node, and delete its registration. Steps run strictly in order and the
//! first failure ends the run.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use node_reaper_cluster::ClusterControl;
use node_reaper_core::NodeName;
use node_reaper_credentials::{CredentialProvider, MaterializedCredential};
use node_reaper_inventory::InventoryResolver;
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::config::WorkflowConfig;
use crate::error::{DecommissionError, Result};
use crate::stage::Stage;
use crate::types::{DecommissionRequest, DecommissionResult};

/// How the removal step ended.
enum Removal {
    Deleted,
    AlreadyAbsent,
}

/// Where a run has got to. Outlives the run so a fault can be attributed.
struct Progress {
    stage: Mutex<Stage>,
    node: Mutex<Option<NodeName>>,
}

impl Progress {
    fn new() -> Self {
        Self {
            stage: Mutex::new(Stage::INITIAL),
            node: Mutex::new(None),
        }
    }

    fn stage(&self) -> Stage {
        *self.stage.lock()
    }

    fn node(&self) -> Option<NodeName> {
        self.node.lock().clone()
    }

    fn resolved(&self, node: &NodeName) {
        *self.node.lock() = Some(node.clone());
    }

    fn advance(&self) {
        let mut stage = self.stage.lock();
        if let Some(next) = stage.next() {
            debug!(from = %*stage, to = %next, "Entering stage");
            *stage = next;
        }
    }
}

/// Runs decommission requests against a set of collaborators.
pub struct DecommissionWorkflow {
    inventory: Arc<dyn InventoryResolver>,
    credentials: Arc<dyn CredentialProvider>,
    cluster: Arc<dyn ClusterControl>,
    config: WorkflowConfig,
}

impl DecommissionWorkflow {
    /// Create a new workflow.
    #[must_use]
    pub fn new(
        inventory: Arc<dyn InventoryResolver>,
        credentials: Arc<dyn CredentialProvider>,
        cluster: Arc<dyn ClusterControl>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            inventory,
            credentials,
            cluster,
            config,
        }
    }

    /// Decommission the node backing `request.instance_id`.
    ///
    /// Always returns a result; failures, including a panic in a
    /// collaborator, are reported in it rather than raised. The scoped
    /// credential is deleted before returning on every path that created it.
    #[instrument(
        skip_all,
        fields(
            invocation_id = %request.invocation_id,
            instance_id = %request.instance_id,
        )
    )]
    pub async fn decommission(&self, request: DecommissionRequest) -> DecommissionResult {
        info!("Starting node decommission");

        let progress = Progress::new();
        let outcome = AssertUnwindSafe(self.run(&request, &progress))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok((node, removal))) => {
                let message = match removal {
                    Removal::Deleted => format!(
                        "Node {node} successfully deregistered from the Kubernetes cluster."
                    ),
                    Removal::AlreadyAbsent => {
                        format!("Node {node} was already absent from the Kubernetes cluster.")
                    }
                };
                info!(node = %node, "Node decommissioned");
                DecommissionResult::success(&request, node, message)
            }
            Ok(Err(e)) => {
                error!(
                    stage = %e.stage(),
                    status = e.http_status_code(),
                    retriable = e.is_retriable(),
                    cluster_modified = e.stage().mutates_cluster(),
                    error = %e,
                    "Node decommission failed"
                );
                DecommissionResult::failure(&request, &e)
            }
            Err(payload) => {
                let stage = progress.stage();
                let cause = panic_message(payload.as_ref());
                error!(
                    stage = %stage,
                    cluster_modified = stage.mutates_cluster(),
                    cause = %cause,
                    "Node decommission aborted by an unexpected fault"
                );
                DecommissionResult::fault(&request, stage, progress.node(), &cause)
            }
        }
    }

    async fn run(
        &self,
        request: &DecommissionRequest,
        progress: &Progress,
    ) -> Result<(NodeName, Removal)> {
        let instance_id = &request.instance_id;

        let node = self
            .inventory
            .resolve_node_name(instance_id)
            .await
            .map_err(|source| DecommissionError::Resolution {
                instance_id: instance_id.clone(),
                source,
            })?
            .private_name;
        progress.resolved(&node);
        info!(node = %node, "Resolved instance to node");

        progress.advance();
        let credential = self.acquire_credential(request, &node).await?;

        let outcome = self.drain_and_remove(progress, request, &node, &credential).await;

        match credential.release() {
            Ok(()) => debug!(node = %node, "Released cluster credential"),
            Err(e) => warn!(node = %node, error = %e, "Failed to delete cluster credential"),
        }

        let removal = outcome?;
        progress.advance();
        Ok((node, removal))
    }

    async fn acquire_credential(
        &self,
        request: &DecommissionRequest,
        node: &NodeName,
    ) -> Result<MaterializedCredential> {
        let credential_error = |source| DecommissionError::Credential {
            instance_id: request.instance_id.clone(),
            node: node.clone(),
            source,
        };

        let credential = self
            .credentials
            .get_cluster_credential(&self.config.credential_ref)
            .await
            .map_err(credential_error)?
            .materialize(self.config.credential_dir.as_deref())
            .map_err(credential_error)?;

        debug!(
            node = %node,
            credential_ref = %self.config.credential_ref,
            "Materialized cluster credential"
        );
        Ok(credential)
    }

    async fn drain_and_remove(
        &self,
        progress: &Progress,
        request: &DecommissionRequest,
        node: &NodeName,
        credential: &MaterializedCredential,
    ) -> Result<Removal> {
        progress.advance();
        self.cluster
            .evacuate_node(node, credential, &self.config.evacuation)
            .await
            .map_err(|source| DecommissionError::Evacuation {
                instance_id: request.instance_id.clone(),
                node: node.clone(),
                source,
            })?;
        info!(node = %node, "Node evacuated");

        progress.advance();
        match self.cluster.remove_node_registration(node, credential).await {
            Ok(()) => Ok(Removal::Deleted),
            Err(e) if e.is_not_found() && self.config.treat_absent_node_as_removed => {
                info!(node = %node, "Node was already absent from the cluster");
                Ok(Removal::AlreadyAbsent)
            }
            Err(source) => Err(DecommissionError::Removal {
                instance_id: request.instance_id.clone(),
                node: node.clone(),
                source,
            }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with a non-string payload".to_string())
}
