//! Error types for the decommission workflow.
//!
//! Each variant names the step that failed and keeps the collaborator's error
//! as its source. Errors never escape the workflow; they are folded into a
//! [`DecommissionResult`](crate::DecommissionResult) at its boundary.

use node_reaper_cluster::ClusterError;
use node_reaper_core::{InstanceId, NodeName};
use node_reaper_credentials::CredentialError;
use node_reaper_inventory::InventoryError;
use thiserror::Error;

use crate::stage::Stage;
use crate::types::FailureKind;

/// A result type using `DecommissionError`.
pub type Result<T> = std::result::Result<T, DecommissionError>;

/// Errors that can end a decommission run.
#[derive(Debug, Error)]
pub enum DecommissionError {
    /// The instance could not be mapped to a node name.
    #[error("failed to resolve node name for instance {instance_id}: {source}")]
    Resolution {
        /// The instance being decommissioned.
        instance_id: InstanceId,
        /// The inventory failure.
        source: InventoryError,
    },

    /// The cluster credential could not be fetched or materialized.
    #[error("failed to obtain cluster credential for node {node} (instance {instance_id}): {source}")]
    Credential {
        /// The instance being decommissioned.
        instance_id: InstanceId,
        /// The resolved node name.
        node: NodeName,
        /// The credential failure.
        source: CredentialError,
    },

    /// Draining the node failed. The node registration is left in place.
    #[error("error draining node {node} (instance {instance_id}): {source}")]
    Evacuation {
        /// The instance being decommissioned.
        instance_id: InstanceId,
        /// The node being drained.
        node: NodeName,
        /// The cluster failure.
        source: ClusterError,
    },

    /// Deleting the node registration failed.
    #[error("error deleting node {node} (instance {instance_id}): {source}")]
    Removal {
        /// The instance being decommissioned.
        instance_id: InstanceId,
        /// The node being removed.
        node: NodeName,
        /// The cluster failure.
        source: ClusterError,
    },
}

impl DecommissionError {
    /// The category reported in the result detail.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.stage().failure_kind()
    }

    /// The stage the workflow was in when this error occurred.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Resolution { .. } => Stage::Resolving,
            Self::Credential { .. } => Stage::AcquiringCredential,
            Self::Evacuation { .. } => Stage::Evacuating,
            Self::Removal { .. } => Stage::Removing,
        }
    }

    /// The node name, if resolution got that far.
    #[must_use]
    pub const fn node(&self) -> Option<&NodeName> {
        match self {
            Self::Resolution { .. } => None,
            Self::Credential { node, .. }
            | Self::Evacuation { node, .. }
            | Self::Removal { node, .. } => Some(node),
        }
    }

    /// A description of the underlying cause without the workflow context.
    #[must_use]
    pub fn cause(&self) -> String {
        match self {
            Self::Resolution { source, .. } => source.to_string(),
            Self::Credential { source, .. } => source.to_string(),
            Self::Evacuation { source, .. } | Self::Removal { source, .. } => source.to_string(),
        }
    }

    /// Returns true if re-running the workflow later might succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Resolution { source, .. } => source.is_retriable(),
            Self::Credential { source, .. } => source.is_retriable(),
            Self::Evacuation { source, .. } | Self::Removal { source, .. } => {
                source.is_retriable()
            }
        }
    }

    /// Returns the HTTP status code of the underlying failure.
    ///
    /// The decommission result itself always reports 500 on failure; this is
    /// the finer-grained code for logs and diagnostics.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Resolution { source, .. } => source.http_status_code(),
            Self::Credential { source, .. } => source.http_status_code(),
            Self::Evacuation { source, .. } | Self::Removal { source, .. } => {
                source.http_status_code()
            }
        }
    }
}
