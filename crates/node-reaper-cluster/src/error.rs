//! Error types for the cluster crate.

use std::time::Duration;

use node_reaper_core::NodeName;
use thiserror::Error;

/// Errors that can occur during cluster operations.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// The kubeconfig could not be turned into a working client.
    #[error("cluster client error: {0}")]
    Client(String),

    /// A cluster setting is invalid.
    #[error("invalid cluster configuration: {0}")]
    Config(String),

    /// The node is not registered in the cluster.
    #[error("node {0} not found")]
    NodeNotFound(NodeName),

    /// Draining workloads from the node failed.
    #[error("evacuation of node {node} failed: {cause}")]
    Evacuation {
        /// The node being drained.
        node: NodeName,
        /// What went wrong.
        cause: String,
    },

    /// Draining did not finish within the configured timeout.
    #[error("evacuation of node {node} timed out after {}s", timeout.as_secs())]
    EvacuationTimeout {
        /// The node being drained.
        node: NodeName,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Deleting the node registration failed.
    #[error("removal of node {node} failed: {cause}")]
    Removal {
        /// The node being removed.
        node: NodeName,
        /// What went wrong.
        cause: String,
    },
}

impl ClusterError {
    /// Check if this error means the node is already absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound(_))
    }

    /// Check if this error is retriable.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Evacuation { .. } | Self::EvacuationTimeout { .. } | Self::Removal { .. }
        )
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::NodeNotFound(_) => 404,
            Self::EvacuationTimeout { .. } => 504,
            Self::Client(_) | Self::Config(_) | Self::Evacuation { .. } | Self::Removal { .. } => {
                500
            }
        }
    }
}

/// A specialized Result type for cluster operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> NodeName {
        NodeName::new("node-xyz").unwrap()
    }

    #[test]
    fn not_found_classification() {
        assert!(ClusterError::NodeNotFound(node()).is_not_found());
        assert!(!ClusterError::Removal {
            node: node(),
            cause: "boom".into()
        }
        .is_not_found());
    }

    #[test]
    fn timeout_message_names_node() {
        let err = ClusterError::EvacuationTimeout {
            node: node(),
            timeout: Duration::from_secs(300),
        };
        assert_eq!(
            err.to_string(),
            "evacuation of node node-xyz timed out after 300s"
        );
        assert!(err.is_retriable());
        assert_eq!(err.http_status_code(), 504);
    }

    #[test]
    fn client_errors_are_not_retriable() {
        let err = ClusterError::Client("bad kubeconfig".into());
        assert!(!err.is_retriable());
        assert_eq!(err.http_status_code(), 500);

        let err = ClusterError::Config("bad grace period".into());
        assert!(!err.is_retriable());
        assert_eq!(err.http_status_code(), 500);
    }
}
