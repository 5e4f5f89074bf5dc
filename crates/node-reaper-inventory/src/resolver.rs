//! The inventory resolver interface.

use async_trait::async_trait;
use node_reaper_core::{InstanceId, NodeName};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The cluster-internal identity of an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// The private DNS name the instance registered with as a node.
    pub private_name: NodeName,
}

impl NodeIdentity {
    /// Create a new node identity.
    #[must_use]
    pub const fn new(private_name: NodeName) -> Self {
        Self { private_name }
    }
}

/// Maps instance identifiers to cluster node names.
///
/// This trait abstracts the inventory service, allowing for mock
/// implementations in tests.
#[async_trait]
pub trait InventoryResolver: Send + Sync {
    /// Resolve an instance to the name it is registered under in the cluster.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::NotFound` if the instance is unknown or has no
    /// private network name, and `InventoryError::Transient` if the lookup
    /// service is unavailable.
    async fn resolve_node_name(&self, instance_id: &InstanceId) -> Result<NodeIdentity>;
}

/// An in-memory inventory for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::InventoryError;

    /// An inventory backed by a fixed instance-to-node map.
    #[derive(Default)]
    pub struct StaticInventory {
        nodes: Mutex<HashMap<InstanceId, NodeName>>,
        unavailable: Mutex<Option<String>>,
        calls: AtomicUsize,
    }

    impl StaticInventory {
        /// Create an empty inventory.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Register an instance under the given node name.
        ///
        /// # Panics
        ///
        /// Panics if either identifier is invalid.
        #[must_use]
        pub fn with_node(self, instance_id: &str, node_name: &str) -> Self {
            self.nodes.lock().insert(
                InstanceId::new(instance_id).expect("valid instance id"),
                NodeName::new(node_name).expect("valid node name"),
            );
            self
        }

        /// Make every lookup fail with a transient error.
        pub fn set_unavailable(&self, reason: impl Into<String>) {
            *self.unavailable.lock() = Some(reason.into());
        }

        /// Number of lookups performed.
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InventoryResolver for StaticInventory {
        async fn resolve_node_name(&self, instance_id: &InstanceId) -> Result<NodeIdentity> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(reason) = self.unavailable.lock().clone() {
                return Err(InventoryError::Transient(reason));
            }

            self.nodes
                .lock()
                .get(instance_id)
                .cloned()
                .map(NodeIdentity::new)
                .ok_or_else(|| InventoryError::NotFound(instance_id.clone()))
        }
    }
}
