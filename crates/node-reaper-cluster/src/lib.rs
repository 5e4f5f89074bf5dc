//! Kubernetes node drain and deregistration for node-reaper.
//!
//! This crate provides the [`ClusterControl`] trait and [`KubeClusterControl`]
//! implementation for taking a node out of a Kubernetes cluster. It handles:
//!
//! - Cordoning the node so nothing new is scheduled on it
//! - Planning which pods to evict, skip, or refuse ([`drain`])
//! - Evicting pods through the Eviction API, honouring disruption budgets
//! - Deleting the node's registration
//!
//! Every operation takes the target node and a scoped credential explicitly;
//! the client keeps no session between calls.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Decommission Workflow                        │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │  (node, credential)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     KubeClusterControl                           │
//! │  ┌─────────────┐ ┌─────────────────┐ ┌─────────────────────┐   │
//! │  │  Cordon     │ │  Plan + Evict   │ │  Delete Node        │   │
//! │  └─────────────┘ └─────────────────┘ └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Kubernetes API Server                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use node_reaper_cluster::{ClusterConfig, ClusterControl, EvacuationOptions, KubeClusterControl};
//! use node_reaper_core::NodeName;
//! use node_reaper_credentials::ClusterCredential;
//!
//! # async fn example(kubeconfig: String) -> Result<(), Box<dyn std::error::Error>> {
//! let control = KubeClusterControl::new(ClusterConfig::default());
//! let node = NodeName::new("ip-10-0-1-23.ec2.internal")?;
//! let credential = ClusterCredential::new(kubeconfig).materialize(None)?;
//!
//! control
//!     .evacuate_node(&node, &credential, &EvacuationOptions::policy())
//!     .await?;
//! control.remove_node_registration(&node, &credential).await?;
//!
//! credential.release()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! For testing without a real Kubernetes cluster, enable the `test-utils` feature
//! and use [`MockClusterControl`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod drain;
pub mod error;
pub mod k8s;
pub mod types;

pub use error::{ClusterError, Result};
pub use k8s::{ClusterControl, KubeClusterControl};
pub use types::{ClusterConfig, EvacuationOptions, PodPhase};

#[cfg(any(test, feature = "test-utils"))]
pub use k8s::mock::{EvacuationFault, MockClusterControl};
