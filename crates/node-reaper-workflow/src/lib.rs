//! Decommission workflow for node-reaper.
//!
//! This crate ties the other node-reaper crates together. When an instance is
//! terminated, [`DecommissionWorkflow`] removes the matching node from the
//! Kubernetes cluster so that its workloads are rescheduled cleanly and no
//! stale registration is left behind.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │           HTTP service (routes) / SNS notification          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  DecommissionRequest
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   DecommissionWorkflow                       │
//! │  Resolving ─▶ AcquiringCredential ─▶ Evacuating ─▶ Removing  │
//! └─────────────────────────────────────────────────────────────┘
//!          │                   │                      │
//!          ▼                   ▼                      ▼
//!   ┌─────────────┐   ┌──────────────────┐   ┌────────────────┐
//!   │  Inventory  │   │   Credentials    │   │    Cluster     │
//!   │  Resolver   │   │  (scoped file)   │   │   (kube-rs)    │
//!   └─────────────┘   └──────────────────┘   └────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use node_reaper_cluster::{ClusterConfig, KubeClusterControl};
//! use node_reaper_core::InstanceId;
//! use node_reaper_credentials::{CredentialConfig, HttpSecretProvider};
//! use node_reaper_inventory::{HttpInventoryResolver, InventoryConfig};
//! use node_reaper_workflow::{DecommissionRequest, DecommissionWorkflow, WorkflowConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = DecommissionWorkflow::new(
//!     Arc::new(HttpInventoryResolver::new(&InventoryConfig::default())?),
//!     Arc::new(HttpSecretProvider::new(&CredentialConfig::default())?),
//!     Arc::new(KubeClusterControl::new(ClusterConfig::default())),
//!     WorkflowConfig::default(),
//! );
//!
//! let request = DecommissionRequest::new(InstanceId::new("i-0abc123")?);
//! let result = workflow.decommission(request).await;
//! println!("{}: {}", result.status_code, result.message);
//! # Ok(())
//! # }
//! ```
//!
//! # Ordering
//!
//! - Nothing touches the cluster until the node name and credential are known.
//! - The node registration is only deleted after a successful drain.
//! - The credential file is deleted on every path once it exists.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod event;
pub mod routes;
pub mod stage;
pub mod types;
pub mod workflow;

pub use config::{ConfigError, ServiceConfig, WorkflowConfig};
pub use error::{DecommissionError, Result};
pub use event::{parse_notification, EventError, Notification};
pub use routes::{create_router, AppState};
pub use stage::Stage;
pub use types::{
    DecommissionRequest, DecommissionResult, DecommissionStatus, FailureDetail, FailureKind,
};
pub use workflow::DecommissionWorkflow;
