//! Core types for node-reaper.
//!
//! This crate provides the identifier types shared by every node-reaper crate:
//!
//! - **Instances**: [`InstanceId`], the opaque id carried by a termination notification
//! - **Nodes**: [`NodeName`], the cluster-internal name resolved for an instance
//! - **Credentials**: [`CredentialRef`], the configured secret holding cluster access
//! - **Invocations**: [`InvocationId`], a per-request correlation id for logs
//!
//! # Example
//!
//! ```
//! use node_reaper_core::{InstanceId, InvocationId, NodeName};
//!
//! let instance_id = InstanceId::new("i-0abc123").unwrap();
//! let node = NodeName::new("ip-10-0-1-23.ec2.internal").unwrap();
//! let invocation_id = InvocationId::generate();
//! # let _ = (instance_id, node, invocation_id);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;

pub use ids::{CredentialRef, IdError, InstanceId, InvocationId, NodeName};
