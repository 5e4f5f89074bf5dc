//! Instance inventory lookup for node-reaper.
//!
//! Termination notifications identify the doomed machine by its instance id,
//! but the cluster knows it by its private DNS name. This crate provides the
//! [`InventoryResolver`] trait that maps one to the other, and an HTTP-backed
//! implementation, [`HttpInventoryResolver`], that asks the inventory service.
//!
//! # Example
//!
//! ```no_run
//! use node_reaper_core::InstanceId;
//! use node_reaper_inventory::{HttpInventoryResolver, InventoryConfig, InventoryResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InventoryConfig {
//!     base_url: "http://inventory.infra.svc:8080".to_string(),
//!     timeout_seconds: 10,
//! };
//! let resolver = HttpInventoryResolver::new(&config)?;
//!
//! let identity = resolver
//!     .resolve_node_name(&InstanceId::new("i-0abc123")?)
//!     .await?;
//! println!("node: {}", identity.private_name);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod resolver;

pub use client::HttpInventoryResolver;
pub use error::{InventoryError, Result};
pub use resolver::{InventoryResolver, NodeIdentity};

#[cfg(any(test, feature = "test-utils"))]
pub use resolver::mock::StaticInventory;

/// Configuration for the inventory service client.
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    /// Base URL of the inventory service (e.g., `http://inventory:8080`).
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://inventory.infra.svc:8080".to_string(),
            timeout_seconds: 10,
        }
    }
}
