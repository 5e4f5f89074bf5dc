//! Inventory lookup error types.

use node_reaper_core::InstanceId;
use thiserror::Error;

/// A result type using `InventoryError`.
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Errors that can occur while resolving an instance to a node name.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The instance is unknown, or has no recorded private network name.
    #[error("instance {0} not found or has no private network name")]
    NotFound(InstanceId),

    /// The lookup service is unavailable or returned an unusable response.
    #[error("inventory lookup unavailable: {0}")]
    Transient(String),

    /// The inventory record exists but its node name is unusable.
    #[error("inventory record for instance {instance_id} is invalid: {reason}")]
    InvalidRecord {
        /// The instance that was looked up.
        instance_id: InstanceId,
        /// Why the record was rejected.
        reason: String,
    },

    /// The resolver is misconfigured.
    #[error("inventory configuration error: {0}")]
    Config(String),
}

impl InventoryError {
    /// Returns `true` if redelivering the request may succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Transient(_) => 503,
            Self::InvalidRecord { .. } => 502,
            Self::Config(_) => 500,
        }
    }
}
