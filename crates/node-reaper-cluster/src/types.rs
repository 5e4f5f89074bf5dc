//! Types for the cluster crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ClusterError, Result};

/// Phase of the pod lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PodPhase {
    /// Pod has been accepted but containers are not yet running.
    Pending,
    /// Pod is running with at least one container.
    Running,
    /// All containers terminated successfully.
    Succeeded,
    /// At least one container failed.
    Failed,
    /// Pod status cannot be determined.
    #[default]
    Unknown,
}

impl PodPhase {
    /// Parse a pod phase from a Kubernetes phase string.
    #[must_use]
    pub fn from_k8s_phase(phase: &str) -> Self {
        match phase {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// Check if the pod is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Policy options for draining a node.
///
/// The defaults are the decommission policy: skip DaemonSet pods, delete pods
/// that use `emptyDir` storage, and evict pods no controller will recreate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvacuationOptions {
    /// Leave DaemonSet-managed pods in place instead of blocking on them.
    pub ignore_daemon_sets: bool,
    /// Evict pods backed by `emptyDir` volumes, discarding their data.
    pub delete_emptydir_data: bool,
    /// Evict pods that are not managed by a controller.
    pub force: bool,
    /// Grace period override for evicted pods, in seconds.
    pub grace_period_seconds: Option<u32>,
    /// Upper bound for the whole drain.
    pub timeout: Duration,
    /// Delay between eviction attempts blocked by a disruption budget.
    pub eviction_retry_interval: Duration,
}

impl Default for EvacuationOptions {
    fn default() -> Self {
        Self::policy()
    }
}

impl EvacuationOptions {
    /// The fixed decommission policy.
    #[must_use]
    pub const fn policy() -> Self {
        Self {
            ignore_daemon_sets: true,
            delete_emptydir_data: true,
            force: true,
            grace_period_seconds: None,
            timeout: Duration::from_secs(300),
            eviction_retry_interval: Duration::from_secs(5),
        }
    }

    /// Load the tunable parts of the policy from environment variables.
    ///
    /// Supported environment variables:
    /// - `REAPER_DRAIN_TIMEOUT_SECS`: Upper bound for the drain
    /// - `REAPER_DRAIN_GRACE_PERIOD_SECS`: Grace period override for evicted pods
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::Config` if either variable is set but is not a
    /// non-negative whole number of seconds.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::policy();

        if let Some(val) = var("REAPER_DRAIN_TIMEOUT_SECS") {
            let secs = parse_seconds("REAPER_DRAIN_TIMEOUT_SECS", &val)?;
            options.timeout = Duration::from_secs(secs);
        }
        if let Some(val) = var("REAPER_DRAIN_GRACE_PERIOD_SECS") {
            options.grace_period_seconds =
                Some(parse_seconds("REAPER_DRAIN_GRACE_PERIOD_SECS", &val)?);
        }

        Ok(options)
    }
}

fn parse_seconds<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ClusterError::Config(format!(
            "{key} must be a non-negative number of seconds, got {value:?}"
        ))
    })
}

/// Configuration for the Kubernetes cluster client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Connection timeout for the API server, in seconds.
    pub connect_timeout_seconds: u64,
    /// Read timeout for API requests, in seconds.
    pub read_timeout_seconds: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 5,
            read_timeout_seconds: 30,
        }
    }
}

impl ClusterConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `REAPER_KUBE_CONNECT_TIMEOUT_SECS`: API server connection timeout
    /// - `REAPER_KUBE_READ_TIMEOUT_SECS`: API request read timeout
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("REAPER_KUBE_CONNECT_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                config.connect_timeout_seconds = n;
            }
        }
        if let Ok(val) = std::env::var("REAPER_KUBE_READ_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                config.read_timeout_seconds = n;
            }
        }

        config
    }

    /// Get the connection timeout as a `Duration`.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get the read timeout as a `Duration`.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds)
    }
}
