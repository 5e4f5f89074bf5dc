//! Request and result types for the decommission workflow.
//!
//! These types define the contract with whatever triggers a run, whether an
//! HTTP caller or a termination notification.

use chrono::{DateTime, Utc};
use node_reaper_core::{InstanceId, InvocationId, NodeName};
use serde::{Deserialize, Serialize};

use crate::error::DecommissionError;
use crate::stage::Stage;

/// Request to decommission the node backing a terminating instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecommissionRequest {
    /// The instance being terminated.
    pub instance_id: InstanceId,
    /// Correlation id echoed in the result and in every log line.
    pub invocation_id: InvocationId,
}

impl DecommissionRequest {
    /// Create a request with a freshly generated invocation id.
    #[must_use]
    pub fn new(instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            invocation_id: InvocationId::generate(),
        }
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecommissionStatus {
    /// The node was drained and deregistered.
    Success,
    /// The run stopped at some step.
    Failure,
}

impl DecommissionStatus {
    /// The numeric status code reported alongside the status.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Success => 200,
            Self::Failure => 500,
        }
    }
}

/// The step a failed run stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The instance could not be mapped to a node.
    Resolution,
    /// The cluster credential was unavailable.
    Credential,
    /// The node could not be drained.
    Evacuation,
    /// The node registration could not be deleted.
    Removal,
}

/// Structured information about a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Which step failed.
    pub kind: FailureKind,
    /// The underlying cause as reported by the failing collaborator.
    pub cause: String,
    /// Whether re-running later might succeed.
    pub retriable: bool,
}

/// The outcome of one decommission run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecommissionResult {
    /// Success or failure.
    pub status: DecommissionStatus,
    /// 200 on success, 500 on failure.
    pub status_code: u16,
    /// Human-readable description naming the node or instance involved.
    pub message: String,
    /// Correlation id of the run.
    pub invocation_id: InvocationId,
    /// The instance that was being terminated.
    pub instance_id: InstanceId,
    /// The resolved node name, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<NodeName>,
    /// The stage the run ended in.
    pub stage: Stage,
    /// Failure details; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<FailureDetail>,
    /// When the run finished.
    pub completed_at: DateTime<Utc>,
}

impl DecommissionResult {
    /// Build a successful result for `node`.
    #[must_use]
    pub fn success(request: &DecommissionRequest, node: NodeName, message: String) -> Self {
        Self {
            status: DecommissionStatus::Success,
            status_code: DecommissionStatus::Success.code(),
            message,
            invocation_id: request.invocation_id,
            instance_id: request.instance_id.clone(),
            node_name: Some(node),
            stage: Stage::Completed,
            detail: None,
            completed_at: Utc::now(),
        }
    }

    /// Build a failed result from the error that ended the run.
    #[must_use]
    pub fn failure(request: &DecommissionRequest, error: &DecommissionError) -> Self {
        Self {
            status: DecommissionStatus::Failure,
            status_code: DecommissionStatus::Failure.code(),
            message: error.to_string(),
            invocation_id: request.invocation_id,
            instance_id: request.instance_id.clone(),
            node_name: error.node().cloned(),
            stage: error.stage(),
            detail: Some(FailureDetail {
                kind: error.kind(),
                cause: error.cause(),
                retriable: error.is_retriable(),
            }),
            completed_at: Utc::now(),
        }
    }

    /// Build a failed result for a run that was aborted by a panic in `stage`.
    ///
    /// Such faults are not retried.
    #[must_use]
    pub fn fault(
        request: &DecommissionRequest,
        stage: Stage,
        node: Option<NodeName>,
        cause: &str,
    ) -> Self {
        let target = match &node {
            Some(node) => format!("node {node} (instance {})", request.instance_id),
            None => format!("instance {}", request.instance_id),
        };
        Self {
            status: DecommissionStatus::Failure,
            status_code: DecommissionStatus::Failure.code(),
            message: format!("unexpected fault while {stage} {target}: {cause}"),
            invocation_id: request.invocation_id,
            instance_id: request.instance_id.clone(),
            node_name: node,
            stage,
            detail: Some(FailureDetail {
                kind: stage.failure_kind(),
                cause: cause.to_string(),
                retriable: false,
            }),
            completed_at: Utc::now(),
        }
    }

    /// Returns true if the node was removed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == DecommissionStatus::Success
    }

    /// The failure category, if the run failed.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.detail.as_ref().map(|d| d.kind)
    }
}

#[cfg(test)]
mod tests {
    use node_reaper_cluster::ClusterError;
    use node_reaper_inventory::InventoryError;

    use super::*;

    fn request() -> DecommissionRequest {
        DecommissionRequest::new(InstanceId::new("i-0abc123").unwrap())
    }

    #[test]
    fn status_codes() {
        assert_eq!(DecommissionStatus::Success.code(), 200);
        assert_eq!(DecommissionStatus::Failure.code(), 500);
    }

    #[test]
    fn success_result_serializes_without_detail() {
        let request = request();
        let result = DecommissionResult::success(
            &request,
            NodeName::new("node-abc").unwrap(),
            "done".to_string(),
        );
        assert!(result.is_success());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["status_code"], 200);
        assert_eq!(json["node_name"], "node-abc");
        assert_eq!(json["stage"], "completed");
        assert_eq!(json["instance_id"], "i-0abc123");
        assert_eq!(json["invocation_id"], request.invocation_id.to_string());
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn failure_result_carries_detail() {
        let request = request();
        let error = DecommissionError::Resolution {
            instance_id: request.instance_id.clone(),
            source: InventoryError::Transient("connection refused".into()),
        };
        let result = DecommissionResult::failure(&request, &error);
        assert!(!result.is_success());
        assert_eq!(result.status_code, 500);
        assert_eq!(result.failure_kind(), Some(FailureKind::Resolution));
        assert!(result.node_name.is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["stage"], "resolving");
        assert_eq!(json["detail"]["kind"], "resolution");
        assert_eq!(json["detail"]["retriable"], true);
        assert!(json.get("node_name").is_none());
    }

    #[test]
    fn failure_after_resolution_reports_node() {
        let request = request();
        let node = NodeName::new("node-abc").unwrap();
        let error = DecommissionError::Removal {
            instance_id: request.instance_id.clone(),
            node: node.clone(),
            source: ClusterError::Removal {
                node: node.clone(),
                cause: "forbidden".into(),
            },
        };
        let result = DecommissionResult::failure(&request, &error);
        assert_eq!(result.node_name, Some(node));
        assert_eq!(result.stage, Stage::Removing);
        assert!(result.message.contains("node-abc"));
        assert!(result.message.contains("forbidden"));
    }

    #[test]
    fn fault_result_names_stage_and_node() {
        let request = request();
        let node = NodeName::new("node-abc").unwrap();
        let result =
            DecommissionResult::fault(&request, Stage::Evacuating, Some(node.clone()), "boom");
        assert_eq!(result.status, DecommissionStatus::Failure);
        assert_eq!(result.status_code, 500);
        assert_eq!(result.node_name, Some(node));
        assert_eq!(result.failure_kind(), Some(FailureKind::Evacuation));
        assert_eq!(
            result.message,
            "unexpected fault while evacuating node node-abc (instance i-0abc123): boom"
        );
        let detail = result.detail.unwrap();
        assert_eq!(detail.cause, "boom");
        assert!(!detail.retriable);
    }
}
