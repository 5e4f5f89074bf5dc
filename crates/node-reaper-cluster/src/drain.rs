//! Evacuation planning.
//!
//! Decides, pod by pod, what draining a node does with each workload. This is
//! pure logic over pod objects so it can be tested without a cluster; the
//! Kubernetes client in [`crate::k8s`] carries out the plan.

use std::fmt;

use k8s_openapi::api::core::v1::Pod;

use crate::types::{EvacuationOptions, PodPhase};

/// Annotation carried by static (mirror) pods managed directly by the kubelet.
pub const MIRROR_POD_ANNOTATION: &str = "kubernetes.io/config.mirror";

/// A namespaced reference to a pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRef {
    /// Pod namespace.
    pub namespace: String,
    /// Pod name.
    pub name: String,
    /// Pod UID, used to tell a deleted pod from a recreated one.
    pub uid: Option<String>,
}

impl PodRef {
    /// Build a reference from a pod object.
    #[must_use]
    pub fn from_pod(pod: &Pod) -> Self {
        Self {
            namespace: pod
                .metadata
                .namespace
                .clone()
                .unwrap_or_else(|| "default".to_string()),
            name: pod.metadata.name.clone().unwrap_or_default(),
            uid: pod.metadata.uid.clone(),
        }
    }
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Why a pod prevents the node from being drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// Managed by a DaemonSet and DaemonSets are not ignored.
    DaemonSet,
    /// Not managed by any controller and eviction is not forced.
    Unmanaged,
    /// Uses `emptyDir` storage and its deletion is not allowed.
    LocalStorage,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DaemonSet => "managed by a DaemonSet",
            Self::Unmanaged => "not managed by a controller",
            Self::LocalStorage => "uses emptyDir local storage",
        })
    }
}

/// What the drain does with a single pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodDisposition {
    /// Evict the pod.
    Evict,
    /// Leave the pod alone: it is a kubelet mirror pod.
    SkipMirror,
    /// Leave the pod alone: it belongs to a DaemonSet.
    SkipDaemonSet,
    /// The pod blocks the drain.
    Blocked(BlockReason),
}

/// A pod that blocks the drain, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedPod {
    /// The blocking pod.
    pub pod: PodRef,
    /// Why it blocks.
    pub reason: BlockReason,
}

/// The pods a drain will evict and the ones it leaves in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvacuationPlan {
    /// Pods to evict.
    pub evict: Vec<PodRef>,
    /// Pods left running on the node.
    pub skipped: Vec<PodRef>,
}

/// Classify one pod under the given options.
#[must_use]
pub fn classify_pod(pod: &Pod, options: &EvacuationOptions) -> PodDisposition {
    let is_mirror = pod
        .metadata
        .annotations
        .as_ref()
        .is_some_and(|a| a.contains_key(MIRROR_POD_ANNOTATION));
    if is_mirror {
        return PodDisposition::SkipMirror;
    }

    // Finished pods hold no workload; evicting them never disrupts anything.
    let phase = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(PodPhase::from_k8s_phase)
        .unwrap_or_default();
    if phase.is_terminal() {
        return PodDisposition::Evict;
    }

    let controller = pod
        .metadata
        .owner_references
        .as_ref()
        .and_then(|refs| refs.iter().find(|r| r.controller == Some(true)));

    match controller {
        Some(owner) if owner.kind == "DaemonSet" => {
            return if options.ignore_daemon_sets {
                PodDisposition::SkipDaemonSet
            } else {
                PodDisposition::Blocked(BlockReason::DaemonSet)
            };
        }
        None if !options.force => return PodDisposition::Blocked(BlockReason::Unmanaged),
        _ => {}
    }

    let uses_empty_dir = pod
        .spec
        .as_ref()
        .and_then(|s| s.volumes.as_ref())
        .is_some_and(|volumes| volumes.iter().any(|v| v.empty_dir.is_some()));
    if uses_empty_dir && !options.delete_emptydir_data {
        return PodDisposition::Blocked(BlockReason::LocalStorage);
    }

    PodDisposition::Evict
}

/// Plan the drain of a node from the pods currently bound to it.
///
/// # Errors
///
/// Returns every pod that blocks the drain under `options`.
pub fn plan_evacuation(
    pods: &[Pod],
    options: &EvacuationOptions,
) -> Result<EvacuationPlan, Vec<BlockedPod>> {
    let mut plan = EvacuationPlan::default();
    let mut blocked = Vec::new();

    for pod in pods {
        let pod_ref = PodRef::from_pod(pod);
        match classify_pod(pod, options) {
            PodDisposition::Evict => plan.evict.push(pod_ref),
            PodDisposition::SkipMirror | PodDisposition::SkipDaemonSet => {
                plan.skipped.push(pod_ref);
            }
            PodDisposition::Blocked(reason) => blocked.push(BlockedPod {
                pod: pod_ref,
                reason,
            }),
        }
    }

    if blocked.is_empty() {
        Ok(plan)
    } else {
        Err(blocked)
    }
}

/// Render blocking pods for an error message.
#[must_use]
pub fn describe_blocked(blocked: &[BlockedPod]) -> String {
    blocked
        .iter()
        .map(|b| format!("{} ({})", b.pod, b.reason))
        .collect::<Vec<_>>()
        .join(", ")
}
