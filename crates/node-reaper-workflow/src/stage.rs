//! Decommission stage machine.
//!
//! A run moves through its stages strictly in order and stops at the first
//! failure. The stage a run ended in is reported in its result.
//!
//! ```text
//!   Resolving ──▶ AcquiringCredential ──▶ Evacuating ──▶ Removing ──▶ Completed
//!       │                 │                    │             │
//!       └─────────────────┴────── failure ─────┴─────────────┘
//!                               (run ends here)
//! ```
//!
//! Only `Evacuating` and `Removing` touch the cluster, and `Removing` is never
//! entered unless `Evacuating` finished.

use serde::{Deserialize, Serialize};

use crate::types::FailureKind;

/// A step of the decommission workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Mapping the instance id to a node name.
    Resolving,
    /// Fetching and materializing the cluster credential.
    AcquiringCredential,
    /// Cordoning and draining the node.
    Evacuating,
    /// Deleting the node registration.
    Removing,
    /// The node is gone from the cluster.
    Completed,
}

impl Stage {
    /// The stage every run starts in.
    pub const INITIAL: Self = Self::Resolving;

    /// The stage that follows this one, or `None` once completed.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Resolving => Some(Self::AcquiringCredential),
            Self::AcquiringCredential => Some(Self::Evacuating),
            Self::Evacuating => Some(Self::Removing),
            Self::Removing => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Returns true if this stage makes changes to the cluster.
    #[must_use]
    pub const fn mutates_cluster(self) -> bool {
        matches!(self, Self::Evacuating | Self::Removing)
    }

    /// The failure category of a run that stopped in this stage.
    ///
    /// A run that has completed can only have been stopped by its removal step.
    #[must_use]
    pub const fn failure_kind(self) -> FailureKind {
        match self {
            Self::Resolving => FailureKind::Resolution,
            Self::AcquiringCredential => FailureKind::Credential,
            Self::Evacuating => FailureKind::Evacuation,
            Self::Removing | Self::Completed => FailureKind::Removal,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Resolving => "resolving",
            Self::AcquiringCredential => "acquiring_credential",
            Self::Evacuating => "evacuating",
            Self::Removing => "removing",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Stage; 5] = [
        Stage::Resolving,
        Stage::AcquiringCredential,
        Stage::Evacuating,
        Stage::Removing,
        Stage::Completed,
    ];

    #[test]
    fn stages_advance_in_order() {
        let mut stage = Stage::INITIAL;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            stage = next;
            visited.push(stage);
        }
        assert_eq!(visited, ALL);
        assert_eq!(stage, Stage::Completed);
    }

    #[test]
    fn failure_kind_follows_stage() {
        assert_eq!(Stage::Resolving.failure_kind(), FailureKind::Resolution);
        assert_eq!(
            Stage::AcquiringCredential.failure_kind(),
            FailureKind::Credential
        );
        assert_eq!(Stage::Evacuating.failure_kind(), FailureKind::Evacuation);
        assert_eq!(Stage::Removing.failure_kind(), FailureKind::Removal);
        assert_eq!(Stage::Completed.failure_kind(), FailureKind::Removal);
    }

    #[test]
    fn only_drain_and_delete_mutate_cluster() {
        let mutating: Vec<_> = ALL.into_iter().filter(|s| s.mutates_cluster()).collect();
        assert_eq!(mutating, vec![Stage::Evacuating, Stage::Removing]);
    }

    #[test]
    fn stage_serde_matches_display() {
        for stage in ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{stage}\""));
        }
    }
}
