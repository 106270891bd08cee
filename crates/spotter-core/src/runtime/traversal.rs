// crates/spotter-core/src/runtime/traversal.rs
// ============================================================================
// Module: Spotter Traversal Policy
// Description: Decides whether the engine descends into a node's children.
// Purpose: Keep the pruning rule explicit and independently testable.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Grouping nodes (not detectable) always lead into their children. Detected
//! nodes are refined by their children. Under the default policy a
//! not-detected node prunes its subtree; `explore_all` visits everything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::SpotterResult;

// ============================================================================
// SECTION: Verdicts
// ============================================================================

/// Outcome of visiting one node, as seen by the traversal policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeVerdict {
    /// Node was not detectable and only groups its children.
    Grouping,
    /// Node was detected.
    Detected,
    /// Node was investigated and not detected.
    NotDetected,
}

impl NodeVerdict {
    /// Derives the verdict from a stored result.
    #[must_use]
    pub const fn from_result(result: &SpotterResult) -> Self {
        if result.is_detected() { Self::Detected } else { Self::NotDetected }
    }
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Rule deciding descent into children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalPolicy {
    /// Descend into grouping and detected nodes; prune not-detected nodes.
    #[default]
    PruneUndetected,
    /// Descend into every node.
    ExploreAll,
}

impl TraversalPolicy {
    /// Returns true when the children of a node with `verdict` should be visited.
    #[must_use]
    pub const fn should_descend(self, verdict: NodeVerdict) -> bool {
        match (self, verdict) {
            (Self::ExploreAll, _) | (Self::PruneUndetected, NodeVerdict::Grouping | NodeVerdict::Detected) => true,
            (Self::PruneUndetected, NodeVerdict::NotDetected) => false,
        }
    }

    /// Returns the stable config label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PruneUndetected => "prune_undetected",
            Self::ExploreAll => "explore_all",
        }
    }
}

impl fmt::Display for TraversalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraversalPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "prune_undetected" => Ok(Self::PruneUndetected),
            "explore_all" => Ok(Self::ExploreAll),
            other => Err(format!("unknown traversal policy: {other}")),
        }
    }
}
