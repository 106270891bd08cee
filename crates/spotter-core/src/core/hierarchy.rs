// crates/spotter-core/src/core/hierarchy.rs
// ============================================================================
// Module: Spotter Problem Hierarchy
// Description: Tree of candidate performance problems walked by the engine.
// Purpose: Model problem nodes and validate hierarchy-wide invariants.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`ProblemHierarchy`] is a tree of [`ProblemNode`] values. Inner nodes group
//! related problems; leaves are root causes. A node is detectable when its
//! explicit `detectable` config value says so, or, absent that value, when it
//! names a detection controller extension.
//!
//! Invariants:
//! - `unique_id` is unique within a hierarchy and never empty.
//! - The hierarchy is immutable once constructed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::ProblemId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Config key carrying the explicit detectability flag.
pub const DETECTABLE_KEY: &str = "detectable";

// ============================================================================
// SECTION: Problem Nodes
// ============================================================================

/// Node of the problem hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemNode {
    /// Stable identifier; sole key into the blackboard and progress tracker.
    pub unique_id: ProblemId,
    /// Human readable problem name used in reports.
    pub name: String,
    /// Detection controller extension name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_name: Option<String>,
    /// Controller configuration as ordered key/value pairs.
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    /// Ordered child problems.
    #[serde(default)]
    pub children: Vec<ProblemNode>,
}

impl ProblemNode {
    /// Creates a node without extension, config, or children.
    #[must_use]
    pub fn new(unique_id: impl Into<ProblemId>, name: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            name: name.into(),
            extension_name: None,
            config: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Sets the detection controller extension name.
    #[must_use]
    pub fn with_extension(mut self, extension_name: impl Into<String>) -> Self {
        self.extension_name = Some(extension_name.into());
        self
    }

    /// Adds a configuration entry.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Appends a child node.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Returns a config value by key.
    #[must_use]
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// Returns true when the engine should run detection for this node.
    #[must_use]
    pub fn is_detectable(&self) -> bool {
        match self.config_value(DETECTABLE_KEY).map(|value| value.trim().to_ascii_lowercase()) {
            Some(value) if value == "true" => true,
            Some(value) if value == "false" => false,
            _ => self.extension_name.is_some(),
        }
    }

    /// Returns true when the node has no children.
    #[must_use]
    pub fn is_root_cause(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the report-facing summary of this node.
    #[must_use]
    pub fn summary(&self) -> ProblemSummary {
        ProblemSummary {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            extension_name: self.extension_name.clone(),
        }
    }
}

/// Identity of a problem without its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSummary {
    /// Problem identifier.
    pub unique_id: ProblemId,
    /// Problem name.
    pub name: String,
    /// Detection controller extension name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_name: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Hierarchy validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// Two nodes share the same identifier.
    #[error("duplicate problem id: {0}")]
    DuplicateId(ProblemId),
    /// A node has an empty identifier.
    #[error("problem '{name}' has an empty id")]
    EmptyId {
        /// Name of the offending node.
        name: String,
    },
}

// ============================================================================
// SECTION: Hierarchy
// ============================================================================

/// Validated problem hierarchy.
///
/// # Invariants
/// - Identifiers are unique and non-empty across the whole tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemHierarchy {
    /// Root node.
    root: ProblemNode,
}

impl ProblemHierarchy {
    /// Validates and wraps a root node.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError`] when an identifier is empty or duplicated.
    pub fn new(root: ProblemNode) -> Result<Self, HierarchyError> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![&root];
        while let Some(node) = stack.pop() {
            if node.unique_id.as_str().trim().is_empty() {
                return Err(HierarchyError::EmptyId {
                    name: node.name.clone(),
                });
            }
            if !seen.insert(node.unique_id.clone()) {
                return Err(HierarchyError::DuplicateId(node.unique_id.clone()));
            }
            stack.extend(node.children.iter());
        }
        Ok(Self {
            root,
        })
    }

    /// Returns the fallback hierarchy: a single non-detectable empty root.
    #[must_use]
    pub fn default_hierarchy() -> Self {
        Self {
            root: ProblemNode::new("root", "Root").with_config(DETECTABLE_KEY, "false"),
        }
    }

    /// Returns the root node.
    #[must_use]
    pub const fn root(&self) -> &ProblemNode {
        &self.root
    }

    /// Returns every node in depth-first pre-order.
    #[must_use]
    pub fn preorder(&self) -> Vec<&ProblemNode> {
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Finds a node by identifier.
    #[must_use]
    pub fn find(&self, id: &ProblemId) -> Option<&ProblemNode> {
        self.preorder().into_iter().find(|node| &node.unique_id == id)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.preorder().len()
    }

    /// Always false: a hierarchy has at least its root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns root-cause nodes that can never be detected.
    #[must_use]
    pub fn dead_ends(&self) -> Vec<&ProblemNode> {
        self.preorder()
            .into_iter()
            .filter(|node| node.is_root_cause() && !node.is_detectable())
            .filter(|node| node.unique_id != self.root.unique_id)
            .collect()
    }
}
