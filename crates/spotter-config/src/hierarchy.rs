// crates/spotter-config/src/hierarchy.rs
// ============================================================================
// Module: Problem Hierarchy Loading
// Description: Parse hierarchy files into validated problem trees.
// Purpose: Turn TOML, JSON, or YAML hierarchy documents into core nodes.
// Dependencies: spotter-core, serde, serde_json, serde_yaml, toml, tracing
// ============================================================================

//! ## Overview
//! A hierarchy document describes the root node; every node may carry an
//! `id`, a `name`, an `extension`, a scalar `config` table, and `children`.
//! Nodes without an `id` get one derived from their position: the slug of
//! their name appended to the parent id with `/`.
//!
//! [`parse_hierarchy`] and [`read_hierarchy`] are strict. [`load_hierarchy`]
//! is lenient: a missing, unreadable, or invalid file is logged and replaced
//! by [`ProblemHierarchy::default_hierarchy`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use spotter_core::HierarchyError;
use spotter_core::ProblemHierarchy;
use spotter_core::ProblemNode;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::config::ConfigError;
use crate::config::MAX_CONFIG_FILE_SIZE;
use crate::config::ScalarValue;
use crate::config::stringify_scalars;
use crate::config::validate_path;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum nesting depth of a hierarchy document.
const MAX_HIERARCHY_DEPTH: usize = 32;
/// Maximum number of nodes in a hierarchy document.
const MAX_HIERARCHY_NODES: usize = 4096;
/// Identifier of a root node without an explicit id or usable name.
const ROOT_FALLBACK_ID: &str = "root";

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Hierarchy document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyFormat {
    /// TOML document.
    Toml,
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

impl HierarchyFormat {
    /// Picks the format from a file extension; unknown extensions read as TOML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Self::Json,
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Toml,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Hierarchy loading errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyLoadError {
    /// The file could not be read.
    #[error("hierarchy io error: {0}")]
    Io(String),
    /// The document could not be parsed.
    #[error("hierarchy parse error: {0}")]
    Parse(String),
    /// The document exceeds a structural limit.
    #[error("invalid hierarchy: {0}")]
    Invalid(String),
    /// The tree violates an identifier rule.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

impl From<ConfigError> for HierarchyLoadError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(message) => Self::Io(message),
            ConfigError::Parse(message) => Self::Parse(message),
            ConfigError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Document Model
// ============================================================================

/// Node as written in a hierarchy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Explicit identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Problem name.
    pub name: String,
    /// Detection controller extension name.
    #[serde(default)]
    pub extension: Option<String>,
    /// Controller configuration.
    #[serde(default)]
    pub config: BTreeMap<String, ScalarValue>,
    /// Child problems.
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    /// Converts the document tree into core nodes, deriving missing ids.
    fn into_node(self, parent_id: Option<&str>, depth: usize, count: &mut usize) -> Result<ProblemNode, HierarchyLoadError> {
        if depth > MAX_HIERARCHY_DEPTH {
            return Err(HierarchyLoadError::Invalid(format!("hierarchy deeper than {MAX_HIERARCHY_DEPTH} levels")));
        }
        *count = count.saturating_add(1);
        if *count > MAX_HIERARCHY_NODES {
            return Err(HierarchyLoadError::Invalid(format!("hierarchy has more than {MAX_HIERARCHY_NODES} nodes")));
        }
        let id = match self.id.as_deref().map(str::trim) {
            Some(explicit) => explicit.to_string(),
            None => derive_id(parent_id, &self.name),
        };
        let mut node = ProblemNode::new(id.as_str(), self.name.trim());
        node.extension_name =
            self.extension.map(|extension| extension.trim().to_string()).filter(|extension| !extension.is_empty());
        node.config = stringify_scalars(&self.config);
        for child in self.children {
            node.children.push(child.into_node(Some(&id), depth + 1, count)?);
        }
        Ok(node)
    }
}

/// Derives an identifier from the parent id and the node name.
fn derive_id(parent_id: Option<&str>, name: &str) -> String {
    let slug = slugify(name);
    match parent_id {
        Some(parent) => format!("{parent}/{slug}"),
        None if slug.is_empty() => ROOT_FALLBACK_ID.to_string(),
        None => slug,
    }
}

/// Lowercases a name and collapses non-alphanumeric runs into `-`.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a hierarchy document.
///
/// # Errors
///
/// Returns [`HierarchyLoadError`] when the document is malformed, exceeds a
/// limit, or has empty or duplicate ids.
pub fn parse_hierarchy(content: &str, format: HierarchyFormat) -> Result<ProblemHierarchy, HierarchyLoadError> {
    let raw: NodeSpec = match format {
        HierarchyFormat::Toml => toml::from_str(content).map_err(|err| HierarchyLoadError::Parse(err.to_string()))?,
        HierarchyFormat::Json => {
            serde_json::from_str(content).map_err(|err| HierarchyLoadError::Parse(err.to_string()))?
        }
        HierarchyFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|err| HierarchyLoadError::Parse(err.to_string()))?
        }
    };
    let mut count = 0;
    let root = raw.into_node(None, 0, &mut count)?;
    Ok(ProblemHierarchy::new(root)?)
}

/// Reads and parses a hierarchy file, picking the format from its extension.
///
/// # Errors
///
/// Returns [`HierarchyLoadError`] when the file cannot be read or parsed.
pub fn read_hierarchy(path: &Path) -> Result<ProblemHierarchy, HierarchyLoadError> {
    validate_path(path)?;
    let bytes = fs::read(path).map_err(|err| HierarchyLoadError::Io(err.to_string()))?;
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(HierarchyLoadError::Invalid("hierarchy file exceeds size limit".to_string()));
    }
    let content = std::str::from_utf8(&bytes)
        .map_err(|_| HierarchyLoadError::Invalid("hierarchy file must be utf-8".to_string()))?;
    parse_hierarchy(content, HierarchyFormat::from_path(path))
}

/// Loads a hierarchy, falling back to the default hierarchy on any failure.
#[must_use]
pub fn load_hierarchy(path: Option<&Path>) -> ProblemHierarchy {
    let Some(path) = path else {
        info!("no hierarchy configured, using default hierarchy");
        return ProblemHierarchy::default_hierarchy();
    };
    match read_hierarchy(path) {
        Ok(hierarchy) => {
            info!(path = %path.display(), problems = hierarchy.len(), "loaded problem hierarchy");
            hierarchy
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "hierarchy unavailable, using default hierarchy");
            ProblemHierarchy::default_hierarchy()
        }
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders the hierarchy as an indented tree.
#[must_use]
pub fn render_tree(hierarchy: &ProblemHierarchy) -> String {
    let mut out = String::new();
    render_node(hierarchy.root(), 0, &mut out);
    out
}

/// Appends one node and its subtree to `out`.
fn render_node(node: &ProblemNode, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.name);
    out.push_str(" [");
    out.push_str(node.unique_id.as_str());
    out.push(']');
    match (&node.extension_name, node.is_detectable()) {
        (Some(extension), true) => {
            out.push_str(" -> ");
            out.push_str(extension);
        }
        (None, true) => out.push_str(" -> (missing extension)"),
        (_, false) => {}
    }
    out.push('\n');
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}
