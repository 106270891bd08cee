// crates/spotter-config/src/lib.rs
// ============================================================================
// Module: Spotter Config Library
// Description: Canonical config model, validation, and hierarchy loading.
// Purpose: Single source of truth for spotter.toml semantics.
// Dependencies: spotter-core, serde, toml
// ============================================================================

//! ## Overview
//! `spotter-config` defines the configuration model for Spotter and loads
//! problem hierarchy documents. Config loading is strict and fail-closed;
//! hierarchy loading has a lenient variant that falls back to an empty root.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;
pub mod hierarchy;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
pub use examples::hierarchy_toml_example;
pub use hierarchy::HierarchyFormat;
pub use hierarchy::HierarchyLoadError;
pub use hierarchy::NodeSpec;
pub use hierarchy::load_hierarchy;
pub use hierarchy::parse_hierarchy;
pub use hierarchy::read_hierarchy;
pub use hierarchy::render_tree;
