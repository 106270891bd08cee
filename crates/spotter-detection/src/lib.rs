// crates/spotter-detection/src/lib.rs
// ============================================================================
// Module: Spotter Detection
// Description: Built-in detection controllers and analyzers.
// Purpose: Provide generic verdicts so hierarchies run without custom code.
// Dependencies: spotter-core, tracing
// ============================================================================

//! ## Overview
//! Two generic controllers ship with Spotter: `threshold`, which compares a
//! metric's mean under the highest load with a fixed bound, and
//! `scalability`, which compares how fast a metric grows between the lowest
//! and highest load. Both run the core's default experiment series and can
//! share it with siblings through a `reuse_scope`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod analyzer;
pub mod registry;
pub mod scalability;
pub mod settings;
pub mod threshold;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use analyzer::ScalabilityAnalyzer;
pub use analyzer::ThresholdAnalyzer;
pub use registry::SCALABILITY_CONTROLLER;
pub use registry::THRESHOLD_CONTROLLER;
pub use registry::register_builtin_controllers;
pub use scalability::ScalabilityController;
pub use settings::DEFAULT_METRIC;
pub use settings::SeriesSettings;
pub use threshold::ThresholdController;
