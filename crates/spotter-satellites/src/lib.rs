// crates/spotter-satellites/src/lib.rs
// ============================================================================
// Module: Spotter Satellites
// Description: Built-in satellite adapters and registration utilities.
// Purpose: Provide generic satellites so diagnoses run end to end.
// Dependencies: spotter-core, reqwest, serde_json, time
// ============================================================================

//! ## Overview
//! This crate ships two families of satellite adapters for every kind:
//! `http` adapters that speak JSON over HTTP to remote satellites, and
//! `simulated` adapters that run in process against a synthetic system under
//! test. [`register_builtin_satellites`] makes both resolvable by extension
//! name through the core [`spotter_core::ExtensionRegistry`].
//!
//! Invariants:
//! - Malformed descriptor properties fail when brokers are built, not during
//!   an experiment.
//! - HTTP response bodies are bounded by `max_response_bytes`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;
mod properties;
pub mod registry;
pub mod simulated;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use http::HttpInstrumentation;
pub use http::HttpMeasurement;
pub use http::HttpSatelliteConfig;
pub use http::HttpWorkload;
pub use registry::HTTP_EXTENSION;
pub use registry::SIMULATED_EXTENSION;
pub use registry::register_builtin_satellites;
pub use registry::register_builtin_satellites_with;
pub use simulated::ERROR_RATE_METRIC;
pub use simulated::RESPONSE_TIME_METRIC;
pub use simulated::ResponseModel;
pub use simulated::SimulatedInstrumentation;
pub use simulated::SimulatedMeasurement;
pub use simulated::SimulatedSystem;
pub use simulated::SimulatedWorkload;
pub use simulated::THROUGHPUT_METRIC;
