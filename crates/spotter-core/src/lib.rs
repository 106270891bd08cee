// crates/spotter-core/src/lib.rs
// ============================================================================
// Module: Spotter Core Library
// Description: Public API surface for the Spotter diagnosis core.
// Purpose: Expose core types, satellite interfaces, and orchestration runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Spotter core walks a hierarchy of candidate performance problems and runs
//! controlled load experiments against a system under test to decide, node by
//! node, whether each problem is present. It is satellite-agnostic: concrete
//! instrumentation, measurement, and workload services plug in through the
//! adapter traits in [`interfaces`] and are resolved by name through the
//! [`ExtensionRegistry`].
//!
//! Invariants:
//! - Experiments never overlap: the hierarchy walk is strictly sequential.
//! - Parallelism exists only inside a single broker fan-out call.
//! - The [`DiagnosisEngine`] is the only place that turns an escaped error into
//!   a terminal job state.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::Analyzer;
pub use interfaces::InstrumentationAdapter;
pub use interfaces::InstrumentationError;
pub use interfaces::MeasurementAdapter;
pub use interfaces::MeasurementError;
pub use interfaces::SatelliteAdapter;
pub use interfaces::WorkloadAdapter;
pub use interfaces::WorkloadError;
pub use runtime::ControllerError;
pub use runtime::DetectionController;
pub use runtime::DiagnosisEngine;
pub use runtime::DiagnosisOutcome;
pub use runtime::EngineConfig;
pub use runtime::EngineError;
pub use runtime::ExperimentContext;
pub use runtime::ExperimentError;
pub use runtime::ExperimentPhase;
pub use runtime::ExperimentReuser;
pub use runtime::ExperimentRunner;
pub use runtime::ExtensionError;
pub use runtime::ExtensionRegistry;
pub use runtime::InstrumentationBroker;
pub use runtime::JobContext;
pub use runtime::JobControl;
pub use runtime::MeasurementBroker;
pub use runtime::NodeVerdict;
pub use runtime::ProgressTracker;
pub use runtime::ResultBlackboard;
pub use runtime::SatelliteBroker;
pub use runtime::SatelliteBrokers;
pub use runtime::ShutdownSignal;
pub use runtime::TraversalPolicy;
pub use runtime::WorkloadBroker;
pub use runtime::run_default_series;
