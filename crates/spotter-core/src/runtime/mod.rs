// crates/spotter-core/src/runtime/mod.rs
// ============================================================================
// Module: Spotter Runtime
// Description: Orchestration of satellites, experiments, and hierarchy walks.
// Purpose: Group brokers, the experiment runner, the engine, and job control.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Runtime components, leaf to root: satellite brokers fan operations out to
//! adapters, the experiment runner drives brokers through experiment phases,
//! detection controllers turn experiment series into verdicts, and the
//! diagnosis engine walks the hierarchy. [`JobControl`] runs one engine walk at
//! a time on a dedicated worker thread while the blackboard and progress
//! tracker stay readable from other threads.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod blackboard;
pub mod broker;
pub mod controller;
pub mod engine;
pub mod job;
pub mod progress;
pub mod registry;
pub mod runner;
pub mod shutdown;
pub mod traversal;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use blackboard::BlackboardError;
pub use blackboard::ResultBlackboard;
pub use broker::InstrumentationBroker;
pub use broker::MeasurementBroker;
pub use broker::SatelliteBroker;
pub use broker::SatelliteBrokers;
pub use broker::WorkloadBroker;
pub use controller::ControllerError;
pub use controller::DetectionController;
pub use controller::ExperimentContext;
pub use controller::ExperimentReuser;
pub use controller::run_default_series;
pub use engine::DiagnosisEngine;
pub use engine::DiagnosisOutcome;
pub use engine::EngineConfig;
pub use engine::EngineError;
pub use job::JobContext;
pub use job::JobControl;
pub use progress::ProgressTracker;
pub use registry::ControllerFactory;
pub use registry::ExtensionError;
pub use registry::ExtensionKind;
pub use registry::ExtensionRegistry;
pub use registry::InstrumentationFactory;
pub use registry::MeasurementFactory;
pub use registry::WorkloadFactory;
pub use runner::ExperimentError;
pub use runner::ExperimentPhase;
pub use runner::ExperimentRunner;
pub use shutdown::ShutdownSignal;
pub use traversal::NodeVerdict;
pub use traversal::TraversalPolicy;
