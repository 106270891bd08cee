// crates/spotter-core/src/core/mod.rs
// ============================================================================
// Module: Spotter Core Types
// Description: Data model for hierarchies, satellites, experiments, and results.
// Purpose: Group the serializable types shared by every Spotter crate.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Core types are plain data: they carry no satellite handles and perform no
//! I/O. Runtime modules own every side effect.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod experiment;
pub mod hierarchy;
pub mod identifiers;
pub mod instrumentation;
pub mod job;
pub mod measurement;
pub mod progress;
pub mod report;
pub mod result;
pub mod satellite;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use experiment::Dataset;
pub use experiment::ExperimentPlan;
pub use experiment::ExperimentSeries;
pub use experiment::LoadConfig;
pub use experiment::LoadConfigError;
pub use experiment::phase_intervals;
pub use hierarchy::DETECTABLE_KEY;
pub use hierarchy::HierarchyError;
pub use hierarchy::ProblemHierarchy;
pub use hierarchy::ProblemNode;
pub use hierarchy::ProblemSummary;
pub use identifiers::JobId;
pub use identifiers::ProblemId;
pub use instrumentation::EXCLUDES_PROPERTY;
pub use instrumentation::INCLUDES_PROPERTY;
pub use instrumentation::InstrumentationDescription;
pub use instrumentation::InstrumentationEntity;
pub use job::JobState;
pub use measurement::MeasurementData;
pub use measurement::MeasurementRecord;
pub use progress::DiagnosisProgress;
pub use progress::DiagnosisStatus;
pub use progress::ProgressReport;
pub use report::DiagnosisReport;
pub use report::ReportEntry;
pub use result::ProblemOccurrence;
pub use result::SpotterResult;
pub use satellite::SatelliteDescriptor;
pub use satellite::SatelliteInfo;
pub use satellite::SatelliteKind;
