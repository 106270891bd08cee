// crates/spotter-service/src/lib.rs
// ============================================================================
// Module: Spotter Service Library
// Description: Diagnosis job service over configuration and extensions.
// Purpose: Give front ends one entry point for starting and observing jobs.
// Dependencies: spotter-config, spotter-core, spotter-detection, spotter-satellites
// ============================================================================

//! ## Overview
//! [`DiagnosisService`] owns the extension registry and the single-job
//! controller. Starting a job loads the configuration, builds satellite
//! brokers, loads the problem hierarchy, and runs the diagnosis engine on a
//! worker thread. Finished and cancelled jobs leave their report and the
//! collected measurements under `report_dir/job-<id>/`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod artifacts;
pub mod service;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifacts::ArtifactError;
pub use artifacts::JobArtifacts;
pub use artifacts::job_dir;
pub use artifacts::timestamp_now;
pub use artifacts::write_job_artifacts;
pub use service::DiagnosisService;
pub use service::PreparedRun;
pub use service::ServiceError;
pub use service::ValidationSummary;
