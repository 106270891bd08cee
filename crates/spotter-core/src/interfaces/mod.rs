// crates/spotter-core/src/interfaces/mod.rs
// ============================================================================
// Module: Spotter Interfaces
// Description: Satellite adapter and analyzer contracts.
// Purpose: Define the narrow surfaces through which the core reaches satellites.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each satellite kind has one small capability trait. Endpoint data (name,
//! host, port, properties) lives in a shared [`SatelliteInfo`] reached through
//! [`SatelliteAdapter`], so kind traits only declare their operations.
//!
//! Adapters are driven concurrently by brokers, one thread per adapter, so
//! every operation takes `&self` and implementations must be `Send + Sync`.
//! Calls are synchronous request/response and may fail; the core does not
//! retry them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::core::Dataset;
use crate::core::InstrumentationDescription;
use crate::core::LoadConfig;
use crate::core::MeasurementData;
use crate::core::SatelliteInfo;
use crate::core::SpotterResult;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Instrumentation satellite errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstrumentationError {
    /// The instrumentation description has no entities.
    #[error("instrumentation description is empty")]
    EmptyDescription,
    /// The satellite rejected or failed the request.
    #[error("instrumentation satellite {satellite} failed: {message}")]
    Satellite {
        /// Satellite name.
        satellite: String,
        /// Failure details.
        message: String,
    },
}

/// Measurement satellite errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasurementError {
    /// The satellite rejected or failed the request.
    #[error("measurement satellite {satellite} failed: {message}")]
    Satellite {
        /// Satellite name.
        satellite: String,
        /// Failure details.
        message: String,
    },
    /// Writing measurement output failed.
    #[error("measurement output for {satellite} failed: {message}")]
    Io {
        /// Satellite name.
        satellite: String,
        /// Failure details.
        message: String,
    },
}

/// Workload satellite errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkloadError {
    /// The satellite rejected or failed the request.
    #[error("workload satellite {satellite} failed: {message}")]
    Satellite {
        /// Satellite name.
        satellite: String,
        /// Failure details.
        message: String,
    },
    /// The load configuration was rejected.
    #[error("workload satellite {satellite} rejected load: {message}")]
    InvalidLoad {
        /// Satellite name.
        satellite: String,
        /// Failure details.
        message: String,
    },
    /// A phase wait was interrupted before the phase ended.
    #[error("workload satellite {satellite} wait interrupted: {message}")]
    Interrupted {
        /// Satellite name.
        satellite: String,
        /// Failure details.
        message: String,
    },
}

// ============================================================================
// SECTION: Satellite Adapter
// ============================================================================

/// Endpoint surface shared by every adapter kind.
pub trait SatelliteAdapter: Send + Sync {
    /// Returns the adapter's endpoint information.
    fn info(&self) -> &SatelliteInfo;

    /// Returns mutable endpoint information.
    fn info_mut(&mut self) -> &mut SatelliteInfo;

    /// Returns the satellite name.
    fn name(&self) -> &str {
        self.info().name()
    }

    /// Returns the satellite host.
    fn host(&self) -> &str {
        self.info().host()
    }

    /// Returns the satellite port.
    fn port(&self) -> u16 {
        self.info().port()
    }

    /// Returns the adapter properties.
    fn properties(&self) -> &BTreeMap<String, String> {
        self.info().properties()
    }

    /// Replaces the adapter properties.
    fn set_properties(&mut self, properties: BTreeMap<String, String>) {
        self.info_mut().set_properties(properties);
    }
}

// ============================================================================
// SECTION: Instrumentation
// ============================================================================

/// Instrumentation satellite operations.
pub trait InstrumentationAdapter: SatelliteAdapter {
    /// Prepares the satellite for a new experiment series.
    ///
    /// # Errors
    ///
    /// Returns [`InstrumentationError`] when the satellite fails.
    fn initialize(&self) -> Result<(), InstrumentationError>;

    /// Applies the instrumentation description.
    ///
    /// # Errors
    ///
    /// Returns [`InstrumentationError`] when the satellite fails.
    fn instrument(&self, description: &InstrumentationDescription) -> Result<(), InstrumentationError>;

    /// Removes all instrumentation.
    ///
    /// # Errors
    ///
    /// Returns [`InstrumentationError`] when the satellite fails.
    fn uninstrument(&self) -> Result<(), InstrumentationError>;
}

// ============================================================================
// SECTION: Measurement
// ============================================================================

/// Measurement satellite operations.
pub trait MeasurementAdapter: SatelliteAdapter {
    /// Prepares the satellite for a new experiment series.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError`] when the satellite fails.
    fn initialize(&self) -> Result<(), MeasurementError>;

    /// Starts collecting samples.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError`] when the satellite fails.
    fn enable_monitoring(&self) -> Result<(), MeasurementError>;

    /// Stops collecting samples.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError`] when the satellite fails.
    fn disable_monitoring(&self) -> Result<(), MeasurementError>;

    /// Returns the samples collected since monitoring was last enabled.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError`] when the satellite fails.
    fn measurement_data(&self) -> Result<MeasurementData, MeasurementError>;

    /// Writes the collected samples to `out` as JSON lines.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError`] when fetching or writing fails.
    fn pipe_to_output_stream(&self, out: &mut dyn Write) -> Result<(), MeasurementError> {
        let data = self.measurement_data()?;
        for record in &data.records {
            let line = serde_json::to_string(record).map_err(|err| self.io_error(&err))?;
            writeln!(out, "{line}").map_err(|err| self.io_error(&err))?;
        }
        Ok(())
    }

    /// Stores a satellite-side report in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError`] when fetching or writing fails.
    fn store_report(&self, dir: &Path) -> Result<(), MeasurementError> {
        let data = self.measurement_data()?;
        fs::create_dir_all(dir).map_err(|err| self.io_error(&err))?;
        let bytes = serde_json::to_vec_pretty(&data).map_err(|err| self.io_error(&err))?;
        fs::write(dir.join("measurements.json"), bytes).map_err(|err| self.io_error(&err))
    }

    /// Returns the satellite clock in unix milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError`] when the satellite fails.
    fn current_time(&self) -> Result<u64, MeasurementError>;

    /// Builds an output error tagged with this satellite's name.
    fn io_error(&self, err: &dyn std::error::Error) -> MeasurementError {
        MeasurementError::Io {
            satellite: self.name().to_string(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Workload
// ============================================================================

/// Workload satellite operations.
pub trait WorkloadAdapter: SatelliteAdapter {
    /// Prepares the satellite for a new experiment series.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError`] when the satellite fails.
    fn initialize(&self) -> Result<(), WorkloadError>;

    /// Starts generating load.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError`] when the load is rejected or the satellite fails.
    fn start_load(&self, load: &LoadConfig) -> Result<(), WorkloadError>;

    /// Blocks until the ramp-up phase ends.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError`] when the wait is interrupted or fails.
    fn wait_for_warmup_phase_termination(&self) -> Result<(), WorkloadError>;

    /// Blocks until the stable phase ends.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError`] when the wait is interrupted or fails.
    fn wait_for_experiment_phase_termination(&self) -> Result<(), WorkloadError>;

    /// Blocks until the cool-down phase ends and load has stopped.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError`] when the wait is interrupted or fails.
    fn wait_for_finished_load(&self) -> Result<(), WorkloadError>;
}

// ============================================================================
// SECTION: Analyzer
// ============================================================================

/// Turns experiment datasets into a verdict.
///
/// # Invariants
/// - Pure: the same datasets always produce the same result.
pub trait Analyzer: Send + Sync {
    /// Analyses the datasets of one experiment series.
    fn analyze(&self, datasets: &[Dataset]) -> SpotterResult;
}
