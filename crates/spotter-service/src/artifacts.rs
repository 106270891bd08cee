// crates/spotter-service/src/artifacts.rs
// ============================================================================
// Module: Job Artifacts
// Description: Report and measurement files written after a diagnosis job.
// Purpose: Persist job outcomes under a per-job directory.
// Dependencies: spotter-core, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! Every job gets its own directory `report_dir/job-<id>/` containing:
//! - `report.txt`: the rendered text report.
//! - `report.json`: the report as JSON.
//! - `measurements.jsonl`: one measurement record per line, when measurement
//!   satellites are configured.
//! - `satellites/<name>/`: satellite-side reports.
//!
//! Reports are written before measurements so that a failing satellite never
//! costs the job its verdicts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use spotter_core::DiagnosisReport;
use spotter_core::JobId;
use spotter_core::MeasurementBroker;
use spotter_core::MeasurementError;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Rendered text report file name.
pub const REPORT_TEXT_FILE: &str = "report.txt";
/// JSON report file name.
pub const REPORT_JSON_FILE: &str = "report.json";
/// Measurement records file name (JSON lines).
pub const MEASUREMENTS_FILE: &str = "measurements.jsonl";
/// Directory holding satellite-side reports.
pub const SATELLITE_REPORTS_DIR: &str = "satellites";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Artifact writing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    /// A file or directory could not be written.
    #[error("artifact io error at {path}: {message}")]
    Io {
        /// Path being written.
        path: String,
        /// Failure details.
        message: String,
    },
    /// The report could not be serialized.
    #[error("report serialization failed: {0}")]
    Serialize(String),
    /// A measurement satellite failed while exporting data.
    #[error(transparent)]
    Measurement(#[from] MeasurementError),
}

impl ArtifactError {
    /// Builds an [`ArtifactError::Io`] for `path`.
    fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Files written for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobArtifacts {
    /// Job directory.
    pub dir: PathBuf,
    /// Rendered text report.
    pub report_text: PathBuf,
    /// JSON report.
    pub report_json: PathBuf,
    /// Measurement records, when measurement satellites are configured.
    pub measurements: Option<PathBuf>,
}

/// Returns the directory of job `job_id` under `report_dir`.
#[must_use]
pub fn job_dir(report_dir: &Path, job_id: JobId) -> PathBuf {
    report_dir.join(format!("job-{job_id}"))
}

/// Returns the current UTC time as RFC 3339 text.
#[must_use]
pub fn timestamp_now() -> Option<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).ok()
}

// ============================================================================
// SECTION: Writing
// ============================================================================

/// Writes the job report and exported measurements under `report_dir`.
///
/// # Errors
///
/// Returns [`ArtifactError`] when a file cannot be written or a measurement
/// satellite fails to export its data.
pub fn write_job_artifacts(
    report_dir: &Path,
    report: &DiagnosisReport,
    measurement: &MeasurementBroker,
) -> Result<JobArtifacts, ArtifactError> {
    let dir = job_dir(report_dir, report.job_id);
    fs::create_dir_all(&dir).map_err(|err| ArtifactError::io(&dir, &err))?;

    let report_text = dir.join(REPORT_TEXT_FILE);
    fs::write(&report_text, report.render_text()).map_err(|err| ArtifactError::io(&report_text, &err))?;
    let report_json = dir.join(REPORT_JSON_FILE);
    let json = report.to_json().map_err(|err| ArtifactError::Serialize(err.to_string()))?;
    fs::write(&report_json, json).map_err(|err| ArtifactError::io(&report_json, &err))?;
    debug!(dir = %dir.display(), "wrote diagnosis report");

    let measurements = if measurement.is_empty() {
        None
    } else {
        let path = dir.join(MEASUREMENTS_FILE);
        let file = File::create(&path).map_err(|err| ArtifactError::io(&path, &err))?;
        let mut out = BufWriter::new(file);
        measurement.pipe_to_output_stream(&mut out)?;
        out.flush().map_err(|err| ArtifactError::io(&path, &err))?;
        measurement.store_report(&dir.join(SATELLITE_REPORTS_DIR))?;
        debug!(path = %path.display(), "wrote measurement records");
        Some(path)
    };

    Ok(JobArtifacts {
        dir,
        report_text,
        report_json,
        measurements,
    })
}
