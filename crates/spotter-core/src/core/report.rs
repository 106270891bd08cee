// crates/spotter-core/src/core/report.rs
// ============================================================================
// Module: Spotter Diagnosis Report
// Description: Final report assembled from the result blackboard.
// Purpose: Serialize diagnosis outcomes to JSON and human-readable text.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`DiagnosisReport`] lists investigated problems in investigation order.
//! The text rendering marks detected problems with an uppercase `DETECTED`
//! tag and everything else with a lowercase `not detected` tag, so the
//! uppercase tag never appears in a report without a detection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hierarchy::ProblemSummary;
use crate::core::identifiers::JobId;
use crate::core::identifiers::ProblemId;
use crate::core::job::JobState;
use crate::core::result::ProblemOccurrence;
use crate::core::result::SpotterResult;

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// One investigated problem in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Problem identifier.
    pub unique_id: ProblemId,
    /// Problem name.
    pub name: String,
    /// Verdict.
    pub detected: bool,
    /// Analyzer message.
    pub message: String,
    /// Structured occurrences.
    #[serde(default)]
    pub occurrences: Vec<ProblemOccurrence>,
    /// Resource files produced by the analysis.
    #[serde(default)]
    pub resource_files: Vec<PathBuf>,
}

impl ReportEntry {
    /// Builds an entry from a problem summary and its stored result.
    #[must_use]
    pub fn from_result(problem: &ProblemSummary, result: &SpotterResult) -> Self {
        Self {
            unique_id: problem.unique_id.clone(),
            name: problem.name.clone(),
            detected: result.is_detected(),
            message: result.message().to_string(),
            occurrences: result.occurrences().to_vec(),
            resource_files: result.resource_files().to_vec(),
        }
    }
}

/// Final diagnosis report of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisReport {
    /// Job identifier.
    pub job_id: JobId,
    /// Final job state.
    pub state: JobState,
    /// RFC 3339 generation time, when stamped by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    /// Entries in investigation order.
    pub entries: Vec<ReportEntry>,
    /// Error that cancelled the job, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiagnosisReport {
    /// Creates a report without timestamp or error.
    #[must_use]
    pub const fn new(job_id: JobId, state: JobState, entries: Vec<ReportEntry>) -> Self {
        Self {
            job_id,
            state,
            generated_at: None,
            entries,
            error: None,
        }
    }

    /// Returns the number of detected problems.
    #[must_use]
    pub fn detected_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.detected).count()
    }

    /// Renders the report as text.
    #[must_use]
    pub fn render_text(&self) -> String {
        self.to_string()
    }

    /// Serializes the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for DiagnosisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Spotter diagnosis report")?;
        writeln!(f, "Job: {}", self.job_id)?;
        writeln!(f, "State: {}", self.state)?;
        if let Some(generated_at) = &self.generated_at {
            writeln!(f, "Generated: {generated_at}")?;
        }
        writeln!(
            f,
            "Investigated: {} problem(s), {} detected",
            self.entries.len(),
            self.detected_count()
        )?;
        if let Some(error) = &self.error {
            writeln!(f, "Error: {error}")?;
        }
        for entry in &self.entries {
            writeln!(f)?;
            let tag = if entry.detected { "DETECTED" } else { "not detected" };
            writeln!(f, "[{tag}] {} ({})", entry.name, entry.unique_id)?;
            for line in entry.message.lines() {
                writeln!(f, "    {line}")?;
            }
            for occurrence in &entry.occurrences {
                writeln!(f, "    - {}: {}", occurrence.location, occurrence.message)?;
            }
            for path in &entry.resource_files {
                writeln!(f, "    resource: {}", path.display())?;
            }
        }
        Ok(())
    }
}
