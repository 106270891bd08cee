// crates/spotter-core/src/core/progress.rs
// ============================================================================
// Module: Spotter Diagnosis Progress
// Description: Per-problem status and estimated completion records.
// Purpose: Describe what the engine is doing for a problem at any moment.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Each investigated problem moves through [`DiagnosisStatus`] values as the
//! experiment runner changes phase. `DETECTED` and `NOT_DETECTED` are terminal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::JobId;
use crate::core::identifiers::ProblemId;
use crate::core::job::JobState;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Diagnosis status of a single problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosisStatus {
    /// Waiting to be investigated.
    Pending,
    /// Controller is being set up.
    Initializing,
    /// Instrumentation is being applied.
    Instrumenting,
    /// Satellites are being initialized.
    WarmUp,
    /// Load is ramping up.
    ExperimentingRampUp,
    /// Stable load with monitoring enabled.
    ExperimentingStablePhase,
    /// Load is ramping down.
    ExperimentingCoolDown,
    /// Measurement data is being collected.
    CollectingData,
    /// Instrumentation is being removed.
    Uninstrumenting,
    /// Datasets are being analysed.
    Analysing,
    /// Problem detected.
    Detected,
    /// Problem not detected.
    NotDetected,
}

impl DiagnosisStatus {
    /// Returns true for `DETECTED` and `NOT_DETECTED`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Detected | Self::NotDetected)
    }

    /// Returns the stable uppercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Initializing => "INITIALIZING",
            Self::Instrumenting => "INSTRUMENTING",
            Self::WarmUp => "WARM_UP",
            Self::ExperimentingRampUp => "EXPERIMENTING_RAMP_UP",
            Self::ExperimentingStablePhase => "EXPERIMENTING_STABLE_PHASE",
            Self::ExperimentingCoolDown => "EXPERIMENTING_COOL_DOWN",
            Self::CollectingData => "COLLECTING_DATA",
            Self::Uninstrumenting => "UNINSTRUMENTING",
            Self::Analysing => "ANALYSING",
            Self::Detected => "DETECTED",
            Self::NotDetected => "NOT_DETECTED",
        }
    }
}

impl fmt::Display for DiagnosisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Progress Records
// ============================================================================

/// Progress record of one problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisProgress {
    /// Current status.
    pub status: DiagnosisStatus,
    /// Estimated completion fraction in `[0, 1]`.
    pub estimated_progress: f64,
    /// Estimated remaining seconds.
    pub estimated_remaining_secs: u64,
    /// Free-text progress message.
    pub message: String,
}

impl DiagnosisProgress {
    /// Creates a record in the given status with no progress.
    #[must_use]
    pub const fn new(status: DiagnosisStatus) -> Self {
        Self {
            status,
            estimated_progress: 0.0,
            estimated_remaining_secs: 0,
            message: String::new(),
        }
    }
}

/// Snapshot of every problem's progress for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Job the snapshot belongs to (`0` when idle).
    pub job_id: JobId,
    /// Job state at snapshot time.
    pub state: JobState,
    /// Per-problem progress.
    pub problems: BTreeMap<ProblemId, DiagnosisProgress>,
}
