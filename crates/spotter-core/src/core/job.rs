// crates/spotter-core/src/core/job.rs
// ============================================================================
// Module: Spotter Job State
// Description: Lifecycle state of a diagnosis job.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Job lifecycle: `IDLE -> RUNNING -> FINISHED | CANCELLED`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Diagnosis job state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// No job has run yet.
    #[default]
    Idle,
    /// A job is running.
    Running,
    /// The last job walked the whole hierarchy.
    Finished,
    /// The last job stopped early after an error or shutdown request.
    Cancelled,
}

impl JobState {
    /// Returns the stable uppercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
