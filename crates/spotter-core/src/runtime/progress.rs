// crates/spotter-core/src/runtime/progress.rs
// ============================================================================
// Module: Spotter Progress Tracker
// Description: Shared per-problem status and ETA records.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The tracker is written by the diagnosis worker at every phase transition
//! and read by job-control callers. Once a problem reaches `DETECTED` or
//! `NOT_DETECTED` its record is final for the rest of the run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::PoisonError;
use std::sync::RwLock;

use tracing::debug;

use crate::core::DiagnosisProgress;
use crate::core::DiagnosisStatus;
use crate::core::ProblemId;

// ============================================================================
// SECTION: Tracker
// ============================================================================

/// Process-wide progress map for the current job.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    /// Progress keyed by problem.
    entries: RwLock<BTreeMap<ProblemId, DiagnosisProgress>>,
}

impl ProgressTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status of a problem, keeping its message and estimates.
    pub fn set_status(&self, id: &ProblemId, status: DiagnosisStatus) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(id) {
            Some(existing) if existing.status.is_terminal() => {
                debug!(problem = %id, status = %status, "ignoring update after terminal status");
            }
            Some(existing) => existing.status = status,
            None => {
                entries.insert(id.clone(), DiagnosisProgress::new(status));
            }
        }
    }

    /// Replaces the progress record of a problem.
    pub fn update(&self, id: &ProblemId, progress: DiagnosisProgress) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(id).is_some_and(|existing| existing.status.is_terminal()) {
            debug!(problem = %id, status = %progress.status, "ignoring update after terminal status");
            return;
        }
        entries.insert(id.clone(), progress);
    }

    /// Returns the progress record of a problem.
    #[must_use]
    pub fn get(&self, id: &ProblemId) -> Option<DiagnosisProgress> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    /// Returns a copy of every record.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<ProblemId, DiagnosisProgress> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Clears every record.
    pub fn reset(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
