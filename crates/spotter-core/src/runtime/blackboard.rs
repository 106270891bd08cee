// crates/spotter-core/src/runtime/blackboard.rs
// ============================================================================
// Module: Spotter Result Blackboard
// Description: Shared store of detection results for the current job.
// Purpose: Record verdicts in investigation order while readers poll them.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The blackboard maps problem identifiers to their [`SpotterResult`] and keeps
//! the ordered list of investigated problems. The worker writes; any thread may
//! read through the reader-writer lock.
//!
//! Invariants:
//! - Each problem appears at most once in the investigation list.
//! - Re-storing a result overwrites the previous entry in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use thiserror::Error;

use crate::core::ProblemId;
use crate::core::ProblemSummary;
use crate::core::SpotterResult;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Blackboard query errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlackboardError {
    /// The problem has not been investigated in this run.
    #[error("problem {0} has not been investigated")]
    UnknownProblem(ProblemId),
}

// ============================================================================
// SECTION: Blackboard
// ============================================================================

/// Mutable blackboard state.
#[derive(Debug, Default)]
struct BlackboardState {
    /// Results keyed by problem.
    results: BTreeMap<ProblemId, SpotterResult>,
    /// Investigated problems in order.
    investigated: Vec<ProblemSummary>,
}

/// Process-wide result store for the current job.
#[derive(Debug, Default)]
pub struct ResultBlackboard {
    /// Guarded state.
    state: RwLock<BlackboardState>,
}

impl ResultBlackboard {
    /// Creates an empty blackboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the result of a problem.
    pub fn put_result(&self, problem: &ProblemSummary, result: SpotterResult) {
        let mut state = self.write();
        if state.results.insert(problem.unique_id.clone(), result).is_none() {
            state.investigated.push(problem.clone());
        }
    }

    /// Returns the stored result of a problem.
    #[must_use]
    pub fn result(&self, id: &ProblemId) -> Option<SpotterResult> {
        self.read().results.get(id).cloned()
    }

    /// Returns true when a result exists for the problem.
    #[must_use]
    pub fn contains(&self, id: &ProblemId) -> bool {
        self.read().results.contains_key(id)
    }

    /// Returns whether the problem was detected.
    ///
    /// # Errors
    ///
    /// Returns [`BlackboardError::UnknownProblem`] when no result is stored.
    pub fn has_been_detected(&self, id: &ProblemId) -> Result<bool, BlackboardError> {
        self.read()
            .results
            .get(id)
            .map(SpotterResult::is_detected)
            .ok_or_else(|| BlackboardError::UnknownProblem(id.clone()))
    }

    /// Returns all results in investigation order.
    #[must_use]
    pub fn results(&self) -> Vec<SpotterResult> {
        self.entries().into_iter().map(|(_, result)| result).collect()
    }

    /// Returns the investigated problems in order.
    #[must_use]
    pub fn investigated(&self) -> Vec<ProblemSummary> {
        self.read().investigated.clone()
    }

    /// Returns `(problem, result)` pairs in investigation order.
    #[must_use]
    pub fn entries(&self) -> Vec<(ProblemSummary, SpotterResult)> {
        let state = self.read();
        state
            .investigated
            .iter()
            .filter_map(|problem| {
                state.results.get(&problem.unique_id).map(|result| (problem.clone(), result.clone()))
            })
            .collect()
    }

    /// Returns the number of stored results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().results.len()
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().results.is_empty()
    }

    /// Clears every result and the investigation list.
    pub fn reset(&self) {
        let mut state = self.write();
        state.results.clear();
        state.investigated.clear();
    }

    /// Acquires the read lock, recovering from poisoning.
    fn read(&self) -> RwLockReadGuard<'_, BlackboardState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the write lock, recovering from poisoning.
    fn write(&self) -> RwLockWriteGuard<'_, BlackboardState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
