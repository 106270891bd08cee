// crates/spotter-core/src/core/result.rs
// ============================================================================
// Module: Spotter Results
// Description: Verdict produced by a detection controller for one problem.
// Purpose: Carry detection outcome, message, occurrences, and resource files.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`SpotterResult`] is built by an analyzer, stored once in the result
//! blackboard, and never mutated afterwards. The message is append-only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Structured occurrence of a detected problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemOccurrence {
    /// Where the problem occurs (code location, resource, or endpoint).
    pub location: String,
    /// Occurrence details.
    pub message: String,
}

impl ProblemOccurrence {
    /// Creates an occurrence.
    #[must_use]
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Detection verdict for one problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotterResult {
    /// Whether the problem was detected.
    detected: bool,
    /// Free-text explanation.
    message: String,
    /// Paths of files produced while analysing.
    resource_files: Vec<PathBuf>,
    /// Structured occurrences.
    occurrences: Vec<ProblemOccurrence>,
}

impl SpotterResult {
    /// Creates a result with the given verdict and an empty message.
    #[must_use]
    pub fn new(detected: bool) -> Self {
        Self {
            detected,
            ..Self::default()
        }
    }

    /// Creates a not-detected result describing a failed detection.
    #[must_use]
    pub fn failure(message: impl AsRef<str>) -> Self {
        let mut result = Self::new(false);
        result.append_message(format!("detection failed: {}", message.as_ref()));
        result
    }

    /// Appends a line to the message.
    pub fn append_message(&mut self, line: impl AsRef<str>) {
        if !self.message.is_empty() {
            self.message.push('\n');
        }
        self.message.push_str(line.as_ref());
    }

    /// Records a problem occurrence.
    pub fn add_occurrence(&mut self, occurrence: ProblemOccurrence) {
        self.occurrences.push(occurrence);
    }

    /// Records a resource file.
    pub fn add_resource_file(&mut self, path: impl Into<PathBuf>) {
        self.resource_files.push(path.into());
    }

    /// Returns whether the problem was detected.
    #[must_use]
    pub const fn is_detected(&self) -> bool {
        self.detected
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the resource files.
    #[must_use]
    pub fn resource_files(&self) -> &[PathBuf] {
        &self.resource_files
    }

    /// Returns the occurrences.
    #[must_use]
    pub fn occurrences(&self) -> &[ProblemOccurrence] {
        &self.occurrences
    }
}
