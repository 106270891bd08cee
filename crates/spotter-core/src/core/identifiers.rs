// crates/spotter-core/src/core/identifiers.rs
// ============================================================================
// Module: Spotter Identifiers
// Description: Opaque identifiers for problems and diagnosis jobs.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Problem identifiers are opaque strings that key the result blackboard and
//! the progress tracker. Job identifiers are numeric; the value `0` is reserved
//! as the "no job" sentinel returned when a start request is rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Unique identifier of a problem node within one hierarchy.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemId(String);

impl ProblemId {
    /// Creates a new problem identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ProblemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProblemId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Diagnosis job identifier.
///
/// # Invariants
/// - `0` ([`JobId::NONE`]) means "no job"; started jobs are always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    /// Sentinel returned when no job is running or a start was rejected.
    pub const NONE: Self = Self(0);

    /// Creates a job identifier from a raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns true when this is the "no job" sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
