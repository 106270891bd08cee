// crates/spotter-core/src/core/experiment.rs
// ============================================================================
// Module: Spotter Experiment Model
// Description: Load configuration, experiment plans, and collected datasets.
// Purpose: Compute phase durations and per-step loads for experiment series.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! An experiment step ramps users up in intervals, holds a stable phase, and
//! ramps users down again. Ramp-up and cool-down span
//! [`phase_intervals`] intervals: `users / per_interval - 1` when the user
//! count is an exact multiple, `users / per_interval + 1` otherwise. An
//! [`ExperimentPlan`] spreads `max_users` over `num_experiments` steps.
//!
//! Invariants:
//! - User counts and users per interval are always >= 1 once validated.
//! - Step `i` of `n` runs `max(1, ceil(max_users * (i + 1) / n))` users.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::measurement::MeasurementData;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Load configuration validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadConfigError {
    /// The user count is zero.
    #[error("number of users must be at least 1")]
    ZeroUsers,
    /// A phase declares zero users per interval.
    #[error("{phase} users per interval must be at least 1")]
    ZeroUsersPerInterval {
        /// Phase label (`ramp-up` or `cool-down`).
        phase: &'static str,
    },
    /// A plan declares zero experiments.
    #[error("number of experiments must be at least 1")]
    ZeroExperiments,
}

// ============================================================================
// SECTION: Phase Arithmetic
// ============================================================================

/// Returns the number of intervals a ramp phase spans.
///
/// Both arguments are clamped to at least 1.
#[must_use]
pub fn phase_intervals(num_users: u32, users_per_interval: u32) -> u64 {
    let users = u64::from(num_users.max(1));
    let per_interval = u64::from(users_per_interval.max(1));
    if users % per_interval == 0 { users / per_interval - 1 } else { users / per_interval + 1 }
}

// ============================================================================
// SECTION: Load Configuration
// ============================================================================

/// Load parameters for one experiment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Number of concurrent users at the stable phase.
    pub num_users: u32,
    /// Ramp-up interval length in seconds.
    pub ramp_up_interval_secs: u64,
    /// Users added per ramp-up interval.
    pub ramp_up_users_per_interval: u32,
    /// Cool-down interval length in seconds.
    pub cool_down_interval_secs: u64,
    /// Users removed per cool-down interval.
    pub cool_down_users_per_interval: u32,
    /// Stable phase duration in seconds.
    pub experiment_duration_secs: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            num_users: 1,
            ramp_up_interval_secs: 1,
            ramp_up_users_per_interval: 1,
            cool_down_interval_secs: 1,
            cool_down_users_per_interval: 1,
            experiment_duration_secs: 60,
        }
    }
}

impl LoadConfig {
    /// Validates user counts.
    ///
    /// # Errors
    ///
    /// Returns [`LoadConfigError`] when a user count is zero.
    pub const fn validate(&self) -> Result<(), LoadConfigError> {
        if self.num_users == 0 {
            return Err(LoadConfigError::ZeroUsers);
        }
        if self.ramp_up_users_per_interval == 0 {
            return Err(LoadConfigError::ZeroUsersPerInterval {
                phase: "ramp-up",
            });
        }
        if self.cool_down_users_per_interval == 0 {
            return Err(LoadConfigError::ZeroUsersPerInterval {
                phase: "cool-down",
            });
        }
        Ok(())
    }

    /// Returns a copy with a different user count.
    #[must_use]
    pub const fn with_users(mut self, num_users: u32) -> Self {
        self.num_users = num_users;
        self
    }

    /// Returns the number of ramp-up intervals.
    #[must_use]
    pub fn ramp_up_intervals(&self) -> u64 {
        phase_intervals(self.num_users, self.ramp_up_users_per_interval)
    }

    /// Returns the number of cool-down intervals.
    #[must_use]
    pub fn cool_down_intervals(&self) -> u64 {
        phase_intervals(self.num_users, self.cool_down_users_per_interval)
    }

    /// Returns the ramp-up phase duration.
    #[must_use]
    pub fn ramp_up_duration(&self) -> Duration {
        Duration::from_secs(self.ramp_up_intervals().saturating_mul(self.ramp_up_interval_secs))
    }

    /// Returns the cool-down phase duration.
    #[must_use]
    pub fn cool_down_duration(&self) -> Duration {
        Duration::from_secs(self.cool_down_intervals().saturating_mul(self.cool_down_interval_secs))
    }

    /// Returns the stable phase duration.
    #[must_use]
    pub const fn stable_duration(&self) -> Duration {
        Duration::from_secs(self.experiment_duration_secs)
    }

    /// Returns the full step duration across all three phases.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.ramp_up_duration()
            .saturating_add(self.stable_duration())
            .saturating_add(self.cool_down_duration())
    }
}

// ============================================================================
// SECTION: Experiment Plans
// ============================================================================

/// Series of experiment steps with increasing load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentPlan {
    /// Number of steps.
    pub num_experiments: u32,
    /// Users at the last step.
    pub max_users: u32,
    /// Template for per-step load (its user count is replaced per step).
    pub template: LoadConfig,
}

impl Default for ExperimentPlan {
    fn default() -> Self {
        Self {
            num_experiments: 1,
            max_users: 1,
            template: LoadConfig::default(),
        }
    }
}

impl ExperimentPlan {
    /// Validates the plan and its template.
    ///
    /// # Errors
    ///
    /// Returns [`LoadConfigError`] when counts are zero.
    pub const fn validate(&self) -> Result<(), LoadConfigError> {
        if self.num_experiments == 0 {
            return Err(LoadConfigError::ZeroExperiments);
        }
        if self.max_users == 0 {
            return Err(LoadConfigError::ZeroUsers);
        }
        self.template.with_users(self.max_users).validate()
    }

    /// Returns a copy with a different step count.
    #[must_use]
    pub const fn with_experiments(mut self, num_experiments: u32) -> Self {
        self.num_experiments = num_experiments;
        self
    }

    /// Returns a copy with a different maximum user count.
    #[must_use]
    pub const fn with_max_users(mut self, max_users: u32) -> Self {
        self.max_users = max_users;
        self
    }

    /// Returns the user count for step `step` (0-based).
    #[must_use]
    pub fn users_for_step(&self, step: u32) -> u32 {
        let steps = u64::from(self.num_experiments.max(1));
        let numerator = u64::from(self.max_users).saturating_mul(u64::from(step) + 1);
        let users = numerator.div_ceil(steps).max(1);
        u32::try_from(users).unwrap_or(u32::MAX)
    }

    /// Returns the load configuration for step `step` (0-based).
    #[must_use]
    pub fn load_for_step(&self, step: u32) -> LoadConfig {
        self.template.with_users(self.users_for_step(step))
    }

    /// Returns the load configuration of every step in order.
    #[must_use]
    pub fn loads(&self) -> Vec<LoadConfig> {
        (0 .. self.num_experiments).map(|step| self.load_for_step(step)).collect()
    }

    /// Returns the summed duration of every step.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.loads().iter().fold(Duration::ZERO, |acc, load| acc.saturating_add(load.total_duration()))
    }
}

// ============================================================================
// SECTION: Datasets
// ============================================================================

/// Measurement data collected by one experiment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Step index (0-based).
    pub step: u32,
    /// Load the step ran with.
    pub load: LoadConfig,
    /// Merged measurement data of every measurement satellite.
    pub data: MeasurementData,
    /// Latest satellite clock when the data was collected, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at_ms: Option<u64>,
}

/// Datasets accumulated by one experiment series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSeries {
    /// Plan the series ran.
    pub plan: ExperimentPlan,
    /// One dataset per executed step.
    pub datasets: Vec<Dataset>,
}

impl ExperimentSeries {
    /// Creates an empty series for a plan.
    #[must_use]
    pub const fn new(plan: ExperimentPlan) -> Self {
        Self {
            plan,
            datasets: Vec::new(),
        }
    }

    /// Appends a dataset.
    pub fn push(&mut self, dataset: Dataset) {
        self.datasets.push(dataset);
    }

    /// Returns the dataset with the highest user count.
    #[must_use]
    pub fn highest_load(&self) -> Option<&Dataset> {
        self.datasets.iter().max_by_key(|d| (d.load.num_users, d.step))
    }

    /// Returns the dataset with the lowest user count.
    #[must_use]
    pub fn lowest_load(&self) -> Option<&Dataset> {
        self.datasets.iter().min_by_key(|d| (d.load.num_users, d.step))
    }
}
