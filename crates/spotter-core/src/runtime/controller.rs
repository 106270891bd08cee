// crates/spotter-core/src/runtime/controller.rs
// ============================================================================
// Module: Spotter Detection Controllers
// Description: Contract for per-problem detection controllers.
// Purpose: Let extensions choose experiments and turn datasets into verdicts.
// Dependencies: crate::{core, runtime}, thiserror
// ============================================================================

//! ## Overview
//! The engine creates one [`DetectionController`] per detectable node through
//! the extension registry, hands it the node's config, lets it run its
//! experiments through an [`ExperimentContext`], and asks it to analyze the
//! resulting series. Most controllers delegate experiment execution to
//! [`run_default_series`].
//!
//! A controller may also expose the [`ExperimentReuser`] capability. Sibling
//! controllers that share a reuse scope then get a single merged experiment
//! series run on their behalf and analyze the shared datasets.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::ExperimentPlan;
use crate::core::ExperimentSeries;
use crate::core::InstrumentationDescription;
use crate::core::SpotterResult;
use crate::runtime::runner::ExperimentError;
use crate::runtime::runner::ExperimentRunner;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Detection controller errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// A config value is missing or malformed.
    #[error("invalid controller config '{key}': {message}")]
    InvalidConfig {
        /// Config key.
        key: String,
        /// Failure details.
        message: String,
    },
    /// The experiment series failed.
    #[error(transparent)]
    Experiment(#[from] ExperimentError),
}

impl ControllerError {
    /// Builds an [`ControllerError::InvalidConfig`] error.
    #[must_use]
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns true when the error stems from a shutdown request.
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self, Self::Experiment(ExperimentError::ShutdownRequested))
    }
}

// ============================================================================
// SECTION: Experiment Context
// ============================================================================

/// Everything a controller needs to run experiments.
pub struct ExperimentContext<'a> {
    /// Runner bound to the current problem.
    runner: ExperimentRunner<'a>,
    /// Plan defaults from configuration.
    default_plan: ExperimentPlan,
}

impl<'a> ExperimentContext<'a> {
    /// Creates a context.
    #[must_use]
    pub const fn new(runner: ExperimentRunner<'a>, default_plan: ExperimentPlan) -> Self {
        Self {
            runner,
            default_plan,
        }
    }

    /// Returns the experiment runner.
    #[must_use]
    pub const fn runner(&self) -> &ExperimentRunner<'a> {
        &self.runner
    }

    /// Returns the configured default plan.
    #[must_use]
    pub const fn default_plan(&self) -> ExperimentPlan {
        self.default_plan
    }
}

// ============================================================================
// SECTION: Controller Contract
// ============================================================================

/// Per-problem detection controller.
pub trait DetectionController {
    /// Loads the node's config into local state.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] when a value is malformed.
    fn load_properties(&mut self, config: &BTreeMap<String, String>) -> Result<(), ControllerError>;

    /// Returns the number of experiment steps the controller needs.
    fn num_of_experiments(&self) -> u32;

    /// Runs the controller's experiments.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError`] when the experiment series fails.
    fn execute_experiments(&self, ctx: &ExperimentContext<'_>) -> Result<ExperimentSeries, ControllerError>;

    /// Turns a completed series into a verdict.
    fn analyze(&self, series: &ExperimentSeries) -> SpotterResult;

    /// Returns the reuse capability, if the controller supports it.
    fn experiment_reuser(&self) -> Option<&dyn ExperimentReuser> {
        None
    }
}

/// Capability of sharing an experiment series with sibling controllers.
pub trait ExperimentReuser {
    /// Returns the scope label; siblings with equal labels share one series.
    fn reuse_scope(&self) -> &str;

    /// Returns the instrumentation this controller needs from the shared series.
    fn instrumentation_description(&self) -> InstrumentationDescription;

    /// Returns the maximum load this controller asks for, if it overrides the
    /// configured plan.
    fn max_users(&self) -> Option<u32> {
        None
    }
}

// ============================================================================
// SECTION: Default Series
// ============================================================================

/// Runs the default experiment series with the configured plan.
///
/// `num_experiments` replaces the plan's step count and `max_users`, when
/// given, replaces the plan's maximum load.
///
/// # Errors
///
/// Returns [`ControllerError::Experiment`] when the series fails.
pub fn run_default_series(
    ctx: &ExperimentContext<'_>,
    description: &InstrumentationDescription,
    num_experiments: u32,
    max_users: Option<u32>,
) -> Result<ExperimentSeries, ControllerError> {
    let mut plan = ctx.default_plan().with_experiments(num_experiments.max(1));
    if let Some(max_users) = max_users {
        plan = plan.with_max_users(max_users);
    }
    Ok(ctx.runner().run_series(&plan, description)?)
}
