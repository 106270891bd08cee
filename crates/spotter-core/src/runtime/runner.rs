// crates/spotter-core/src/runtime/runner.rs
// ============================================================================
// Module: Spotter Experiment Runner
// Description: Phase state machine for experiment series.
// Purpose: Drive brokers through instrument, load, measure, and cleanup phases.
// Dependencies: crate::{core, interfaces, runtime}, thiserror, tracing
// ============================================================================

//! ## Overview
//! One step runs the phases
//! `INIT -> INSTRUMENT -> START_LOAD -> RAMP_UP -> ENABLE_MONITORING -> STABLE ->
//! DISABLE_MONITORING -> COOL_DOWN -> COLLECT_DATA -> UNINSTRUMENT`, and a series
//! repeats the step once per planned experiment. Satellites are initialized
//! once before the first step.
//!
//! Invariants:
//! - Monitoring is enabled only after ramp-up and disabled before cool-down.
//! - Uninstrument runs exactly once per started step, on success and failure.
//! - A cleanup failure never masks the error that ended the step.
//! - Shutdown requests are honoured at step boundaries only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::Dataset;
use crate::core::DiagnosisProgress;
use crate::core::DiagnosisStatus;
use crate::core::ExperimentPlan;
use crate::core::ExperimentSeries;
use crate::core::InstrumentationDescription;
use crate::core::LoadConfig;
use crate::core::LoadConfigError;
use crate::core::ProblemId;
use crate::interfaces::InstrumentationError;
use crate::interfaces::MeasurementError;
use crate::interfaces::WorkloadError;
use crate::runtime::broker::SatelliteBrokers;
use crate::runtime::progress::ProgressTracker;
use crate::runtime::shutdown::ShutdownSignal;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that end an experiment series.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExperimentError {
    /// An instrumentation satellite failed.
    #[error(transparent)]
    Instrumentation(#[from] InstrumentationError),
    /// A measurement satellite failed.
    #[error(transparent)]
    Measurement(#[from] MeasurementError),
    /// A workload satellite failed.
    #[error(transparent)]
    Workload(#[from] WorkloadError),
    /// The experiment plan is invalid.
    #[error("invalid experiment plan: {0}")]
    InvalidPlan(#[from] LoadConfigError),
    /// Shutdown was requested at a step boundary.
    #[error("shutdown requested")]
    ShutdownRequested,
}

// ============================================================================
// SECTION: Phases
// ============================================================================

/// Phase of a single experiment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentPhase {
    /// Step setup.
    Init,
    /// Instrumentation is applied.
    Instrument,
    /// Load generation starts.
    StartLoad,
    /// Waiting for ramp-up to finish.
    RampUp,
    /// Monitoring is switched on.
    EnableMonitoring,
    /// Waiting for the stable phase to finish.
    Stable,
    /// Monitoring is switched off.
    DisableMonitoring,
    /// Waiting for cool-down to finish.
    CoolDown,
    /// Measurement data is fetched.
    CollectData,
    /// Instrumentation is removed.
    Uninstrument,
}

impl ExperimentPhase {
    /// Every phase in execution order.
    pub const ALL: [Self; 10] = [
        Self::Init,
        Self::Instrument,
        Self::StartLoad,
        Self::RampUp,
        Self::EnableMonitoring,
        Self::Stable,
        Self::DisableMonitoring,
        Self::CoolDown,
        Self::CollectData,
        Self::Uninstrument,
    ];

    /// Returns the diagnosis status published while in this phase.
    ///
    /// Step setup reports `INSTRUMENTING`: satellites are already initialized
    /// when a step starts, so a step never falls back to `INITIALIZING`.
    #[must_use]
    pub const fn status(self) -> DiagnosisStatus {
        match self {
            Self::Init | Self::Instrument => DiagnosisStatus::Instrumenting,
            Self::StartLoad | Self::RampUp => DiagnosisStatus::ExperimentingRampUp,
            Self::EnableMonitoring | Self::Stable => DiagnosisStatus::ExperimentingStablePhase,
            Self::DisableMonitoring | Self::CoolDown => DiagnosisStatus::ExperimentingCoolDown,
            Self::CollectData => DiagnosisStatus::CollectingData,
            Self::Uninstrument => DiagnosisStatus::Uninstrumenting,
        }
    }

    /// Returns the stable uppercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Instrument => "INSTRUMENT",
            Self::StartLoad => "START_LOAD",
            Self::RampUp => "RAMP_UP",
            Self::EnableMonitoring => "ENABLE_MONITORING",
            Self::Stable => "STABLE",
            Self::DisableMonitoring => "DISABLE_MONITORING",
            Self::CoolDown => "COOL_DOWN",
            Self::CollectData => "COLLECT_DATA",
            Self::Uninstrument => "UNINSTRUMENT",
        }
    }

    /// Returns the position of the phase within a step.
    #[must_use]
    const fn ordinal(self) -> u32 {
        match self {
            Self::Init => 0,
            Self::Instrument => 1,
            Self::StartLoad => 2,
            Self::RampUp => 3,
            Self::EnableMonitoring => 4,
            Self::Stable => 5,
            Self::DisableMonitoring => 6,
            Self::CoolDown => 7,
            Self::CollectData => 8,
            Self::Uninstrument => 9,
        }
    }
}

impl fmt::Display for ExperimentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Drives brokers through experiment series and publishes progress.
pub struct ExperimentRunner<'a> {
    /// Brokers of the current run.
    brokers: &'a SatelliteBrokers,
    /// Shared progress tracker.
    progress: &'a ProgressTracker,
    /// Job shutdown flag.
    shutdown: &'a ShutdownSignal,
    /// Problems whose progress follows this runner.
    problems: Vec<ProblemId>,
}

impl<'a> ExperimentRunner<'a> {
    /// Creates a runner publishing progress for `problems`.
    #[must_use]
    pub const fn new(
        brokers: &'a SatelliteBrokers,
        progress: &'a ProgressTracker,
        shutdown: &'a ShutdownSignal,
        problems: Vec<ProblemId>,
    ) -> Self {
        Self {
            brokers,
            progress,
            shutdown,
            problems,
        }
    }

    /// Returns the problems this runner reports progress for.
    #[must_use]
    pub fn problems(&self) -> &[ProblemId] {
        &self.problems
    }

    /// Runs every step of `plan` and returns the collected datasets.
    ///
    /// An empty `description` skips the instrument call; uninstrument still
    /// runs once per step.
    ///
    /// # Errors
    ///
    /// Returns [`ExperimentError`] when the plan is invalid, a satellite fails,
    /// or shutdown is requested before a step starts.
    pub fn run_series(
        &self,
        plan: &ExperimentPlan,
        description: &InstrumentationDescription,
    ) -> Result<ExperimentSeries, ExperimentError> {
        plan.validate()?;
        let loads = plan.loads();
        let total = plan.total_duration();
        self.publish(DiagnosisStatus::WarmUp, 0.0, total, "initializing satellites".to_string());
        self.initialize_satellites()?;

        let mut series = ExperimentSeries::new(*plan);
        for (step, load) in (0_u32 ..).zip(loads.iter()) {
            if self.shutdown.is_requested() {
                info!(step, "shutdown requested, stopping experiment series");
                return Err(ExperimentError::ShutdownRequested);
            }
            info!(step, users = load.num_users, steps = plan.num_experiments, "starting experiment step");
            let dataset = self.run_step(plan, &loads, step, load, description)?;
            series.push(dataset);
        }
        Ok(series)
    }

    /// Initializes every broker.
    ///
    /// # Errors
    ///
    /// Returns the first satellite failure.
    pub fn initialize_satellites(&self) -> Result<(), ExperimentError> {
        self.brokers.instrumentation.initialize()?;
        self.brokers.measurement.initialize()?;
        self.brokers.workload.initialize()?;
        Ok(())
    }

    /// Runs one step and always uninstruments afterwards.
    fn run_step(
        &self,
        plan: &ExperimentPlan,
        loads: &[LoadConfig],
        step: u32,
        load: &LoadConfig,
        description: &InstrumentationDescription,
    ) -> Result<Dataset, ExperimentError> {
        let outcome = self.measure_step(plan, loads, step, load, description);
        self.enter(plan, loads, step, ExperimentPhase::Uninstrument);
        let cleanup = self.brokers.instrumentation.uninstrument();
        match (outcome, cleanup) {
            (Ok(dataset), Ok(())) => Ok(dataset),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup_err)) => {
                warn!(step, error = %cleanup_err, "uninstrument failed after step failure");
                Err(err)
            }
        }
    }

    /// Runs the phases from instrumentation to data collection.
    fn measure_step(
        &self,
        plan: &ExperimentPlan,
        loads: &[LoadConfig],
        step: u32,
        load: &LoadConfig,
        description: &InstrumentationDescription,
    ) -> Result<Dataset, ExperimentError> {
        self.enter(plan, loads, step, ExperimentPhase::Init);
        self.enter(plan, loads, step, ExperimentPhase::Instrument);
        if description.is_empty() {
            debug!(step, "no instrumentation requested");
        } else {
            self.brokers.instrumentation.instrument(description)?;
        }

        self.enter(plan, loads, step, ExperimentPhase::StartLoad);
        self.brokers.workload.start_load(load)?;
        self.enter(plan, loads, step, ExperimentPhase::RampUp);
        self.brokers.workload.wait_for_warmup_phase_termination()?;

        self.enter(plan, loads, step, ExperimentPhase::EnableMonitoring);
        self.brokers.measurement.enable_monitoring()?;
        self.enter(plan, loads, step, ExperimentPhase::Stable);
        self.brokers.workload.wait_for_experiment_phase_termination()?;
        self.enter(plan, loads, step, ExperimentPhase::DisableMonitoring);
        self.brokers.measurement.disable_monitoring()?;

        self.enter(plan, loads, step, ExperimentPhase::CoolDown);
        self.brokers.workload.wait_for_finished_load()?;

        self.enter(plan, loads, step, ExperimentPhase::CollectData);
        let data = self.brokers.measurement.measurement_data()?;
        let collected_at_ms = self.brokers.measurement.current_time()?;
        debug!(step, records = data.len(), "collected measurement data");
        Ok(Dataset {
            step,
            load: *load,
            data,
            collected_at_ms,
        })
    }

    /// Publishes progress for a phase transition.
    fn enter(&self, plan: &ExperimentPlan, loads: &[LoadConfig], step: u32, phase: ExperimentPhase) {
        debug!(step, phase = %phase, "experiment phase");
        let steps = f64::from(plan.num_experiments.max(1));
        let phases = f64::from(u32::try_from(ExperimentPhase::ALL.len()).unwrap_or(u32::MAX));
        let fraction = (f64::from(step) + f64::from(phase.ordinal()) / phases) / steps;
        let remaining = remaining_duration(loads, step, phase);
        self.publish(
            phase.status(),
            fraction,
            remaining,
            format!("experiment {} of {}: {}", step.saturating_add(1), plan.num_experiments, phase),
        );
    }

    /// Writes one progress record per tracked problem.
    fn publish(&self, status: DiagnosisStatus, fraction: f64, remaining: Duration, message: String) {
        let record = DiagnosisProgress {
            status,
            estimated_progress: fraction.clamp(0.0, 1.0),
            estimated_remaining_secs: remaining.as_secs(),
            message,
        };
        for problem in &self.problems {
            self.progress.update(problem, record.clone());
        }
    }
}

/// Estimates the time left from the start of `phase` in `step`.
fn remaining_duration(loads: &[LoadConfig], step: u32, phase: ExperimentPhase) -> Duration {
    let index = usize::try_from(step).unwrap_or(usize::MAX);
    let later: Duration = loads.iter().skip(index.saturating_add(1)).map(LoadConfig::total_duration).sum();
    let current = loads.get(index).map_or(Duration::ZERO, |load| match phase {
        ExperimentPhase::Init | ExperimentPhase::Instrument | ExperimentPhase::StartLoad | ExperimentPhase::RampUp => {
            load.total_duration()
        }
        ExperimentPhase::EnableMonitoring | ExperimentPhase::Stable => {
            load.stable_duration().saturating_add(load.cool_down_duration())
        }
        ExperimentPhase::DisableMonitoring | ExperimentPhase::CoolDown => load.cool_down_duration(),
        ExperimentPhase::CollectData | ExperimentPhase::Uninstrument => Duration::ZERO,
    });
    later.saturating_add(current)
}
