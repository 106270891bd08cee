// crates/spotter-core/src/runtime/engine.rs
// ============================================================================
// Module: Spotter Diagnosis Engine
// Description: Depth-first hierarchy walk running detection controllers.
// Purpose: Decide node by node whether each problem is present.
// Dependencies: crate::{core, runtime}, thiserror, tracing
// ============================================================================

//! ## Overview
//! The engine visits the hierarchy in pre-order. Grouping nodes are skipped
//! and lead into their children. Detectable nodes get a fresh controller
//! from the registry, run their experiments, and store their verdict in the
//! blackboard. The [`TraversalPolicy`] decides whether children are visited.
//!
//! Before visiting the children of a node, the engine looks for siblings whose
//! controllers share a reuse scope. Each such group gets one merged experiment
//! series whose datasets every member analyzes.
//!
//! Invariants:
//! - The engine is the only error boundary: an escaped error records a
//!   not-detected failure result for the node, stops the walk, and marks the
//!   job `CANCELLED`.
//! - A node that already has a result in the current run is not run again.
//! - Shutdown requests are honoured between nodes and between steps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::DiagnosisReport;
use crate::core::DiagnosisStatus;
use crate::core::ExperimentPlan;
use crate::core::ExperimentSeries;
use crate::core::InstrumentationDescription;
use crate::core::JobId;
use crate::core::JobState;
use crate::core::ProblemHierarchy;
use crate::core::ProblemId;
use crate::core::ProblemNode;
use crate::core::ReportEntry;
use crate::core::SpotterResult;
use crate::runtime::blackboard::ResultBlackboard;
use crate::runtime::broker::SatelliteBrokers;
use crate::runtime::controller::ControllerError;
use crate::runtime::controller::DetectionController;
use crate::runtime::controller::ExperimentContext;
use crate::runtime::job::JobContext;
use crate::runtime::progress::ProgressTracker;
use crate::runtime::registry::ExtensionError;
use crate::runtime::registry::ExtensionRegistry;
use crate::runtime::runner::ExperimentError;
use crate::runtime::runner::ExperimentRunner;
use crate::runtime::shutdown::ShutdownSignal;
use crate::runtime::traversal::NodeVerdict;
use crate::runtime::traversal::TraversalPolicy;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Rule deciding descent into children.
    pub traversal: TraversalPolicy,
    /// Plan defaults handed to controllers.
    pub default_plan: ExperimentPlan,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that stop a diagnosis run.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A detection controller failed.
    #[error("detection failed for problem {problem}: {source}")]
    Controller {
        /// Problem being investigated.
        problem: ProblemId,
        /// Controller failure.
        source: ControllerError,
    },
    /// The controller extension could not be resolved.
    #[error("extension for problem {problem} unavailable: {source}")]
    Extension {
        /// Problem being investigated.
        problem: ProblemId,
        /// Registry failure.
        source: ExtensionError,
    },
    /// A detectable problem names no controller extension.
    #[error("detectable problem {0} names no detection extension")]
    MissingExtension(ProblemId),
    /// Shutdown was requested.
    #[error("shutdown requested")]
    ShutdownRequested,
    /// The run could not be set up.
    #[error("diagnosis setup failed: {0}")]
    Setup(String),
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of one diagnosis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisOutcome {
    /// Final job state.
    pub state: JobState,
    /// Report assembled from the blackboard.
    pub report: DiagnosisReport,
    /// Error that cancelled the run, if any.
    pub error: Option<EngineError>,
}

impl DiagnosisOutcome {
    /// Builds a cancelled outcome for a run that failed before the walk began.
    #[must_use]
    pub fn failed(job_id: JobId, error: EngineError) -> Self {
        let mut report = DiagnosisReport::new(job_id, JobState::Cancelled, Vec::new());
        report.error = Some(error.to_string());
        Self {
            state: JobState::Cancelled,
            report,
            error: Some(error),
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Controller prepared for a sibling group with its shared series.
struct PreparedDetection {
    /// Controller with its properties loaded.
    controller: Box<dyn DetectionController>,
    /// Series shared by the group.
    series: Rc<ExperimentSeries>,
}

/// Sibling controllers sharing one reuse scope.
type ReuseGroup<'n> = Vec<(&'n ProblemNode, Box<dyn DetectionController>)>;

/// Top-level hierarchy walker.
pub struct DiagnosisEngine {
    /// Extension registry.
    registry: Arc<ExtensionRegistry>,
    /// Satellite brokers of this run.
    brokers: SatelliteBrokers,
    /// Result store.
    blackboard: Arc<ResultBlackboard>,
    /// Progress store.
    progress: Arc<ProgressTracker>,
    /// Cooperative shutdown flag.
    shutdown: ShutdownSignal,
    /// Engine configuration.
    config: EngineConfig,
}

impl DiagnosisEngine {
    /// Creates an engine with private result and progress stores.
    #[must_use]
    pub fn new(registry: Arc<ExtensionRegistry>, brokers: SatelliteBrokers, config: EngineConfig) -> Self {
        Self {
            registry,
            brokers,
            blackboard: Arc::new(ResultBlackboard::new()),
            progress: Arc::new(ProgressTracker::new()),
            shutdown: ShutdownSignal::new(),
            config,
        }
    }

    /// Uses the stores and shutdown signal of a job context.
    #[must_use]
    pub fn attach(mut self, ctx: &JobContext) -> Self {
        self.blackboard = Arc::clone(&ctx.blackboard);
        self.progress = Arc::clone(&ctx.progress);
        self.shutdown = ctx.shutdown.clone();
        self
    }

    /// Returns the result blackboard.
    #[must_use]
    pub fn blackboard(&self) -> &ResultBlackboard {
        &self.blackboard
    }

    /// Returns the progress tracker.
    #[must_use]
    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Returns the shutdown signal.
    #[must_use]
    pub const fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Returns the satellite brokers.
    #[must_use]
    pub const fn brokers(&self) -> &SatelliteBrokers {
        &self.brokers
    }

    /// Walks the hierarchy and assembles the report.
    #[must_use]
    pub fn run(&self, job_id: JobId, hierarchy: &ProblemHierarchy) -> DiagnosisOutcome {
        self.blackboard.reset();
        self.progress.reset();
        for node in hierarchy.preorder().into_iter().filter(|node| node.is_detectable()) {
            self.progress.set_status(&node.unique_id, DiagnosisStatus::Pending);
        }
        info!(job = job_id.get(), problems = hierarchy.len(), "starting hierarchy walk");

        let mut prepared = BTreeMap::new();
        let (state, error) = match self.visit(hierarchy.root(), &mut prepared) {
            Ok(()) => (JobState::Finished, None),
            Err(err) => {
                warn!(job = job_id.get(), error = %err, "diagnosis cancelled");
                (JobState::Cancelled, Some(err))
            }
        };
        let entries = self
            .blackboard
            .entries()
            .iter()
            .map(|(problem, result)| ReportEntry::from_result(problem, result))
            .collect();
        let mut report = DiagnosisReport::new(job_id, state, entries);
        report.error = error.as_ref().map(ToString::to_string);
        info!(job = job_id.get(), state = %state, detected = report.detected_count(), "hierarchy walk ended");
        DiagnosisOutcome {
            state,
            report,
            error,
        }
    }

    /// Visits one node and, depending on the verdict, its children.
    fn visit(
        &self,
        node: &ProblemNode,
        prepared: &mut BTreeMap<ProblemId, PreparedDetection>,
    ) -> Result<(), EngineError> {
        if self.shutdown.is_requested() {
            return Err(EngineError::ShutdownRequested);
        }
        let verdict = if !node.is_detectable() {
            debug!(problem = %node.unique_id, "grouping node");
            NodeVerdict::Grouping
        } else if let Some(result) = self.blackboard.result(&node.unique_id) {
            debug!(problem = %node.unique_id, "reusing stored result");
            NodeVerdict::from_result(&result)
        } else {
            let result = self.detect(node, prepared.remove(&node.unique_id))?;
            NodeVerdict::from_result(&result)
        };

        if node.children.is_empty() {
            return Ok(());
        }
        if !self.config.traversal.should_descend(verdict) {
            info!(problem = %node.unique_id, children = node.children.len(), "pruning subtree");
            return Ok(());
        }
        let mut child_prepared = self.prepare_shared(&node.children)?;
        for child in &node.children {
            self.visit(child, &mut child_prepared)?;
        }
        Ok(())
    }

    /// Runs detection for a node and records the verdict.
    fn detect(&self, node: &ProblemNode, prepared: Option<PreparedDetection>) -> Result<SpotterResult, EngineError> {
        let outcome = match prepared {
            Some(prepared) => {
                debug!(problem = %node.unique_id, "analyzing shared experiment series");
                self.progress.set_status(&node.unique_id, DiagnosisStatus::Analysing);
                Ok(prepared.controller.analyze(&prepared.series))
            }
            None => {
                self.progress.set_status(&node.unique_id, DiagnosisStatus::Initializing);
                self.run_controller(node)
            }
        };
        match outcome {
            Ok(result) => {
                self.record(node, result.clone());
                Ok(result)
            }
            Err(EngineError::ShutdownRequested) => Err(EngineError::ShutdownRequested),
            Err(err) => {
                self.record(node, SpotterResult::failure(err.to_string()));
                Err(err)
            }
        }
    }

    /// Resolves, configures, and runs the node's controller.
    fn run_controller(&self, node: &ProblemNode) -> Result<SpotterResult, EngineError> {
        let controller = self.instantiate(node)?;
        let runner = ExperimentRunner::new(
            &self.brokers,
            &self.progress,
            &self.shutdown,
            vec![node.unique_id.clone()],
        );
        let ctx = ExperimentContext::new(runner, self.config.default_plan);
        let series = controller
            .execute_experiments(&ctx)
            .map_err(|source| controller_failure(&node.unique_id, source))?;
        self.progress.set_status(&node.unique_id, DiagnosisStatus::Analysing);
        Ok(controller.analyze(&series))
    }

    /// Creates the node's controller and loads its config.
    fn instantiate(&self, node: &ProblemNode) -> Result<Box<dyn DetectionController>, EngineError> {
        let extension = node
            .extension_name
            .as_deref()
            .ok_or_else(|| EngineError::MissingExtension(node.unique_id.clone()))?;
        let mut controller =
            self.registry.resolve_controller(extension).map_err(|source| EngineError::Extension {
                problem: node.unique_id.clone(),
                source,
            })?;
        controller
            .load_properties(&node.config)
            .map_err(|source| controller_failure(&node.unique_id, source))?;
        Ok(controller)
    }

    /// Stores a verdict and publishes the terminal status.
    fn record(&self, node: &ProblemNode, result: SpotterResult) {
        let status =
            if result.is_detected() { DiagnosisStatus::Detected } else { DiagnosisStatus::NotDetected };
        info!(problem = %node.unique_id, name = node.name.as_str(), detected = result.is_detected(), "verdict");
        self.blackboard.put_result(&node.summary(), result);
        self.progress.set_status(&node.unique_id, status);
    }

    /// Runs one shared series per reuse scope with at least two sibling members.
    fn prepare_shared(&self, children: &[ProblemNode]) -> Result<BTreeMap<ProblemId, PreparedDetection>, EngineError> {
        let mut groups: BTreeMap<String, ReuseGroup<'_>> = BTreeMap::new();
        for child in children {
            if !child.is_detectable() || self.blackboard.contains(&child.unique_id) {
                continue;
            }
            // Resolution errors surface again when the child is visited on its own.
            let Ok(controller) = self.instantiate(child) else {
                continue;
            };
            let scope = controller.experiment_reuser().map(|reuser| reuser.reuse_scope().to_string());
            if let Some(scope) = scope {
                groups.entry(scope).or_default().push((child, controller));
            }
        }

        let mut prepared = BTreeMap::new();
        for (scope, members) in groups {
            if members.len() < 2 {
                continue;
            }
            let series = Rc::new(self.run_shared_series(&scope, &members)?);
            for (node, controller) in members {
                prepared.insert(node.unique_id.clone(), PreparedDetection {
                    controller,
                    series: Rc::clone(&series),
                });
            }
        }
        Ok(prepared)
    }

    /// Runs the merged experiment series of one reuse group.
    fn run_shared_series(&self, scope: &str, members: &ReuseGroup<'_>) -> Result<ExperimentSeries, EngineError> {
        let mut description = InstrumentationDescription::new();
        let mut num_experiments = 1;
        let mut max_users = self.config.default_plan.max_users;
        for (_, controller) in members {
            if let Some(reuser) = controller.experiment_reuser() {
                description.merge(&reuser.instrumentation_description());
                max_users = max_users.max(reuser.max_users().unwrap_or(0));
            }
            num_experiments = num_experiments.max(controller.num_of_experiments());
        }
        let problems: Vec<ProblemId> = members.iter().map(|(node, _)| node.unique_id.clone()).collect();
        for problem in &problems {
            self.progress.set_status(problem, DiagnosisStatus::Initializing);
        }
        info!(scope, members = problems.len(), max_users, "running shared experiment series");

        let runner = ExperimentRunner::new(&self.brokers, &self.progress, &self.shutdown, problems);
        let plan = self.config.default_plan.with_experiments(num_experiments).with_max_users(max_users);
        match runner.run_series(&plan, &description) {
            Ok(series) => Ok(series),
            Err(ExperimentError::ShutdownRequested) => Err(EngineError::ShutdownRequested),
            Err(err) => {
                for (node, _) in members {
                    self.record(node, SpotterResult::failure(err.to_string()));
                }
                let problem = runner.problems().first().cloned().unwrap_or_else(|| ProblemId::new(scope));
                Err(EngineError::Controller {
                    problem,
                    source: ControllerError::Experiment(err),
                })
            }
        }
    }
}

/// Maps a controller error onto the engine error space.
fn controller_failure(problem: &ProblemId, source: ControllerError) -> EngineError {
    if source.is_shutdown() {
        EngineError::ShutdownRequested
    } else {
        EngineError::Controller {
            problem: problem.clone(),
            source,
        }
    }
}
