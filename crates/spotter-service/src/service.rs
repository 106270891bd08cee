// crates/spotter-service/src/service.rs
// ============================================================================
// Module: Diagnosis Service
// Description: Loads configuration, wires extensions, and runs diagnosis jobs.
// Purpose: Single entry point shared by the CLI and embedding applications.
// Dependencies: spotter-config, spotter-core, spotter-detection, spotter-satellites
// ============================================================================

//! ## Overview
//! [`DiagnosisService::start`] does all fallible setup on the caller's
//! thread: a malformed config or satellite definition is returned as a
//! [`ServiceError`] and no job is started. The hierarchy is loaded leniently
//! for runs; [`DiagnosisService::validate`] loads it strictly and also checks
//! that every detectable problem resolves to a controller that accepts its
//! config.
//!
//! A start request while a job is in flight returns [`JobId::NONE`] and
//! builds nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use spotter_config::ConfigError;
use spotter_config::HierarchyLoadError;
use spotter_config::SpotterConfig;
use spotter_config::load_hierarchy;
use spotter_config::read_hierarchy;
use spotter_core::ControllerError;
use spotter_core::DiagnosisEngine;
use spotter_core::DiagnosisOutcome;
use spotter_core::DiagnosisReport;
use spotter_core::EngineConfig;
use spotter_core::EngineError;
use spotter_core::ExtensionError;
use spotter_core::ExtensionRegistry;
use spotter_core::JobContext;
use spotter_core::JobControl;
use spotter_core::JobId;
use spotter_core::JobState;
use spotter_core::ProblemHierarchy;
use spotter_core::ProblemId;
use spotter_core::ProgressReport;
use spotter_core::SatelliteBrokers;
use spotter_detection::register_builtin_controllers;
use spotter_satellites::register_builtin_satellites;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::artifacts::timestamp_now;
use crate::artifacts::write_job_artifacts;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Service errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The hierarchy could not be loaded.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyLoadError),
    /// An extension could not be registered or built.
    #[error(transparent)]
    Extension(#[from] ExtensionError),
    /// A detectable problem names no controller extension.
    #[error("problem {0} is detectable but names no extension")]
    MissingExtension(ProblemId),
    /// A problem's controller rejected its config.
    #[error("problem {problem}: {source}")]
    Controller {
        /// Problem whose config was rejected.
        problem: ProblemId,
        /// Controller failure.
        source: ControllerError,
    },
}

// ============================================================================
// SECTION: Prepared Run
// ============================================================================

/// Everything a job needs, built before the worker starts.
pub struct PreparedRun {
    /// Engine configuration.
    pub engine: EngineConfig,
    /// Satellite brokers built from the configured satellites.
    pub brokers: SatelliteBrokers,
    /// Problem hierarchy to walk.
    pub hierarchy: ProblemHierarchy,
    /// Directory receiving per-job artifacts.
    pub report_dir: PathBuf,
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationSummary {
    /// Number of configured satellites.
    pub satellites: usize,
    /// Loaded hierarchy.
    pub hierarchy: ProblemHierarchy,
    /// Number of detectable problems.
    pub detectable: usize,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Diagnosis service owning the extension registry and job controller.
#[derive(Clone)]
pub struct DiagnosisService {
    /// Registered extensions.
    registry: Arc<ExtensionRegistry>,
    /// Single-job controller.
    jobs: JobControl,
}

impl DiagnosisService {
    /// Creates a service over a prepared registry.
    #[must_use]
    pub fn new(registry: ExtensionRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            jobs: JobControl::new(),
        }
    }

    /// Creates a service with the built-in controllers and satellites.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Extension`] when registration fails.
    pub fn with_builtins() -> Result<Self, ServiceError> {
        let mut registry = ExtensionRegistry::new();
        register_builtin_controllers(&mut registry)?;
        register_builtin_satellites(&mut registry)?;
        Ok(Self::new(registry))
    }

    /// Returns the extension registry.
    #[must_use]
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Returns the job controller.
    #[must_use]
    pub const fn jobs(&self) -> &JobControl {
        &self.jobs
    }

    /// Loads configuration using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] when loading or validation fails.
    pub fn load_config(path: Option<&Path>) -> Result<SpotterConfig, ServiceError> {
        Ok(SpotterConfig::load(path)?)
    }

    /// Builds brokers and loads the hierarchy for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Extension`] when a satellite cannot be built.
    pub fn prepare(&self, config: &SpotterConfig) -> Result<PreparedRun, ServiceError> {
        let brokers = self.registry.build_brokers(&config.satellite_descriptors())?;
        let hierarchy = load_hierarchy(config.hierarchy_path().as_deref());
        Ok(PreparedRun {
            engine: config.engine_config(),
            brokers,
            hierarchy,
            report_dir: config.report_dir(),
        })
    }

    /// Loads the configuration at `path` and starts a job.
    ///
    /// Returns [`JobId::NONE`] when a job is already running.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when setup fails.
    pub fn start(&self, path: Option<&Path>) -> Result<JobId, ServiceError> {
        let config = Self::load_config(path)?;
        self.start_with(&config)
    }

    /// Starts a job for an already loaded configuration.
    ///
    /// Returns [`JobId::NONE`] when a job is already running.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when setup fails.
    pub fn start_with(&self, config: &SpotterConfig) -> Result<JobId, ServiceError> {
        if self.jobs.is_running() {
            warn!("diagnosis job already running, rejecting start");
            return Ok(JobId::NONE);
        }
        let prepared = self.prepare(config)?;
        let registry = Arc::clone(&self.registry);
        Ok(self.jobs.start(move |ctx| run_job(registry, prepared, &ctx)))
    }

    /// Returns the running job identifier, or [`JobId::NONE`] when idle.
    #[must_use]
    pub fn current_job_id(&self) -> JobId {
        self.jobs.current_job_id()
    }

    /// Checks the configuration, satellites, hierarchy, and controller configs.
    ///
    /// # Errors
    ///
    /// Returns the first [`ServiceError`] found.
    pub fn validate(&self, config: &SpotterConfig) -> Result<ValidationSummary, ServiceError> {
        let descriptors = config.satellite_descriptors();
        self.registry.build_brokers(&descriptors)?;
        let hierarchy = match config.hierarchy_path() {
            Some(path) => read_hierarchy(&path)?,
            None => ProblemHierarchy::default_hierarchy(),
        };
        let mut detectable = 0;
        for node in hierarchy.preorder().into_iter().filter(|node| node.is_detectable()) {
            detectable += 1;
            let extension =
                node.extension_name.as_deref().ok_or_else(|| ServiceError::MissingExtension(node.unique_id.clone()))?;
            let mut controller = self.registry.resolve_controller(extension)?;
            controller.load_properties(&node.config).map_err(|source| ServiceError::Controller {
                problem: node.unique_id.clone(),
                source,
            })?;
        }
        Ok(ValidationSummary {
            satellites: descriptors.len(),
            hierarchy,
            detectable,
        })
    }

    /// Returns true while a job is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.jobs.is_running()
    }

    /// Returns the state of the latest job.
    #[must_use]
    pub fn job_state(&self) -> JobState {
        self.jobs.job_state()
    }

    /// Returns the report of the latest completed job.
    #[must_use]
    pub fn last_report(&self) -> Option<DiagnosisReport> {
        self.jobs.last_report()
    }

    /// Returns the error of the latest job, if it was cancelled.
    #[must_use]
    pub fn last_run_error(&self) -> Option<EngineError> {
        self.jobs.last_run_error()
    }

    /// Returns a snapshot of per-problem progress.
    #[must_use]
    pub fn progress(&self) -> ProgressReport {
        self.jobs.current_progress_report()
    }

    /// Requests cooperative shutdown of the running job.
    pub fn request_shutdown(&self) {
        self.jobs.request_shutdown();
    }

    /// Blocks until the latest job has ended.
    pub fn wait(&self) {
        self.jobs.wait();
    }
}

// ============================================================================
// SECTION: Job Body
// ============================================================================

/// Runs the engine and persists the job's artifacts.
fn run_job(registry: Arc<ExtensionRegistry>, prepared: PreparedRun, ctx: &JobContext) -> DiagnosisOutcome {
    let PreparedRun {
        engine,
        brokers,
        hierarchy,
        report_dir,
    } = prepared;
    let engine = DiagnosisEngine::new(registry, brokers, engine).attach(ctx);
    let mut outcome = engine.run(ctx.job_id, &hierarchy);
    outcome.report.generated_at = timestamp_now();
    match write_job_artifacts(&report_dir, &outcome.report, &engine.brokers().measurement) {
        Ok(artifacts) => info!(job = ctx.job_id.get(), dir = %artifacts.dir.display(), "stored job artifacts"),
        Err(err) => warn!(job = ctx.job_id.get(), error = %err, "failed to store job artifacts"),
    }
    outcome
}
