// crates/spotter-core/src/runtime/job.rs
// ============================================================================
// Module: Spotter Job Control
// Description: Single-job worker lifecycle and concurrent status queries.
// Purpose: Run one diagnosis at a time and expose its state to callers.
// Dependencies: crate::{core, runtime}, tracing
// ============================================================================

//! ## Overview
//! [`JobControl`] starts at most one diagnosis job at a time on a dedicated
//! worker thread. A start request while a job is in flight is rejected with
//! [`JobId::NONE`] and never queued. The blackboard and progress tracker are
//! shared with the worker so callers can poll them during the run.
//!
//! Invariants:
//! - Job identifiers start at 1 and increase by one per accepted start.
//! - `current_job_id` is `0` whenever no job is running.
//! - A panicking job ends `CANCELLED` with a retrievable error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;

use tracing::info;
use tracing::warn;

use crate::core::DiagnosisReport;
use crate::core::JobId;
use crate::core::JobState;
use crate::core::ProgressReport;
use crate::runtime::blackboard::ResultBlackboard;
use crate::runtime::engine::DiagnosisOutcome;
use crate::runtime::engine::EngineError;
use crate::runtime::progress::ProgressTracker;
use crate::runtime::shutdown::ShutdownSignal;

// ============================================================================
// SECTION: Job Context
// ============================================================================

/// Handles passed to the job body.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Identifier of the running job.
    pub job_id: JobId,
    /// Shared result blackboard.
    pub blackboard: Arc<ResultBlackboard>,
    /// Shared progress tracker.
    pub progress: Arc<ProgressTracker>,
    /// Job shutdown flag.
    pub shutdown: ShutdownSignal,
}

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// State shared between callers and the worker.
#[derive(Debug)]
struct JobShared {
    /// True while a job is in flight.
    running: AtomicBool,
    /// Next job identifier to hand out.
    next_id: AtomicU64,
    /// Identifier of the running job, `0` when idle.
    current: AtomicU64,
    /// Lifecycle state of the latest job.
    state: RwLock<JobState>,
    /// Error of the latest job, if it was cancelled.
    last_error: RwLock<Option<EngineError>>,
    /// Report of the latest finished or cancelled job.
    last_report: RwLock<Option<DiagnosisReport>>,
    /// Shared result blackboard.
    blackboard: Arc<ResultBlackboard>,
    /// Shared progress tracker.
    progress: Arc<ProgressTracker>,
    /// Shutdown flag of the running job.
    shutdown: ShutdownSignal,
    /// Worker handle of the latest job.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl JobShared {
    /// Publishes the end of a job and frees the slot.
    fn finish(&self, state: JobState, report: Option<DiagnosisReport>, error: Option<EngineError>) {
        let job = self.current.load(Ordering::Acquire);
        match &error {
            Some(err) => warn!(job, state = %state, error = %err, "diagnosis job ended"),
            None => info!(job, state = %state, "diagnosis job ended"),
        }
        *self.last_report.write().unwrap_or_else(PoisonError::into_inner) = report;
        *self.last_error.write().unwrap_or_else(PoisonError::into_inner) = error;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
        self.current.store(JobId::NONE.get(), Ordering::Release);
        self.running.store(false, Ordering::Release);
    }
}

// ============================================================================
// SECTION: Job Control
// ============================================================================

/// Single-job controller.
#[derive(Debug, Clone)]
pub struct JobControl {
    /// Shared state.
    shared: Arc<JobShared>,
}

impl Default for JobControl {
    fn default() -> Self {
        Self::new()
    }
}

impl JobControl {
    /// Creates an idle controller with fresh stores.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(JobShared {
                running: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
                current: AtomicU64::new(JobId::NONE.get()),
                state: RwLock::new(JobState::Idle),
                last_error: RwLock::new(None),
                last_report: RwLock::new(None),
                blackboard: Arc::new(ResultBlackboard::new()),
                progress: Arc::new(ProgressTracker::new()),
                shutdown: ShutdownSignal::new(),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Starts `job` on a worker thread.
    ///
    /// Returns [`JobId::NONE`] without starting anything when a job is
    /// already running.
    pub fn start<F>(&self, job: F) -> JobId
    where
        F: FnOnce(JobContext) -> DiagnosisOutcome + Send + 'static,
    {
        if self.shared.running.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            warn!("diagnosis job already running, rejecting start");
            return JobId::NONE;
        }
        let mut worker = self.shared.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = worker.take()
            && previous.join().is_err()
        {
            warn!("previous diagnosis worker exited abnormally");
        }

        let job_id = JobId::new(self.shared.next_id.fetch_add(1, Ordering::AcqRel));
        self.shared.current.store(job_id.get(), Ordering::Release);
        *self.shared.state.write().unwrap_or_else(PoisonError::into_inner) = JobState::Running;
        *self.shared.last_error.write().unwrap_or_else(PoisonError::into_inner) = None;
        *self.shared.last_report.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.shared.shutdown.reset();
        self.shared.blackboard.reset();
        self.shared.progress.reset();

        let ctx = JobContext {
            job_id,
            blackboard: Arc::clone(&self.shared.blackboard),
            progress: Arc::clone(&self.shared.progress),
            shutdown: self.shared.shutdown.clone(),
        };
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new().name(format!("spotter-job-{job_id}")).spawn(move || {
            match panic::catch_unwind(AssertUnwindSafe(move || job(ctx))) {
                Ok(outcome) => shared.finish(outcome.state, Some(outcome.report), outcome.error),
                Err(_) => shared.finish(
                    JobState::Cancelled,
                    None,
                    Some(EngineError::Setup("diagnosis worker panicked".to_string())),
                ),
            }
        });
        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                info!(job = job_id.get(), "diagnosis job started");
            }
            Err(err) => {
                self.shared.finish(JobState::Cancelled, None, Some(EngineError::Setup(err.to_string())));
            }
        }
        job_id
    }

    /// Returns true while a job is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Returns the state of the latest job.
    #[must_use]
    pub fn job_state(&self) -> JobState {
        *self.shared.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the running job identifier, or [`JobId::NONE`] when idle.
    #[must_use]
    pub fn current_job_id(&self) -> JobId {
        JobId::new(self.shared.current.load(Ordering::Acquire))
    }

    /// Returns the error of the latest job, if it was cancelled.
    #[must_use]
    pub fn last_run_error(&self) -> Option<EngineError> {
        self.shared.last_error.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the report of the latest completed job.
    #[must_use]
    pub fn last_report(&self) -> Option<DiagnosisReport> {
        self.shared.last_report.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns a snapshot of per-problem progress.
    #[must_use]
    pub fn current_progress_report(&self) -> ProgressReport {
        ProgressReport {
            job_id: self.current_job_id(),
            state: self.job_state(),
            problems: self.shared.progress.snapshot(),
        }
    }

    /// Returns the shared result blackboard.
    #[must_use]
    pub fn blackboard(&self) -> &ResultBlackboard {
        &self.shared.blackboard
    }

    /// Requests cooperative shutdown of the running job.
    pub fn request_shutdown(&self) {
        if self.is_running() {
            info!(job = self.current_job_id().get(), "shutdown requested");
        }
        self.shared.shutdown.request();
    }

    /// Blocks until the latest job's worker has exited.
    pub fn wait(&self) {
        let handle = self.shared.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            warn!("diagnosis worker exited abnormally");
        }
    }
}
