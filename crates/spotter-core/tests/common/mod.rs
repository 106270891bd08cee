// crates/spotter-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Recording satellite fakes and controllers for core tests.
// Purpose: Provide journaled adapters, failure injection, and test controllers.
// Dependencies: spotter-core
// ============================================================================

//! ## Overview
//! Fake adapters append every call to a shared [`Journal`] so tests can
//! assert ordering and call counts across brokers. Failures are injected per
//! operation name.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]
#![allow(dead_code, reason = "Each test binary uses a different subset of helpers.")]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use spotter_core::ControllerError;
use spotter_core::DetectionController;
use spotter_core::ExperimentContext;
use spotter_core::ExperimentReuser;
use spotter_core::ExperimentSeries;
use spotter_core::InstrumentationAdapter;
use spotter_core::InstrumentationDescription;
use spotter_core::InstrumentationEntity;
use spotter_core::InstrumentationError;
use spotter_core::LoadConfig;
use spotter_core::MeasurementAdapter;
use spotter_core::MeasurementData;
use spotter_core::MeasurementError;
use spotter_core::MeasurementRecord;
use spotter_core::ProblemOccurrence;
use spotter_core::SatelliteAdapter;
use spotter_core::SatelliteBrokers;
use spotter_core::SatelliteInfo;
use spotter_core::SpotterResult;
use spotter_core::WorkloadAdapter;
use spotter_core::WorkloadError;
use spotter_core::run_default_series;

// ============================================================================
// SECTION: Journal
// ============================================================================

/// Shared, ordered call log.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.as_str() == entry)
    }
}

/// Operations that should fail, by journal name.
#[derive(Debug, Clone, Default)]
pub struct Failures(BTreeSet<String>);

impl Failures {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn on(ops: &[&str]) -> Self {
        Self(ops.iter().map(ToString::to_string).collect())
    }

    fn hits(&self, op: &str) -> bool {
        self.0.contains(op)
    }
}

// ============================================================================
// SECTION: Instrumentation Fake
// ============================================================================

pub struct FakeInstrumentation {
    pub info: SatelliteInfo,
    pub journal: Journal,
    pub failures: Failures,
    pub seen: Arc<Mutex<Vec<InstrumentationDescription>>>,
}

impl FakeInstrumentation {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            info: SatelliteInfo::new(name, "localhost", 9000),
            journal: journal.clone(),
            failures: Failures::none(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(mut self, failures: Failures) -> Self {
        self.failures = failures;
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.info = self.info.with_property(key, value);
        self
    }

    fn call(&self, op: &str) -> Result<(), InstrumentationError> {
        self.journal.record(op);
        if self.failures.hits(op) {
            return Err(InstrumentationError::Satellite {
                satellite: self.info.name().to_string(),
                message: format!("{op} failed"),
            });
        }
        Ok(())
    }
}

impl SatelliteAdapter for FakeInstrumentation {
    fn info(&self) -> &SatelliteInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut SatelliteInfo {
        &mut self.info
    }
}

impl InstrumentationAdapter for FakeInstrumentation {
    fn initialize(&self) -> Result<(), InstrumentationError> {
        self.call("instrumentation.initialize")
    }

    fn instrument(&self, description: &InstrumentationDescription) -> Result<(), InstrumentationError> {
        self.seen.lock().unwrap().push(description.clone());
        self.call("instrument")
    }

    fn uninstrument(&self) -> Result<(), InstrumentationError> {
        self.call("uninstrument")
    }
}

// ============================================================================
// SECTION: Measurement Fake
// ============================================================================

pub struct FakeMeasurement {
    pub info: SatelliteInfo,
    pub journal: Journal,
    pub failures: Failures,
    pub records: Vec<MeasurementRecord>,
    pub clock_ms: u64,
}

impl FakeMeasurement {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            info: SatelliteInfo::new(name, "localhost", 9100),
            journal: journal.clone(),
            failures: Failures::none(),
            records: vec![MeasurementRecord::new(1_000, "response_time_ms", 10.0).at("/checkout")],
            clock_ms: 1_000,
        }
    }

    pub fn failing(mut self, failures: Failures) -> Self {
        self.failures = failures;
        self
    }

    pub fn with_records(mut self, records: Vec<MeasurementRecord>) -> Self {
        self.records = records;
        self
    }

    pub fn with_clock(mut self, clock_ms: u64) -> Self {
        self.clock_ms = clock_ms;
        self
    }

    fn call(&self, op: &str) -> Result<(), MeasurementError> {
        self.journal.record(op);
        if self.failures.hits(op) {
            return Err(MeasurementError::Satellite {
                satellite: self.info.name().to_string(),
                message: format!("{op} failed"),
            });
        }
        Ok(())
    }
}

impl SatelliteAdapter for FakeMeasurement {
    fn info(&self) -> &SatelliteInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut SatelliteInfo {
        &mut self.info
    }
}

impl MeasurementAdapter for FakeMeasurement {
    fn initialize(&self) -> Result<(), MeasurementError> {
        self.call("measurement.initialize")
    }

    fn enable_monitoring(&self) -> Result<(), MeasurementError> {
        self.call("enable_monitoring")
    }

    fn disable_monitoring(&self) -> Result<(), MeasurementError> {
        self.call("disable_monitoring")
    }

    fn measurement_data(&self) -> Result<MeasurementData, MeasurementError> {
        self.call("measurement_data")?;
        Ok(MeasurementData::new(self.records.clone()))
    }

    fn current_time(&self) -> Result<u64, MeasurementError> {
        self.call("current_time")?;
        Ok(self.clock_ms)
    }
}

// ============================================================================
// SECTION: Workload Fake
// ============================================================================

pub struct FakeWorkload {
    pub info: SatelliteInfo,
    pub journal: Journal,
    pub failures: Failures,
    pub wait_delay: Duration,
    pub load_log: LoadLog,
}

/// Loads a workload fake was started with and the ramp-up waits it served.
#[derive(Clone, Default)]
pub struct LoadLog {
    started: Arc<Mutex<Vec<LoadConfig>>>,
    ramp_waits: Arc<Mutex<Vec<Duration>>>,
}

impl LoadLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<LoadConfig> {
        self.started.lock().unwrap().clone()
    }

    /// Ramp-up duration of the active load at each warm-up wait.
    pub fn ramp_waits(&self) -> Vec<Duration> {
        self.ramp_waits.lock().unwrap().clone()
    }

    fn start(&self, load: &LoadConfig) {
        self.started.lock().unwrap().push(*load);
    }

    fn ramp_wait(&self) {
        let ramp = self.started.lock().unwrap().last().map_or(Duration::ZERO, LoadConfig::ramp_up_duration);
        self.ramp_waits.lock().unwrap().push(ramp);
    }
}

impl FakeWorkload {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            info: SatelliteInfo::new(name, "localhost", 9200),
            journal: journal.clone(),
            failures: Failures::none(),
            wait_delay: Duration::ZERO,
            load_log: LoadLog::new(),
        }
    }

    pub fn with_load_log(mut self, log: &LoadLog) -> Self {
        self.load_log = log.clone();
        self
    }

    pub fn failing(mut self, failures: Failures) -> Self {
        self.failures = failures;
        self
    }

    pub fn with_wait_delay(mut self, delay: Duration) -> Self {
        self.wait_delay = delay;
        self
    }

    fn call(&self, op: &str) -> Result<(), WorkloadError> {
        self.journal.record(op);
        if self.failures.hits(op) {
            return Err(WorkloadError::Satellite {
                satellite: self.info.name().to_string(),
                message: format!("{op} failed"),
            });
        }
        Ok(())
    }

    fn wait(&self, op: &str) -> Result<(), WorkloadError> {
        if !self.wait_delay.is_zero() {
            thread::sleep(self.wait_delay);
        }
        self.call(op)
    }
}

impl SatelliteAdapter for FakeWorkload {
    fn info(&self) -> &SatelliteInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut SatelliteInfo {
        &mut self.info
    }
}

impl WorkloadAdapter for FakeWorkload {
    fn initialize(&self) -> Result<(), WorkloadError> {
        self.call("workload.initialize")
    }

    fn start_load(&self, load: &LoadConfig) -> Result<(), WorkloadError> {
        self.load_log.start(load);
        self.call(&format!("start_load:{}", load.num_users))
    }

    fn wait_for_warmup_phase_termination(&self) -> Result<(), WorkloadError> {
        self.load_log.ramp_wait();
        self.wait("wait_warmup")
    }

    fn wait_for_experiment_phase_termination(&self) -> Result<(), WorkloadError> {
        self.wait("wait_experiment")
    }

    fn wait_for_finished_load(&self) -> Result<(), WorkloadError> {
        self.wait("wait_finished")
    }
}

// ============================================================================
// SECTION: Broker Builders
// ============================================================================

/// Builds brokers with one fake of each kind sharing `journal`.
pub fn journaled_brokers(journal: &Journal) -> SatelliteBrokers {
    let mut brokers = SatelliteBrokers::new();
    brokers.instrumentation.set_controllers(vec![Box::new(FakeInstrumentation::new("inst-1", journal))]);
    brokers.measurement.set_controllers(vec![Box::new(FakeMeasurement::new("meas-1", journal))]);
    brokers.workload.set_controllers(vec![Box::new(FakeWorkload::new("load-1", journal))]);
    brokers
}

/// Returns a one-entity instrumentation description.
pub fn sample_description() -> InstrumentationDescription {
    InstrumentationDescription::new().with_entity(InstrumentationEntity::new("com.shop.*", ["response_time"]))
}

// ============================================================================
// SECTION: Controllers
// ============================================================================

/// Controller whose verdict comes from its `verdict` config value.
#[derive(Default)]
pub struct StaticController {
    detected: bool,
    fail: bool,
    experiments: u32,
    max_users: Option<u32>,
    reuse_scope: Option<String>,
}

impl DetectionController for StaticController {
    fn load_properties(&mut self, config: &BTreeMap<String, String>) -> Result<(), ControllerError> {
        match config.get("verdict").map(String::as_str) {
            Some("detected") => self.detected = true,
            Some("not_detected") | None => self.detected = false,
            Some("fail") => self.fail = true,
            Some(other) => return Err(ControllerError::invalid_config("verdict", other)),
        }
        self.experiments = match config.get("experiments") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| ControllerError::invalid_config("experiments", "not a number"))?,
            None => 1,
        };
        self.max_users = match config.get("max_users") {
            Some(raw) => {
                Some(raw.parse::<u32>().map_err(|_| ControllerError::invalid_config("max_users", "not a number"))?)
            }
            None => None,
        };
        self.reuse_scope = config.get("reuse_scope").cloned();
        Ok(())
    }

    fn num_of_experiments(&self) -> u32 {
        self.experiments
    }

    fn execute_experiments(&self, ctx: &ExperimentContext<'_>) -> Result<ExperimentSeries, ControllerError> {
        if self.fail {
            return Err(ControllerError::invalid_config("verdict", "forced failure"));
        }
        run_default_series(ctx, &InstrumentationDescription::new(), self.experiments, self.max_users)
    }

    fn analyze(&self, series: &ExperimentSeries) -> SpotterResult {
        let mut result = SpotterResult::new(self.detected);
        result.append_message(format!("analysed {} dataset(s)", series.datasets.len()));
        if self.detected {
            result.add_occurrence(ProblemOccurrence::new("/checkout", "slow"));
        }
        result
    }

    fn experiment_reuser(&self) -> Option<&dyn ExperimentReuser> {
        if self.reuse_scope.is_some() { Some(self) } else { None }
    }
}

impl ExperimentReuser for StaticController {
    fn reuse_scope(&self) -> &str {
        self.reuse_scope.as_deref().unwrap_or_default()
    }

    fn instrumentation_description(&self) -> InstrumentationDescription {
        sample_description()
    }

    fn max_users(&self) -> Option<u32> {
        self.max_users
    }
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// One-shot gate a controller can block on until a test opens it.
#[derive(Debug, Clone, Default)]
pub struct Gate(Arc<(Mutex<GateState>, Condvar)>);

#[derive(Debug, Default)]
struct GateState {
    entered: bool,
    open: bool,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the gate as reached and blocks until it opens.
    pub fn pass(&self) {
        let (lock, cvar) = &*self.0;
        let mut state = lock.lock().unwrap();
        state.entered = true;
        cvar.notify_all();
        while !state.open {
            state = cvar.wait(state).unwrap();
        }
    }

    /// Blocks until some thread reached the gate.
    pub fn wait_entered(&self) {
        let (lock, cvar) = &*self.0;
        let mut state = lock.lock().unwrap();
        while !state.entered {
            let (next, timeout) = cvar.wait_timeout(state, Duration::from_secs(10)).unwrap();
            assert!(!timeout.timed_out(), "gate was never reached");
            state = next;
        }
    }

    pub fn open(&self) {
        let (lock, cvar) = &*self.0;
        lock.lock().unwrap().open = true;
        cvar.notify_all();
    }
}

/// Controller that blocks on a gate before reporting not detected.
pub struct GatedController {
    pub gate: Gate,
}

impl DetectionController for GatedController {
    fn load_properties(&mut self, _config: &BTreeMap<String, String>) -> Result<(), ControllerError> {
        Ok(())
    }

    fn num_of_experiments(&self) -> u32 {
        1
    }

    fn execute_experiments(&self, ctx: &ExperimentContext<'_>) -> Result<ExperimentSeries, ControllerError> {
        self.gate.pass();
        run_default_series(ctx, &InstrumentationDescription::new(), 1, None)
    }

    fn analyze(&self, _series: &ExperimentSeries) -> SpotterResult {
        SpotterResult::new(false)
    }
}
