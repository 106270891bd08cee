// crates/spotter-satellites/src/simulated.rs
// ============================================================================
// Module: Simulated Satellites
// Description: In-process satellites backed by a synthetic system under test.
// Purpose: Run complete diagnoses without external services.
// Dependencies: spotter-core, time, tracing
// ============================================================================

//! ## Overview
//! The three simulated adapters share one [`SimulatedSystem`]. The workload
//! adapter sets its active user count, the instrumentation adapter sets its
//! instrumented scopes, and the measurement adapter turns both into synthetic
//! samples when monitoring is disabled:
//!
//! - `response_time_ms = base_response_ms + ms_per_user * users`
//! - `throughput_rps = users * 1000 / response_time_ms`
//! - `error_rate = min(1, error_rate_per_user * users)`
//!
//! One sample set is produced per instrumented scope (tagged with the scope as
//! location), or a single unlocated set when nothing is instrumented. Workload
//! waits sleep for the phase durations of the current load multiplied by
//! `time_scale`. Any simulated adapter fails the operations listed in its
//! `fail_on` property.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::thread;
use std::time::Duration;

use spotter_core::ExtensionError;
use spotter_core::InstrumentationAdapter;
use spotter_core::InstrumentationDescription;
use spotter_core::InstrumentationError;
use spotter_core::LoadConfig;
use spotter_core::MeasurementAdapter;
use spotter_core::MeasurementData;
use spotter_core::MeasurementError;
use spotter_core::MeasurementRecord;
use spotter_core::SatelliteAdapter;
use spotter_core::SatelliteDescriptor;
use spotter_core::SatelliteInfo;
use spotter_core::WorkloadAdapter;
use spotter_core::WorkloadError;
use time::OffsetDateTime;
use tracing::debug;

use crate::properties::name_set;
use crate::properties::parse_non_negative;
use crate::properties::parse_or;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Metric carrying the synthetic response time.
pub const RESPONSE_TIME_METRIC: &str = "response_time_ms";
/// Metric carrying the synthetic throughput.
pub const THROUGHPUT_METRIC: &str = "throughput_rps";
/// Metric carrying the synthetic error rate.
pub const ERROR_RATE_METRIC: &str = "error_rate";

/// Property listing operations that must fail.
const FAIL_ON_PROPERTY: &str = "fail_on";

// ============================================================================
// SECTION: Simulated System
// ============================================================================

/// Mutable state of the simulated system under test.
#[derive(Debug, Default)]
struct SystemState {
    /// Users currently driven by the workload.
    users: u32,
    /// Scopes currently instrumented.
    scopes: BTreeSet<String>,
}

/// Synthetic system under test shared by the simulated adapters.
#[derive(Debug, Default)]
pub struct SimulatedSystem {
    /// Current state.
    state: Mutex<SystemState>,
}

impl SimulatedSystem {
    /// Creates an idle system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of users currently driven.
    #[must_use]
    pub fn active_users(&self) -> u32 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).users
    }

    /// Returns the currently instrumented scopes.
    #[must_use]
    pub fn instrumented_scopes(&self) -> BTreeSet<String> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).scopes.clone()
    }

    /// Sets the active user count.
    fn set_users(&self, users: u32) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).users = users;
    }

    /// Replaces the instrumented scopes.
    fn set_scopes(&self, scopes: BTreeSet<String>) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).scopes = scopes;
    }
}

// ============================================================================
// SECTION: Fault Injection
// ============================================================================

/// Operations an adapter is configured to fail.
#[derive(Debug, Clone, Default)]
struct FaultPlan {
    /// Operation names.
    fail_on: BTreeSet<String>,
}

impl FaultPlan {
    /// Reads the plan from the `fail_on` property.
    fn from_descriptor(descriptor: &SatelliteDescriptor) -> Self {
        Self {
            fail_on: name_set(descriptor, FAIL_ON_PROPERTY),
        }
    }

    /// Fails when `operation` is listed.
    fn check(&self, operation: &str) -> Result<(), String> {
        if self.fail_on.contains(operation) {
            return Err(format!("simulated failure in {operation}"));
        }
        Ok(())
    }
}

/// Returns the wall clock in unix milliseconds.
fn now_ms() -> u64 {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or(0)
}

// ============================================================================
// SECTION: Instrumentation
// ============================================================================

/// Simulated instrumentation satellite.
pub struct SimulatedInstrumentation {
    /// Endpoint information.
    info: SatelliteInfo,
    /// Shared system under test.
    system: Arc<SimulatedSystem>,
    /// Injected failures.
    faults: FaultPlan,
}

impl SimulatedInstrumentation {
    /// Builds the adapter from a descriptor.
    #[must_use]
    pub fn new(descriptor: &SatelliteDescriptor, system: Arc<SimulatedSystem>) -> Self {
        Self {
            info: SatelliteInfo::from_descriptor(descriptor),
            system,
            faults: FaultPlan::from_descriptor(descriptor),
        }
    }

    /// Applies fault injection to an operation.
    fn check(&self, operation: &str) -> Result<(), InstrumentationError> {
        self.faults.check(operation).map_err(|message| InstrumentationError::Satellite {
            satellite: self.info.name().to_string(),
            message,
        })
    }
}

impl SatelliteAdapter for SimulatedInstrumentation {
    fn info(&self) -> &SatelliteInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut SatelliteInfo {
        &mut self.info
    }
}

impl InstrumentationAdapter for SimulatedInstrumentation {
    fn initialize(&self) -> Result<(), InstrumentationError> {
        self.check("initialize")?;
        self.system.set_scopes(BTreeSet::new());
        Ok(())
    }

    fn instrument(&self, description: &InstrumentationDescription) -> Result<(), InstrumentationError> {
        self.check("instrument")?;
        let scopes: BTreeSet<String> = description
            .entities
            .iter()
            .map(|entity| entity.scope.clone())
            .filter(|scope| !description.excludes.contains(scope))
            .collect();
        debug!(satellite = self.info.name(), scopes = scopes.len(), "simulated instrumentation applied");
        self.system.set_scopes(scopes);
        Ok(())
    }

    fn uninstrument(&self) -> Result<(), InstrumentationError> {
        self.check("uninstrument")?;
        self.system.set_scopes(BTreeSet::new());
        Ok(())
    }
}

// ============================================================================
// SECTION: Measurement
// ============================================================================

/// Parameters of the synthetic response model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseModel {
    /// Response time with no users, in milliseconds.
    pub base_response_ms: f64,
    /// Response time added per active user, in milliseconds.
    pub ms_per_user: f64,
    /// Error rate added per active user.
    pub error_rate_per_user: f64,
    /// Samples produced per location and metric.
    pub samples: u32,
}

impl Default for ResponseModel {
    fn default() -> Self {
        Self {
            base_response_ms: 10.0,
            ms_per_user: 1.0,
            error_rate_per_user: 0.0,
            samples: 5,
        }
    }
}

impl ResponseModel {
    /// Reads the model from descriptor properties.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::InvalidSatellite`] when a property is malformed.
    pub fn from_descriptor(descriptor: &SatelliteDescriptor) -> Result<Self, ExtensionError> {
        let defaults = Self::default();
        Ok(Self {
            base_response_ms: parse_non_negative(descriptor, "base_response_ms", defaults.base_response_ms)?,
            ms_per_user: parse_non_negative(descriptor, "ms_per_user", defaults.ms_per_user)?,
            error_rate_per_user: parse_non_negative(descriptor, "error_rate_per_user", defaults.error_rate_per_user)?,
            samples: parse_or(descriptor, "samples", defaults.samples)?.max(1),
        })
    }

    /// Returns the modelled response time for `users`.
    #[must_use]
    pub fn response_time_ms(&self, users: u32) -> f64 {
        self.ms_per_user.mul_add(f64::from(users), self.base_response_ms)
    }

    /// Returns the modelled throughput for `users`.
    #[must_use]
    pub fn throughput_rps(&self, users: u32) -> f64 {
        let response = self.response_time_ms(users);
        if response > 0.0 { f64::from(users) * 1000.0 / response } else { 0.0 }
    }

    /// Returns the modelled error rate for `users`.
    #[must_use]
    pub fn error_rate(&self, users: u32) -> f64 {
        (self.error_rate_per_user * f64::from(users)).min(1.0)
    }
}

/// Monitoring window state.
#[derive(Debug, Default)]
struct MonitorState {
    /// Clock when monitoring was enabled.
    started_at_ms: Option<u64>,
    /// Samples of the last closed window.
    records: Vec<MeasurementRecord>,
}

/// Simulated measurement satellite.
pub struct SimulatedMeasurement {
    /// Endpoint information.
    info: SatelliteInfo,
    /// Shared system under test.
    system: Arc<SimulatedSystem>,
    /// Injected failures.
    faults: FaultPlan,
    /// Response model.
    model: ResponseModel,
    /// Monitoring window.
    state: Mutex<MonitorState>,
}

impl SimulatedMeasurement {
    /// Builds the adapter from a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::InvalidSatellite`] when a model property is malformed.
    pub fn new(descriptor: &SatelliteDescriptor, system: Arc<SimulatedSystem>) -> Result<Self, ExtensionError> {
        Ok(Self {
            info: SatelliteInfo::from_descriptor(descriptor),
            system,
            faults: FaultPlan::from_descriptor(descriptor),
            model: ResponseModel::from_descriptor(descriptor)?,
            state: Mutex::new(MonitorState::default()),
        })
    }

    /// Applies fault injection to an operation.
    fn check(&self, operation: &str) -> Result<(), MeasurementError> {
        self.faults.check(operation).map_err(|message| self.failure(message))
    }

    /// Builds a satellite error.
    fn failure(&self, message: String) -> MeasurementError {
        MeasurementError::Satellite {
            satellite: self.info.name().to_string(),
            message,
        }
    }

    /// Produces the samples of one monitoring window.
    fn sample(&self, started_at_ms: u64, ended_at_ms: u64) -> Vec<MeasurementRecord> {
        let users = self.system.active_users();
        let scopes = self.system.instrumented_scopes();
        let locations: Vec<Option<String>> =
            if scopes.is_empty() { vec![None] } else { scopes.into_iter().map(Some).collect() };
        let span = ended_at_ms.saturating_sub(started_at_ms);
        let samples = u64::from(self.model.samples);
        let values = [
            (RESPONSE_TIME_METRIC, self.model.response_time_ms(users)),
            (THROUGHPUT_METRIC, self.model.throughput_rps(users)),
            (ERROR_RATE_METRIC, self.model.error_rate(users)),
        ];
        let mut records = Vec::new();
        for index in 0 .. samples {
            let timestamp_ms = started_at_ms.saturating_add(span.saturating_mul(index) / samples);
            for location in &locations {
                for (metric, value) in values {
                    records.push(MeasurementRecord {
                        timestamp_ms,
                        metric: metric.to_string(),
                        value,
                        location: location.clone(),
                        satellite: Some(self.info.name().to_string()),
                    });
                }
            }
        }
        records
    }
}

impl SatelliteAdapter for SimulatedMeasurement {
    fn info(&self) -> &SatelliteInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut SatelliteInfo {
        &mut self.info
    }
}

impl MeasurementAdapter for SimulatedMeasurement {
    fn initialize(&self) -> Result<(), MeasurementError> {
        self.check("initialize")?;
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = MonitorState::default();
        Ok(())
    }

    fn enable_monitoring(&self) -> Result<(), MeasurementError> {
        self.check("enable_monitoring")?;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.started_at_ms = Some(now_ms());
        state.records.clear();
        Ok(())
    }

    fn disable_monitoring(&self) -> Result<(), MeasurementError> {
        self.check("disable_monitoring")?;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(started_at_ms) = state.started_at_ms.take() else {
            return Err(self.failure("monitoring is not enabled".to_string()));
        };
        state.records = self.sample(started_at_ms, now_ms());
        debug!(satellite = self.info.name(), records = state.records.len(), "simulated monitoring window closed");
        Ok(())
    }

    fn measurement_data(&self) -> Result<MeasurementData, MeasurementError> {
        self.check("measurement_data")?;
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(MeasurementData::new(state.records.clone()))
    }

    fn current_time(&self) -> Result<u64, MeasurementError> {
        self.check("current_time")?;
        Ok(now_ms())
    }
}

// ============================================================================
// SECTION: Workload
// ============================================================================

/// Simulated workload satellite.
pub struct SimulatedWorkload {
    /// Endpoint information.
    info: SatelliteInfo,
    /// Shared system under test.
    system: Arc<SimulatedSystem>,
    /// Injected failures.
    faults: FaultPlan,
    /// Factor applied to every phase duration.
    time_scale: f64,
    /// Load of the running step.
    load: Mutex<Option<LoadConfig>>,
}

impl SimulatedWorkload {
    /// Builds the adapter from a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::InvalidSatellite`] when `time_scale` is malformed.
    pub fn new(descriptor: &SatelliteDescriptor, system: Arc<SimulatedSystem>) -> Result<Self, ExtensionError> {
        Ok(Self {
            info: SatelliteInfo::from_descriptor(descriptor),
            system,
            faults: FaultPlan::from_descriptor(descriptor),
            time_scale: parse_non_negative(descriptor, "time_scale", 1.0)?,
            load: Mutex::new(None),
        })
    }

    /// Builds a satellite error.
    fn failure(&self, message: String) -> WorkloadError {
        WorkloadError::Satellite {
            satellite: self.info.name().to_string(),
            message,
        }
    }

    /// Sleeps for the scaled duration of one phase of the current load.
    fn wait_phase(&self, operation: &str, phase: fn(&LoadConfig) -> Duration) -> Result<(), WorkloadError> {
        self.faults.check(operation).map_err(|message| self.failure(message))?;
        let load = *self.load.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(load) = load else {
            return Err(self.failure(format!("{operation} called before start_load")));
        };
        let delay = scaled(phase(&load), self.time_scale);
        debug!(satellite = self.info.name(), operation, delay_ms = %delay.as_millis(), "simulated phase wait");
        thread::sleep(delay);
        Ok(())
    }
}

/// Multiplies a duration by a non-negative factor, saturating on overflow.
fn scaled(duration: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(duration.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

impl SatelliteAdapter for SimulatedWorkload {
    fn info(&self) -> &SatelliteInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut SatelliteInfo {
        &mut self.info
    }
}

impl WorkloadAdapter for SimulatedWorkload {
    fn initialize(&self) -> Result<(), WorkloadError> {
        self.faults.check("initialize").map_err(|message| self.failure(message))?;
        *self.load.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.system.set_users(0);
        Ok(())
    }

    fn start_load(&self, load: &LoadConfig) -> Result<(), WorkloadError> {
        load.validate().map_err(|err| WorkloadError::InvalidLoad {
            satellite: self.info.name().to_string(),
            message: err.to_string(),
        })?;
        self.faults.check("start_load").map_err(|message| self.failure(message))?;
        *self.load.lock().unwrap_or_else(PoisonError::into_inner) = Some(*load);
        self.system.set_users(load.num_users);
        Ok(())
    }

    fn wait_for_warmup_phase_termination(&self) -> Result<(), WorkloadError> {
        self.wait_phase("wait_for_warmup_phase_termination", LoadConfig::ramp_up_duration)
    }

    fn wait_for_experiment_phase_termination(&self) -> Result<(), WorkloadError> {
        self.wait_phase("wait_for_experiment_phase_termination", LoadConfig::stable_duration)
    }

    fn wait_for_finished_load(&self) -> Result<(), WorkloadError> {
        self.wait_phase("wait_for_finished_load", LoadConfig::cool_down_duration)?;
        *self.load.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.system.set_users(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ResponseModel;
    use super::scaled;

    #[test]
    fn scaling_zero_is_instant() {
        assert_eq!(scaled(Duration::from_secs(60), 0.0), Duration::ZERO);
        assert_eq!(scaled(Duration::from_secs(10), 0.5), Duration::from_secs(5));
    }

    #[test]
    fn response_model_is_linear_in_users() {
        let model = ResponseModel {
            base_response_ms: 20.0,
            ms_per_user: 2.0,
            error_rate_per_user: 0.5,
            samples: 1,
        };
        assert!((model.response_time_ms(10) - 40.0).abs() < f64::EPSILON);
        assert!((model.throughput_rps(10) - 250.0).abs() < 1e-9);
        assert!((model.error_rate(10) - 1.0).abs() < f64::EPSILON);
    }
}
