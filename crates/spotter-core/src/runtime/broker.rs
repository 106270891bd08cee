// crates/spotter-core/src/runtime/broker.rs
// ============================================================================
// Module: Spotter Satellite Brokers
// Description: Fan-out coordinators driving every adapter of one kind.
// Purpose: Expose a single-adapter surface backed by concurrent dispatch.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! A [`SatelliteBroker`] holds the working set of adapters of one kind. Each
//! operation runs one scoped thread per adapter and blocks until every thread
//! has reported through a shared channel, which acts as the counting barrier.
//! Siblings are never cancelled: the first failure in completion order becomes
//! the broker failure and later failures are logged.
//!
//! Invariants:
//! - With zero adapters every operation succeeds immediately.
//! - `set_controllers` takes `&mut self` and so never overlaps an operation.
//! - Writing to a shared output stream is sequential, in adapter order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use tracing::debug;
use tracing::warn;

use crate::core::InstrumentationDescription;
use crate::core::LoadConfig;
use crate::core::MeasurementData;
use crate::core::SatelliteKind;
use crate::interfaces::InstrumentationAdapter;
use crate::interfaces::InstrumentationError;
use crate::interfaces::MeasurementAdapter;
use crate::interfaces::MeasurementError;
use crate::interfaces::SatelliteAdapter;
use crate::interfaces::WorkloadAdapter;
use crate::interfaces::WorkloadError;

// ============================================================================
// SECTION: Fan-Out Failures
// ============================================================================

/// Adapter error types that can describe an adapter thread that panicked.
trait FanOutError: fmt::Display + Send {
    /// Builds the error reported for an aborted adapter call.
    fn aborted(satellite: &str, operation: &str) -> Self;
}

impl FanOutError for InstrumentationError {
    fn aborted(satellite: &str, operation: &str) -> Self {
        Self::Satellite {
            satellite: satellite.to_string(),
            message: format!("{operation} aborted"),
        }
    }
}

impl FanOutError for MeasurementError {
    fn aborted(satellite: &str, operation: &str) -> Self {
        Self::Satellite {
            satellite: satellite.to_string(),
            message: format!("{operation} aborted"),
        }
    }
}

impl FanOutError for WorkloadError {
    fn aborted(satellite: &str, operation: &str) -> Self {
        Self::Satellite {
            satellite: satellite.to_string(),
            message: format!("{operation} aborted"),
        }
    }
}

// ============================================================================
// SECTION: Broker
// ============================================================================

/// Fan-out coordinator for adapters of one kind.
///
/// # Invariants
/// - Adapter order is preserved for aggregated results and stream output.
pub struct SatelliteBroker<A: ?Sized> {
    /// Satellite kind served by this broker.
    kind: SatelliteKind,
    /// Current working set.
    adapters: Vec<Box<A>>,
}

/// Broker over instrumentation adapters.
pub type InstrumentationBroker = SatelliteBroker<dyn InstrumentationAdapter>;
/// Broker over measurement adapters.
pub type MeasurementBroker = SatelliteBroker<dyn MeasurementAdapter>;
/// Broker over workload adapters.
pub type WorkloadBroker = SatelliteBroker<dyn WorkloadAdapter>;

impl<A: SatelliteAdapter + ?Sized> SatelliteBroker<A> {
    /// Creates a broker with an empty working set.
    #[must_use]
    pub const fn new(kind: SatelliteKind) -> Self {
        Self {
            kind,
            adapters: Vec::new(),
        }
    }

    /// Creates a broker with the given working set.
    #[must_use]
    pub const fn with_adapters(kind: SatelliteKind, adapters: Vec<Box<A>>) -> Self {
        Self {
            kind,
            adapters,
        }
    }

    /// Replaces the working set.
    pub fn set_controllers(&mut self, adapters: Vec<Box<A>>) {
        debug!(kind = %self.kind, adapters = adapters.len(), "replacing broker working set");
        self.adapters = adapters;
    }

    /// Returns the satellite kind.
    #[must_use]
    pub const fn kind(&self) -> SatelliteKind {
        self.kind
    }

    /// Returns the number of adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Returns true when the working set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Returns adapter names in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.adapters.iter().map(|adapter| adapter.name().to_string()).collect()
    }

    /// Returns the union of every adapter's properties; later adapters win on conflicts.
    #[must_use]
    pub fn properties(&self) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        for adapter in &self.adapters {
            merged.extend(adapter.properties().iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    }

    /// Runs `call` once per adapter on scoped threads and waits for all of them.
    ///
    /// Values are returned in adapter order. The first error in completion
    /// order wins; every other error is logged.
    fn fan_out<T, E, F>(&self, operation: &'static str, call: F) -> Result<Vec<T>, E>
    where
        T: Send,
        E: FanOutError,
        F: Fn(&A) -> Result<T, E> + Sync,
    {
        if self.adapters.is_empty() {
            debug!(kind = %self.kind, operation, "no adapters registered");
            return Ok(Vec::new());
        }
        let count = self.adapters.len();
        debug!(kind = %self.kind, operation, adapters = count, "dispatching to adapters");
        let (tx, rx) = mpsc::channel::<(usize, Result<T, E>)>();
        let call = &call;
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(count);
            for (index, adapter) in self.adapters.iter().enumerate() {
                let adapter: &A = &**adapter;
                let tx = tx.clone();
                let handle = scope.spawn(move || {
                    let outcome = call(adapter);
                    if tx.send((index, outcome)).is_err() {
                        debug!(satellite = adapter.name(), "fan-out receiver closed");
                    }
                });
                handles.push((adapter.name().to_string(), handle));
            }
            drop(tx);

            let mut values: Vec<Option<T>> = (0 .. count).map(|_| None).collect();
            let mut first_error: Option<E> = None;
            for (index, outcome) in rx {
                match outcome {
                    Ok(value) => {
                        if let Some(slot) = values.get_mut(index) {
                            *slot = Some(value);
                        }
                    }
                    Err(err) => record_failure(&mut first_error, err, self.kind, operation),
                }
            }
            for (satellite, handle) in handles {
                if handle.join().is_err() {
                    record_failure(&mut first_error, E::aborted(&satellite, operation), self.kind, operation);
                }
            }
            match first_error {
                Some(err) => Err(err),
                None => Ok(values.into_iter().flatten().collect()),
            }
        })
    }
}

/// Keeps the first failure and logs any later one.
fn record_failure<E: fmt::Display>(slot: &mut Option<E>, err: E, kind: SatelliteKind, operation: &str) {
    if slot.is_some() {
        warn!(kind = %kind, operation, error = %err, "additional adapter failure");
    } else {
        warn!(kind = %kind, operation, error = %err, "adapter failure");
        *slot = Some(err);
    }
}

// ============================================================================
// SECTION: Instrumentation Broker
// ============================================================================

impl SatelliteBroker<dyn InstrumentationAdapter> {
    /// Initializes every instrumentation satellite.
    ///
    /// # Errors
    ///
    /// Returns the first [`InstrumentationError`] reported by an adapter.
    pub fn initialize(&self) -> Result<(), InstrumentationError> {
        self.fan_out("initialize", |adapter| adapter.initialize()).map(drop)
    }

    /// Instruments every satellite with its own merged copy of `description`.
    ///
    /// Each copy carries the union of the description's scope filters and the
    /// adapter's `instrumentation.includes` / `instrumentation.excludes`
    /// properties.
    ///
    /// # Errors
    ///
    /// Returns [`InstrumentationError::EmptyDescription`] before dispatch when
    /// the description is empty, otherwise the first adapter failure.
    pub fn instrument(&self, description: &InstrumentationDescription) -> Result<(), InstrumentationError> {
        if description.is_empty() {
            return Err(InstrumentationError::EmptyDescription);
        }
        self.fan_out("instrument", |adapter| {
            let merged = description.with_property_filters(adapter.properties());
            adapter.instrument(&merged)
        })
        .map(drop)
    }

    /// Removes instrumentation from every satellite.
    ///
    /// # Errors
    ///
    /// Returns the first [`InstrumentationError`] reported by an adapter.
    pub fn uninstrument(&self) -> Result<(), InstrumentationError> {
        self.fan_out("uninstrument", |adapter| adapter.uninstrument()).map(drop)
    }
}

// ============================================================================
// SECTION: Measurement Broker
// ============================================================================

impl SatelliteBroker<dyn MeasurementAdapter> {
    /// Initializes every measurement satellite.
    ///
    /// # Errors
    ///
    /// Returns the first [`MeasurementError`] reported by an adapter.
    pub fn initialize(&self) -> Result<(), MeasurementError> {
        self.fan_out("initialize", |adapter| adapter.initialize()).map(drop)
    }

    /// Enables monitoring on every satellite.
    ///
    /// # Errors
    ///
    /// Returns the first [`MeasurementError`] reported by an adapter.
    pub fn enable_monitoring(&self) -> Result<(), MeasurementError> {
        self.fan_out("enable_monitoring", |adapter| adapter.enable_monitoring()).map(drop)
    }

    /// Disables monitoring on every satellite.
    ///
    /// # Errors
    ///
    /// Returns the first [`MeasurementError`] reported by an adapter.
    pub fn disable_monitoring(&self) -> Result<(), MeasurementError> {
        self.fan_out("disable_monitoring", |adapter| adapter.disable_monitoring()).map(drop)
    }

    /// Collects and concatenates the data of every satellite in adapter order.
    ///
    /// Records without a satellite tag are tagged with the adapter name.
    ///
    /// # Errors
    ///
    /// Returns the first [`MeasurementError`] reported by an adapter.
    pub fn measurement_data(&self) -> Result<MeasurementData, MeasurementError> {
        let parts = self.fan_out("measurement_data", |adapter| {
            let mut data = adapter.measurement_data()?;
            for record in &mut data.records {
                if record.satellite.is_none() {
                    record.satellite = Some(adapter.name().to_string());
                }
            }
            Ok::<_, MeasurementError>(data)
        })?;
        let mut merged = MeasurementData::default();
        for part in parts {
            merged.extend(part);
        }
        Ok(merged)
    }

    /// Writes every satellite's data to `out`, one adapter after another.
    ///
    /// # Errors
    ///
    /// Returns the first [`MeasurementError`]; later adapters are not written.
    pub fn pipe_to_output_stream(&self, out: &mut dyn Write) -> Result<(), MeasurementError> {
        for adapter in &self.adapters {
            adapter.pipe_to_output_stream(out)?;
        }
        Ok(())
    }

    /// Stores each satellite's report under `dir/<satellite name>`.
    ///
    /// # Errors
    ///
    /// Returns the first [`MeasurementError`] reported by an adapter.
    pub fn store_report(&self, dir: &Path) -> Result<(), MeasurementError> {
        self.fan_out("store_report", |adapter| adapter.store_report(&dir.join(sanitize_name(adapter.name()))))
            .map(drop)
    }

    /// Returns the latest satellite clock, or `None` without adapters.
    ///
    /// # Errors
    ///
    /// Returns the first [`MeasurementError`] reported by an adapter.
    pub fn current_time(&self) -> Result<Option<u64>, MeasurementError> {
        Ok(self.fan_out("current_time", |adapter| adapter.current_time())?.into_iter().max())
    }
}

/// Maps a satellite name onto a safe directory name.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') { ch } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() { "satellite".to_string() } else { cleaned }
}

// ============================================================================
// SECTION: Workload Broker
// ============================================================================

impl SatelliteBroker<dyn WorkloadAdapter> {
    /// Initializes every workload satellite.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorkloadError`] reported by an adapter.
    pub fn initialize(&self) -> Result<(), WorkloadError> {
        self.fan_out("initialize", |adapter| adapter.initialize()).map(drop)
    }

    /// Starts the same load on every workload satellite.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorkloadError`] reported by an adapter.
    pub fn start_load(&self, load: &LoadConfig) -> Result<(), WorkloadError> {
        self.fan_out("start_load", |adapter| adapter.start_load(load)).map(drop)
    }

    /// Waits until every satellite has finished ramping up.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorkloadError`] reported by an adapter.
    pub fn wait_for_warmup_phase_termination(&self) -> Result<(), WorkloadError> {
        self.fan_out("wait_for_warmup_phase_termination", |adapter| adapter.wait_for_warmup_phase_termination())
            .map(drop)
    }

    /// Waits until every satellite has finished the stable phase.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorkloadError`] reported by an adapter.
    pub fn wait_for_experiment_phase_termination(&self) -> Result<(), WorkloadError> {
        self.fan_out("wait_for_experiment_phase_termination", |adapter| {
            adapter.wait_for_experiment_phase_termination()
        })
        .map(drop)
    }

    /// Waits until every satellite has stopped generating load.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorkloadError`] reported by an adapter.
    pub fn wait_for_finished_load(&self) -> Result<(), WorkloadError> {
        self.fan_out("wait_for_finished_load", |adapter| adapter.wait_for_finished_load()).map(drop)
    }
}

// ============================================================================
// SECTION: Broker Set
// ============================================================================

/// The three brokers used by one diagnosis run.
pub struct SatelliteBrokers {
    /// Instrumentation broker.
    pub instrumentation: InstrumentationBroker,
    /// Measurement broker.
    pub measurement: MeasurementBroker,
    /// Workload broker.
    pub workload: WorkloadBroker,
}

impl SatelliteBrokers {
    /// Creates three empty brokers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            instrumentation: SatelliteBroker::new(SatelliteKind::Instrumentation),
            measurement: SatelliteBroker::new(SatelliteKind::Measurement),
            workload: SatelliteBroker::new(SatelliteKind::Workload),
        }
    }
}

impl Default for SatelliteBrokers {
    fn default() -> Self {
        Self::new()
    }
}
