// crates/spotter-satellites/tests/simulated.rs
// ============================================================================
// Module: Simulated Satellite Tests
// Description: Synthetic measurements and fault injection through real brokers.
// Purpose: Ensure the simulated satellites drive complete experiment series.
// ============================================================================

//! ## Overview
//! Builds brokers from simulated descriptors through the registry and runs
//! experiment series with a zero time scale so phase waits are instant.

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

use std::collections::BTreeMap;

use spotter_core::ExperimentError;
use spotter_core::ExperimentPlan;
use spotter_core::ExperimentRunner;
use spotter_core::ExtensionError;
use spotter_core::ExtensionRegistry;
use spotter_core::InstrumentationDescription;
use spotter_core::InstrumentationEntity;
use spotter_core::ProblemId;
use spotter_core::ProgressTracker;
use spotter_core::SatelliteBrokers;
use spotter_core::SatelliteDescriptor;
use spotter_core::SatelliteKind;
use spotter_core::ShutdownSignal;
use spotter_core::WorkloadError;
use spotter_satellites::ERROR_RATE_METRIC;
use spotter_satellites::RESPONSE_TIME_METRIC;
use spotter_satellites::SimulatedSystem;
use spotter_satellites::register_builtin_satellites;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

fn descriptor(kind: SatelliteKind, name: &str, properties: &[(&str, &str)]) -> SatelliteDescriptor {
    SatelliteDescriptor {
        kind,
        extension_name: "simulated".to_string(),
        name: name.to_string(),
        host: "localhost".to_string(),
        port: 0,
        properties: properties.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect::<BTreeMap<_, _>>(),
    }
}

fn brokers(workload_properties: &[(&str, &str)]) -> (SatelliteBrokers, std::sync::Arc<SimulatedSystem>) {
    let mut registry = ExtensionRegistry::new();
    let system = register_builtin_satellites(&mut registry).unwrap();
    let mut workload = vec![("time_scale", "0")];
    workload.extend_from_slice(workload_properties);
    let descriptors = [
        descriptor(SatelliteKind::Instrumentation, "agent", &[]),
        descriptor(
            SatelliteKind::Measurement,
            "monitor",
            &[("base_response_ms", "20"), ("ms_per_user", "2"), ("error_rate_per_user", "0.01"), ("samples", "3")],
        ),
        descriptor(SatelliteKind::Workload, "driver", &workload),
    ];
    (registry.build_brokers(&descriptors).unwrap(), system)
}

fn cart_description() -> InstrumentationDescription {
    InstrumentationDescription::new()
        .with_entity(InstrumentationEntity::new("com.shop.Cart", ["response_time"]))
        .with_entity(InstrumentationEntity::new("com.shop.Search", ["response_time"]))
        .with_exclude("com.shop.Search")
}

// ============================================================================
// SECTION: Series
// ============================================================================

/// Tests that samples follow the load of each step and the instrumented scopes.
#[test]
fn series_produces_load_dependent_samples() {
    let (brokers, system) = brokers(&[]);
    let progress = ProgressTracker::new();
    let shutdown = ShutdownSignal::new();
    let runner = ExperimentRunner::new(&brokers, &progress, &shutdown, vec![ProblemId::new("p")]);
    let plan = ExperimentPlan::default().with_experiments(2).with_max_users(10);

    let series = runner.run_series(&plan, &cart_description()).unwrap();

    assert_eq!(series.datasets.len(), 2);
    let low = &series.datasets[0];
    let high = &series.datasets[1];
    assert_eq!(low.load.num_users, 5);
    assert_eq!(high.load.num_users, 10);
    // Three samples of three metrics for the single non-excluded scope.
    assert_eq!(high.data.len(), 9);
    assert!(high.collected_at_ms.is_some());

    let low_means = low.data.mean_by_location(RESPONSE_TIME_METRIC);
    let high_means = high.data.mean_by_location(RESPONSE_TIME_METRIC);
    assert_eq!(low_means.keys().collect::<Vec<_>>(), vec!["com.shop.Cart"]);
    assert!((low_means["com.shop.Cart"] - 30.0).abs() < 1e-9);
    assert!((high_means["com.shop.Cart"] - 40.0).abs() < 1e-9);
    assert!((high.data.mean(ERROR_RATE_METRIC).unwrap() - 0.1).abs() < 1e-9);
    assert!(high.data.records.iter().all(|r| r.satellite.as_deref() == Some("monitor")));

    assert_eq!(system.active_users(), 0);
    assert!(system.instrumented_scopes().is_empty());
}

#[test]
fn uninstrumented_series_reports_unlocated_samples() {
    let (brokers, _system) = brokers(&[]);
    let progress = ProgressTracker::new();
    let shutdown = ShutdownSignal::new();
    let runner = ExperimentRunner::new(&brokers, &progress, &shutdown, Vec::new());

    let series = runner.run_series(&ExperimentPlan::default(), &InstrumentationDescription::new()).unwrap();

    let means = series.datasets[0].data.mean_by_location(RESPONSE_TIME_METRIC);
    assert_eq!(means.keys().collect::<Vec<_>>(), vec!["*"]);
}

// ============================================================================
// SECTION: Fault Injection
// ============================================================================

/// Tests that a configured failure surfaces and still leaves the system uninstrumented.
#[test]
fn fail_on_injects_workload_failures() {
    let (brokers, system) = brokers(&[("fail_on", "wait_for_finished_load")]);
    let progress = ProgressTracker::new();
    let shutdown = ShutdownSignal::new();
    let runner = ExperimentRunner::new(&brokers, &progress, &shutdown, Vec::new());

    let err = runner.run_series(&ExperimentPlan::default(), &cart_description()).unwrap_err();

    match err {
        ExperimentError::Workload(WorkloadError::Satellite {
            satellite,
            message,
        }) => {
            assert_eq!(satellite, "driver");
            assert_eq!(message, "simulated failure in wait_for_finished_load");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(system.instrumented_scopes().is_empty());
}

#[test]
fn malformed_model_properties_are_rejected() {
    let mut registry = ExtensionRegistry::new();
    register_builtin_satellites(&mut registry).unwrap();
    let bad = descriptor(SatelliteKind::Workload, "driver", &[("time_scale", "fast")]);

    let result = registry.build_brokers(&[bad]);

    assert!(matches!(result, Err(ExtensionError::InvalidSatellite { ref name, .. }) if name == "driver"));
}

/// Tests that registering the built-ins twice is rejected.
#[test]
fn builtins_register_once() {
    let mut registry = ExtensionRegistry::new();
    register_builtin_satellites(&mut registry).unwrap();
    assert_eq!(registry.satellite_names(SatelliteKind::Measurement), vec!["http", "simulated"]);
    assert!(matches!(register_builtin_satellites(&mut registry), Err(ExtensionError::AlreadyRegistered { .. })));
}
