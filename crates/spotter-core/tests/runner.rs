// crates/spotter-core/tests/runner.rs
// ============================================================================
// Module: Experiment Runner Tests
// Description: Phase ordering, cleanup guarantees, and load stepping.
// Dependencies: spotter-core, proptest
// ============================================================================
//! ## Overview
//! Drives the runner against journaled fakes and checks the exact satellite
//! call order of each step, the uninstrument-once guarantee, and load plans.

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

mod common;

use std::time::Duration;

use common::Failures;
use common::FakeInstrumentation;
use common::FakeMeasurement;
use common::FakeWorkload;
use common::Journal;
use common::LoadLog;
use common::journaled_brokers;
use common::sample_description;
use proptest::prelude::*;
use spotter_core::DiagnosisStatus;
use spotter_core::ExperimentError;
use spotter_core::ExperimentPhase;
use spotter_core::ExperimentPlan;
use spotter_core::ExperimentRunner;
use spotter_core::InstrumentationDescription;
use spotter_core::LoadConfig;
use spotter_core::MeasurementError;
use spotter_core::ProblemId;
use spotter_core::ProgressTracker;
use spotter_core::SatelliteBrokers;
use spotter_core::ShutdownSignal;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn one_step_plan(users: u32) -> ExperimentPlan {
    ExperimentPlan::default().with_experiments(1).with_max_users(users)
}

fn run(
    brokers: &SatelliteBrokers,
    plan: &ExperimentPlan,
    description: &InstrumentationDescription,
) -> (Result<spotter_core::ExperimentSeries, ExperimentError>, ProgressTracker) {
    let progress = ProgressTracker::new();
    let shutdown = ShutdownSignal::new();
    let result = {
        let runner = ExperimentRunner::new(brokers, &progress, &shutdown, vec![ProblemId::new("p1")]);
        runner.run_series(plan, description)
    };
    (result, progress)
}

fn ramp_plan(steps: u32, max_users: u32, per_interval: u32, interval_secs: u64) -> ExperimentPlan {
    let mut plan = ExperimentPlan::default().with_experiments(steps).with_max_users(max_users);
    plan.template.ramp_up_users_per_interval = per_interval;
    plan.template.ramp_up_interval_secs = interval_secs;
    plan
}

/// Ramp-up length: an exact multiple drops the trailing interval, a partial
/// remainder adds one.
fn expected_ramp(users: u32, per_interval: u32, interval_secs: u64) -> Duration {
    let intervals = if users % per_interval == 0 { users / per_interval - 1 } else { users / per_interval + 1 };
    Duration::from_secs(u64::from(intervals) * interval_secs)
}

fn logged_brokers(journal: &Journal, log: &LoadLog) -> SatelliteBrokers {
    let mut brokers = journaled_brokers(journal);
    brokers.workload.set_controllers(vec![Box::new(FakeWorkload::new("load-1", journal).with_load_log(log))]);
    brokers
}

fn brokers_with(
    journal: &Journal,
    instrumentation: Failures,
    measurement: Failures,
    workload: Failures,
) -> SatelliteBrokers {
    let mut brokers = SatelliteBrokers::new();
    brokers
        .instrumentation
        .set_controllers(vec![Box::new(FakeInstrumentation::new("inst-1", journal).failing(instrumentation))]);
    brokers.measurement.set_controllers(vec![Box::new(FakeMeasurement::new("meas-1", journal).failing(measurement))]);
    brokers.workload.set_controllers(vec![Box::new(FakeWorkload::new("load-1", journal).failing(workload))]);
    brokers
}

// ============================================================================
// SECTION: Phase Ordering
// ============================================================================

/// Tests the exact satellite call sequence of a single step.
#[test]
fn single_step_follows_phase_order() {
    let journal = Journal::new();
    let brokers = journaled_brokers(&journal);

    let (result, progress) = run(&brokers, &one_step_plan(5), &sample_description());
    let series = result.unwrap();

    assert_eq!(journal.entries(), vec![
        "instrumentation.initialize",
        "measurement.initialize",
        "workload.initialize",
        "instrument",
        "start_load:5",
        "wait_warmup",
        "enable_monitoring",
        "wait_experiment",
        "disable_monitoring",
        "wait_finished",
        "measurement_data",
        "current_time",
        "uninstrument",
    ]);
    assert_eq!(series.datasets.len(), 1);
    let dataset = &series.datasets[0];
    assert_eq!(dataset.step, 0);
    assert_eq!(dataset.load.num_users, 5);
    assert_eq!(dataset.collected_at_ms, Some(1_000));
    assert_eq!(dataset.data.records[0].satellite.as_deref(), Some("meas-1"));

    let last = progress.get(&ProblemId::new("p1")).unwrap();
    assert_eq!(last.status, DiagnosisStatus::Uninstrumenting);
    assert!(last.estimated_progress <= 1.0);
}

/// Tests that an empty description skips instrument but still uninstruments.
#[test]
fn empty_description_skips_instrument_only() {
    let journal = Journal::new();
    let brokers = journaled_brokers(&journal);

    run(&brokers, &one_step_plan(3), &InstrumentationDescription::new()).0.unwrap();

    assert_eq!(journal.count("instrument"), 0);
    assert_eq!(journal.count("uninstrument"), 1);
}

/// Tests that each step gets its own load level in ascending order.
#[test]
fn multi_step_series_ramps_users() {
    let journal = Journal::new();
    let brokers = journaled_brokers(&journal);
    let plan = ExperimentPlan::default().with_experiments(3).with_max_users(10);

    let series = run(&brokers, &plan, &sample_description()).0.unwrap();

    let starts: Vec<String> = journal.entries().into_iter().filter(|e| e.starts_with("start_load")).collect();
    assert_eq!(starts, vec!["start_load:4", "start_load:7", "start_load:10"]);
    assert_eq!(journal.count("workload.initialize"), 1);
    assert_eq!(journal.count("uninstrument"), 3);
    assert_eq!(series.lowest_load().unwrap().load.num_users, 4);
    assert_eq!(series.highest_load().unwrap().load.num_users, 10);
}

/// Tests that monitoring starts after a ramp-up of whole intervals.
#[test]
fn ramp_up_with_exact_multiple_drops_trailing_interval() {
    let journal = Journal::new();
    let log = LoadLog::new();

    run(&logged_brokers(&journal, &log), &ramp_plan(1, 10, 5, 30), &sample_description()).0.unwrap();

    assert_eq!(log.started()[0].ramp_up_intervals(), 1);
    assert_eq!(log.ramp_waits(), vec![Duration::from_secs(30)]);
    assert!(journal.position("wait_warmup").unwrap() < journal.position("enable_monitoring").unwrap());
}

/// Tests that a partial last interval adds one interval to the ramp-up wait.
#[test]
fn ramp_up_with_partial_interval_adds_one() {
    let journal = Journal::new();
    let log = LoadLog::new();

    run(&logged_brokers(&journal, &log), &ramp_plan(1, 11, 5, 30), &sample_description()).0.unwrap();

    assert_eq!(log.started()[0].ramp_up_intervals(), 3);
    assert_eq!(log.ramp_waits(), vec![Duration::from_secs(90)]);
    assert!(journal.position("wait_warmup").unwrap() < journal.position("enable_monitoring").unwrap());
}

/// Tests that step phases never report a status below instrumentation.
#[test]
fn step_phases_never_fall_back_to_initializing() {
    assert_eq!(ExperimentPhase::ALL.map(ExperimentPhase::status), [
        DiagnosisStatus::Instrumenting,
        DiagnosisStatus::Instrumenting,
        DiagnosisStatus::ExperimentingRampUp,
        DiagnosisStatus::ExperimentingRampUp,
        DiagnosisStatus::ExperimentingStablePhase,
        DiagnosisStatus::ExperimentingStablePhase,
        DiagnosisStatus::ExperimentingCoolDown,
        DiagnosisStatus::ExperimentingCoolDown,
        DiagnosisStatus::CollectingData,
        DiagnosisStatus::Uninstrumenting,
    ]);
}

// ============================================================================
// SECTION: Cleanup
// ============================================================================

/// Tests that a failing phase still triggers exactly one uninstrument.
#[test]
fn failure_mid_step_uninstruments_once() {
    let journal = Journal::new();
    let brokers = brokers_with(&journal, Failures::none(), Failures::on(&["enable_monitoring"]), Failures::none());

    let err = run(&brokers, &one_step_plan(2), &sample_description()).0.unwrap_err();

    assert!(matches!(err, ExperimentError::Measurement(MeasurementError::Satellite { .. })));
    assert_eq!(journal.count("uninstrument"), 1);
    assert_eq!(journal.count("wait_experiment"), 0);
    assert!(journal.position("enable_monitoring").unwrap() < journal.position("uninstrument").unwrap());
}

/// Tests that the step error wins when uninstrument fails as well.
#[test]
fn cleanup_failure_does_not_mask_step_error() {
    let journal = Journal::new();
    let brokers =
        brokers_with(&journal, Failures::on(&["uninstrument"]), Failures::none(), Failures::on(&["wait_warmup"]));

    let err = run(&brokers, &one_step_plan(2), &sample_description()).0.unwrap_err();

    assert!(matches!(err, ExperimentError::Workload(_)));
    assert_eq!(journal.count("uninstrument"), 1);
}

/// Tests that a cleanup failure after a clean step is reported.
#[test]
fn cleanup_failure_after_clean_step_is_reported() {
    let journal = Journal::new();
    let brokers = brokers_with(&journal, Failures::on(&["uninstrument"]), Failures::none(), Failures::none());

    let err = run(&brokers, &one_step_plan(2), &sample_description()).0.unwrap_err();

    assert!(matches!(err, ExperimentError::Instrumentation(_)));
}

/// Tests that initialization failures stop the series before any step.
#[test]
fn initialization_failure_stops_before_steps() {
    let journal = Journal::new();
    let brokers = brokers_with(&journal, Failures::none(), Failures::on(&["measurement.initialize"]), Failures::none());

    run(&brokers, &one_step_plan(2), &sample_description()).0.unwrap_err();

    assert_eq!(journal.count("workload.initialize"), 0);
    assert_eq!(journal.count("uninstrument"), 0);
}

// ============================================================================
// SECTION: Shutdown and Validation
// ============================================================================

/// Tests that a pending shutdown stops the series at the first step boundary.
#[test]
fn shutdown_stops_series_between_steps() {
    let journal = Journal::new();
    let brokers = journaled_brokers(&journal);
    let progress = ProgressTracker::new();
    let shutdown = ShutdownSignal::new();
    shutdown.request();
    let runner = ExperimentRunner::new(&brokers, &progress, &shutdown, Vec::new());

    let err = runner.run_series(&one_step_plan(2), &sample_description()).unwrap_err();

    assert_eq!(err, ExperimentError::ShutdownRequested);
    assert_eq!(journal.count("start_load:2"), 0);
}

/// Tests that invalid plans are rejected before any satellite is touched.
#[test]
fn invalid_plan_is_rejected_up_front() {
    let journal = Journal::new();
    let brokers = journaled_brokers(&journal);

    let err = run(&brokers, &ExperimentPlan::default().with_experiments(0), &sample_description()).0.unwrap_err();

    assert!(matches!(err, ExperimentError::InvalidPlan(_)));
    assert!(journal.entries().is_empty());
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Tests phase ordering and ramp-up waits across user, interval, and step counts.
    #[test]
    fn every_step_keeps_phase_order(
        steps in 1_u32 .. 4,
        per_interval in 1_u32 .. 12,
        full_intervals in 1_u32 .. 8,
        remainder in 0_u32 .. 12,
        interval_secs in 1_u64 .. 90,
    ) {
        // Exact multiples when the remainder wraps to zero, partial intervals otherwise.
        let max_users = per_interval * full_intervals + remainder % per_interval;
        let plan = ramp_plan(steps, max_users, per_interval, interval_secs);
        let journal = Journal::new();
        let log = LoadLog::new();

        let series = run(&logged_brokers(&journal, &log), &plan, &sample_description()).0.unwrap();

        prop_assert_eq!(series.datasets.len(), usize::try_from(steps).unwrap());
        let entries = journal.entries();
        let step_entries: Vec<&String> = entries.iter().skip(3).collect();
        prop_assert_eq!(step_entries.len(), usize::try_from(steps).unwrap() * 10);
        for chunk in step_entries.chunks(10) {
            prop_assert_eq!(chunk[0].as_str(), "instrument");
            prop_assert!(chunk[1].starts_with("start_load:"));
            prop_assert_eq!(chunk[2].as_str(), "wait_warmup");
            prop_assert_eq!(chunk[3].as_str(), "enable_monitoring");
            prop_assert_eq!(chunk[4].as_str(), "wait_experiment");
            prop_assert_eq!(chunk[5].as_str(), "disable_monitoring");
            prop_assert_eq!(chunk[6].as_str(), "wait_finished");
            prop_assert_eq!(chunk[9].as_str(), "uninstrument");
        }

        let started = log.started();
        prop_assert_eq!(&started, &plan.loads());
        let ramps = log.ramp_waits();
        prop_assert_eq!(ramps.len(), started.len());
        for (load, ramp) in started.iter().zip(&ramps) {
            prop_assert_eq!(*ramp, expected_ramp(load.num_users, per_interval, interval_secs));
        }
        let users: Vec<u32> = series.datasets.iter().map(|d| d.load.num_users).collect();
        prop_assert!(users.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(users.last().copied(), Some(max_users));
    }

    /// Tests that total duration is the sum of its phases.
    #[test]
    fn total_duration_sums_phases(
        users in 1_u32 .. 200,
        per_interval in 1_u32 .. 20,
        interval in 1_u64 .. 60,
        stable in 1_u64 .. 600,
    ) {
        let load = LoadConfig {
            num_users: users,
            ramp_up_interval_secs: interval,
            ramp_up_users_per_interval: per_interval,
            cool_down_interval_secs: interval,
            cool_down_users_per_interval: per_interval,
            experiment_duration_secs: stable,
        };
        let ramp = load.ramp_up_duration();
        prop_assert_eq!(ramp, Duration::from_secs(interval * load.ramp_up_intervals()));
        prop_assert_eq!(load.total_duration(), ramp + load.cool_down_duration() + Duration::from_secs(stable));
        prop_assert!(load.ramp_up_intervals() <= u64::from(users));
    }
}
