// crates/spotter-service/tests/service_jobs.rs
// ============================================================================
// Module: Diagnosis Service Tests
// Description: Job lifecycle, artifacts, and validation through the service.
// Purpose: Ensure the service wires config, extensions, and engine correctly.
// Dependencies: spotter-service, spotter-core, tempfile
// ============================================================================

//! ## Overview
//! Every test writes a `spotter.toml` and hierarchy into a temporary
//! directory and drives the service with the built-in simulated satellites.

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

use std::fs;
use std::path::PathBuf;

use spotter_config::ConfigError;
use spotter_core::EngineError;
use spotter_core::ExtensionError;
use spotter_core::JobId;
use spotter_core::JobState;
use spotter_core::ProblemId;
use spotter_service::DiagnosisService;
use spotter_service::ServiceError;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const HIERARCHY: &str = r#"
id = "root"
name = "Root"

[[children]]
id = "slow"
name = "Slow Cart"
extension = "threshold"
config = { threshold = 30, scope = "com.shop.Cart" }

[[children]]
id = "errors"
name = "Errors"
extension = "threshold"
config = { metric = "error_rate", threshold = 0.5 }
"#;

/// Writes a config with simulated satellites and returns its path.
fn write_config(dir: &TempDir, workload_time_scale: &str, hierarchy: Option<&str>) -> PathBuf {
    let hierarchy_line = match hierarchy {
        Some(content) => {
            fs::write(dir.path().join("hierarchy.toml"), content).unwrap();
            "hierarchy = \"hierarchy.toml\"\n"
        }
        None => "",
    };
    let config = format!(
        r#"[diagnosis]
{hierarchy_line}report_dir = "reports"

[experiment]
num_experiments = 1
max_users = 10
experiment_duration_secs = 60

[[satellites]]
kind = "instrumentation"
extension = "simulated"
name = "agent"

[[satellites]]
kind = "measurement"
extension = "simulated"
name = "monitor"
properties = {{ base_response_ms = 20, ms_per_user = 2, samples = 2 }}

[[satellites]]
kind = "workload"
extension = "simulated"
name = "driver"
properties = {{ time_scale = {workload_time_scale} }}
"#
    );
    let path = dir.path().join("spotter.toml");
    fs::write(&path, config).unwrap();
    path
}

// ============================================================================
// SECTION: Job Lifecycle
// ============================================================================

/// Tests a finished job and the files it leaves behind.
#[test]
fn finished_job_writes_report_and_measurements() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "0", Some(HIERARCHY));
    let service = DiagnosisService::with_builtins().unwrap();

    let job_id = service.start(Some(&config)).unwrap();
    service.wait();

    assert_eq!(job_id, JobId::new(1));
    assert_eq!(service.job_state(), JobState::Finished);
    assert!(service.last_run_error().is_none());
    let report = service.last_report().unwrap();
    assert_eq!(report.detected_count(), 1);
    assert!(report.generated_at.is_some());

    let job_dir = dir.path().join("reports").join("job-1");
    let text = fs::read_to_string(job_dir.join("report.txt")).unwrap();
    assert!(text.contains("[DETECTED] Slow Cart (slow)"), "{text}");
    assert!(text.contains("[not detected] Errors (errors)"), "{text}");
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(job_dir.join("report.json")).unwrap()).unwrap();
    assert_eq!(json["state"], "FINISHED");
    assert!(json["generated_at"].is_string());

    // Each of the two problems ran one step: 2 samples x 3 metrics at one location.
    let lines = fs::read_to_string(job_dir.join("measurements.jsonl")).unwrap();
    assert_eq!(lines.lines().count(), 6);
    assert!(job_dir.join("satellites").join("monitor").join("measurements.json").is_file());
}

#[test]
fn missing_hierarchy_falls_back_to_the_default() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "0", None);
    let service = DiagnosisService::with_builtins().unwrap();

    service.start(Some(&config)).unwrap();
    service.wait();

    assert_eq!(service.job_state(), JobState::Finished);
    let report = service.last_report().unwrap();
    assert!(report.entries.is_empty());
    assert!(dir.path().join("reports").join("job-1").join("report.txt").is_file());
}

/// Tests that setup errors surface before any job starts.
#[test]
fn malformed_config_starts_no_job() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("spotter.toml");
    fs::write(&path, "[experiment]\nexperiment_duration_secs = 0\n").unwrap();
    let service = DiagnosisService::with_builtins().unwrap();

    let err = service.start(Some(&path)).unwrap_err();

    assert!(matches!(err, ServiceError::Config(ConfigError::Invalid(_))));
    assert_eq!(service.job_state(), JobState::Idle);
    assert!(!service.is_running());
}

#[test]
fn invalid_satellite_properties_start_no_job() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "\"fast\"", Some(HIERARCHY));
    let service = DiagnosisService::with_builtins().unwrap();

    let err = service.start(Some(&config)).unwrap_err();

    assert!(matches!(err, ServiceError::Extension(ExtensionError::InvalidSatellite { ref name, .. }) if name == "driver"));
    assert_eq!(service.job_state(), JobState::Idle);
}

/// Tests that a second start is rejected and shutdown cancels the job.
#[test]
fn concurrent_start_is_rejected_and_shutdown_cancels() {
    let dir = TempDir::new().unwrap();
    // Each experiment sleeps for roughly 0.6 s of scaled phase time.
    let config = write_config(&dir, "0.01", Some(HIERARCHY));
    let service = DiagnosisService::with_builtins().unwrap();

    let first = service.start(Some(&config)).unwrap();
    let second = service.start(Some(&config)).unwrap();
    assert_eq!(service.current_job_id(), first);
    service.request_shutdown();
    service.wait();

    assert_eq!(first, JobId::new(1));
    assert_eq!(second, JobId::NONE);
    assert_eq!(service.current_job_id(), JobId::NONE);
    assert_eq!(service.job_state(), JobState::Cancelled);
    assert_eq!(service.last_run_error(), Some(EngineError::ShutdownRequested));
    let text = fs::read_to_string(dir.path().join("reports").join("job-1").join("report.txt")).unwrap();
    assert!(text.contains("Error: shutdown requested"), "{text}");
}

// ============================================================================
// SECTION: Validation
// ============================================================================

#[test]
fn validation_counts_satellites_and_detectable_problems() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "0", Some(HIERARCHY));
    let service = DiagnosisService::with_builtins().unwrap();
    let config = DiagnosisService::load_config(Some(&path)).unwrap();

    let summary = service.validate(&config).unwrap();

    assert_eq!(summary.satellites, 3);
    assert_eq!(summary.detectable, 2);
    assert_eq!(summary.hierarchy.len(), 3);
}

/// Tests that validation rejects what a lenient run would skip.
#[test]
fn validation_rejects_unknown_extensions_and_bad_controller_config() {
    let dir = TempDir::new().unwrap();
    let service = DiagnosisService::with_builtins().unwrap();

    let unknown = write_config(&dir, "0", Some("id = \"root\"\nname = \"Root\"\nextension = \"psychic\"\n"));
    let config = DiagnosisService::load_config(Some(&unknown)).unwrap();
    let err = service.validate(&config).unwrap_err();
    assert!(matches!(err, ServiceError::Extension(ExtensionError::UnknownExtension { ref name, .. }) if name == "psychic"));

    let bad = write_config(&dir, "0", Some("id = \"root\"\nname = \"Root\"\nextension = \"threshold\"\n"));
    let config = DiagnosisService::load_config(Some(&bad)).unwrap();
    let err = service.validate(&config).unwrap_err();
    assert!(matches!(err, ServiceError::Controller { ref problem, .. } if *problem == ProblemId::new("root")));

    let duplicate = write_config(
        &dir,
        "0",
        Some("id = \"root\"\nname = \"Root\"\n[[children]]\nid = \"root\"\nname = \"Again\"\n"),
    );
    let config = DiagnosisService::load_config(Some(&duplicate)).unwrap();
    assert!(matches!(service.validate(&config).unwrap_err(), ServiceError::Hierarchy(_)));
}
