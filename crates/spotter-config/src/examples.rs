// crates/spotter-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration and hierarchy payloads.
// Purpose: Deterministic starting points for operators and tests.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical examples for Spotter configuration. The config example wires the
//! simulated satellites so a dry run needs no external services.

/// Returns a canonical example `spotter.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[diagnosis]
hierarchy = "hierarchy.toml"
traversal = "prune_undetected"
report_dir = "spotter-reports"

[experiment]
num_experiments = 3
max_users = 50
ramp_up_interval_secs = 1
ramp_up_users_per_interval = 10
cool_down_interval_secs = 1
cool_down_users_per_interval = 10
experiment_duration_secs = 60

[logging]
level = "info"
format = "text"

[[satellites]]
kind = "instrumentation"
extension = "simulated"
name = "agent"

[[satellites]]
kind = "measurement"
extension = "simulated"
name = "monitor"
properties = { base_response_ms = 20.0, ms_per_user = 1.5, samples = 5 }

[[satellites]]
kind = "workload"
extension = "simulated"
name = "load-driver"
properties = { time_scale = 0.001 }
"#,
    )
}

/// Returns a canonical example problem hierarchy in TOML.
#[must_use]
pub fn hierarchy_toml_example() -> String {
    String::from(
        r#"id = "root"
name = "Performance Problems"

[[children]]
id = "slow-response"
name = "Slow Response Times"
extension = "threshold"
config = { metric = "response_time_ms", threshold = 100.0, scope = "com.shop.*", reuse_scope = "response" }

[[children.children]]
name = "Ramp"
extension = "scalability"
config = { metric = "response_time_ms", max_growth_ratio = 2.0 }

[[children]]
id = "unstable-throughput"
name = "Unstable Throughput"
extension = "threshold"
config = { metric = "error_rate", threshold = 0.05, reuse_scope = "response" }
"#,
    )
}
