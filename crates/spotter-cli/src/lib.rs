// crates/spotter-cli/src/lib.rs
// ============================================================================
// Module: Spotter CLI Library
// Description: Logging setup and progress rendering shared by the binary.
// Purpose: Keep testable CLI helpers out of the entry point.
// Dependencies: spotter-config, spotter-core, tracing-subscriber
// ============================================================================

//! ## Overview
//! Helpers used by the `spotter` binary: installing the tracing subscriber
//! from the `[logging]` config section and turning progress snapshots into
//! change lines.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod logging;
pub mod progress;
