// crates/spotter-satellites/src/registry.rs
// ============================================================================
// Module: Built-in Satellite Registration
// Description: Registers the HTTP and simulated adapter factories.
// Purpose: Make built-in satellites resolvable by extension name.
// Dependencies: spotter-core
// ============================================================================

//! ## Overview
//! [`register_builtin_satellites`] adds the `http` and `simulated` extensions
//! for every satellite kind. All simulated adapters built from one registry
//! share a single [`SimulatedSystem`], so a simulated workload drives the
//! numbers a simulated measurement satellite reports.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use spotter_core::ExtensionError;
use spotter_core::ExtensionRegistry;

use crate::http::HttpInstrumentation;
use crate::http::HttpMeasurement;
use crate::http::HttpWorkload;
use crate::simulated::SimulatedInstrumentation;
use crate::simulated::SimulatedMeasurement;
use crate::simulated::SimulatedSystem;
use crate::simulated::SimulatedWorkload;

// ============================================================================
// SECTION: Extension Names
// ============================================================================

/// Extension name of the HTTP adapters.
pub const HTTP_EXTENSION: &str = "http";
/// Extension name of the simulated adapters.
pub const SIMULATED_EXTENSION: &str = "simulated";

// ============================================================================
// SECTION: Registration
// ============================================================================

/// Registers every built-in satellite extension with a fresh simulated system.
///
/// # Errors
///
/// Returns [`ExtensionError::AlreadyRegistered`] when a built-in name is taken.
pub fn register_builtin_satellites(registry: &mut ExtensionRegistry) -> Result<Arc<SimulatedSystem>, ExtensionError> {
    let system = Arc::new(SimulatedSystem::new());
    register_builtin_satellites_with(registry, &system)?;
    Ok(system)
}

/// Registers every built-in satellite extension sharing `system`.
///
/// # Errors
///
/// Returns [`ExtensionError::AlreadyRegistered`] when a built-in name is taken.
pub fn register_builtin_satellites_with(
    registry: &mut ExtensionRegistry,
    system: &Arc<SimulatedSystem>,
) -> Result<(), ExtensionError> {
    registry.register_instrumentation(HTTP_EXTENSION, |descriptor| Ok(Box::new(HttpInstrumentation::new(descriptor)?)))?;
    registry.register_measurement(HTTP_EXTENSION, |descriptor| Ok(Box::new(HttpMeasurement::new(descriptor)?)))?;
    registry.register_workload(HTTP_EXTENSION, |descriptor| Ok(Box::new(HttpWorkload::new(descriptor)?)))?;

    let shared = Arc::clone(system);
    registry.register_instrumentation(SIMULATED_EXTENSION, move |descriptor| {
        Ok(Box::new(SimulatedInstrumentation::new(descriptor, Arc::clone(&shared))))
    })?;
    let shared = Arc::clone(system);
    registry.register_measurement(SIMULATED_EXTENSION, move |descriptor| {
        Ok(Box::new(SimulatedMeasurement::new(descriptor, Arc::clone(&shared))?))
    })?;
    let shared = Arc::clone(system);
    registry.register_workload(SIMULATED_EXTENSION, move |descriptor| {
        Ok(Box::new(SimulatedWorkload::new(descriptor, Arc::clone(&shared))?))
    })?;
    Ok(())
}
