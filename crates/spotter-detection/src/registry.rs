// crates/spotter-detection/src/registry.rs
// ============================================================================
// Module: Built-in Controller Registration
// Description: Registers the threshold and scalability controllers.
// Purpose: Make built-in controllers resolvable by extension name.
// Dependencies: spotter-core
// ============================================================================

//! ## Overview
//! Hierarchy nodes name their controller through `extension`; these are the
//! names the built-in controllers answer to.

use spotter_core::ExtensionError;
use spotter_core::ExtensionRegistry;

use crate::scalability::ScalabilityController;
use crate::threshold::ThresholdController;

/// Extension name of [`ThresholdController`].
pub const THRESHOLD_CONTROLLER: &str = "threshold";
/// Extension name of [`ScalabilityController`].
pub const SCALABILITY_CONTROLLER: &str = "scalability";

/// Registers every built-in detection controller.
///
/// # Errors
///
/// Returns [`ExtensionError::AlreadyRegistered`] when a built-in name is taken.
pub fn register_builtin_controllers(registry: &mut ExtensionRegistry) -> Result<(), ExtensionError> {
    registry.register_controller(THRESHOLD_CONTROLLER, || Box::new(ThresholdController::default()))?;
    registry.register_controller(SCALABILITY_CONTROLLER, || Box::new(ScalabilityController::default()))?;
    Ok(())
}
