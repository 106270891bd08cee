// crates/spotter-core/src/runtime/shutdown.rs
// ============================================================================
// Module: Spotter Shutdown Signal
// Description: Cooperative cancellation flag shared with the diagnosis worker.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The engine checks the signal at node boundaries and the experiment runner
//! checks it at step boundaries. In-flight satellite calls are never aborted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

// ============================================================================
// SECTION: Signal
// ============================================================================

/// Cloneable cooperative shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    /// Creates a cleared signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once shutdown has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clears a previous request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}
