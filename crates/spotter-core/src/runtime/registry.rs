// crates/spotter-core/src/runtime/registry.rs
// ============================================================================
// Module: Spotter Extension Registry
// Description: Named factories for detection controllers and satellite adapters.
// Purpose: Resolve extension names from hierarchies and configs to implementations.
// Dependencies: crate::{core, interfaces, runtime}, thiserror, tracing
// ============================================================================

//! ## Overview
//! Extensions are registered once at startup by explicit registration calls
//! (see the built-in registration helpers of the satellite and detection
//! crates). The engine resolves a fresh controller per investigated node; the
//! service builds the three brokers from satellite descriptors.
//!
//! Invariants:
//! - Names are unique per extension kind.
//! - Unknown names fail with [`ExtensionError::UnknownExtension`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::core::SatelliteDescriptor;
use crate::core::SatelliteKind;
use crate::interfaces::InstrumentationAdapter;
use crate::interfaces::MeasurementAdapter;
use crate::interfaces::WorkloadAdapter;
use crate::runtime::broker::SatelliteBrokers;
use crate::runtime::controller::DetectionController;

// ============================================================================
// SECTION: Extension Kinds
// ============================================================================

/// Kind of extension a name is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtensionKind {
    /// Detection controller.
    Controller,
    /// Satellite adapter of the given kind.
    Satellite(SatelliteKind),
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Controller => f.write_str("controller"),
            Self::Satellite(kind) => write!(f, "{kind} satellite"),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Extension registration and resolution errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    /// No extension is registered under the name.
    #[error("unknown {kind} extension: {name}")]
    UnknownExtension {
        /// Extension kind.
        kind: ExtensionKind,
        /// Requested name.
        name: String,
    },
    /// The name is already registered.
    #[error("{kind} extension already registered: {name}")]
    AlreadyRegistered {
        /// Extension kind.
        kind: ExtensionKind,
        /// Duplicate name.
        name: String,
    },
    /// A satellite descriptor was rejected by its factory.
    #[error("invalid satellite {name}: {message}")]
    InvalidSatellite {
        /// Satellite name.
        name: String,
        /// Failure details.
        message: String,
    },
}

impl ExtensionError {
    /// Builds an [`ExtensionError::InvalidSatellite`] error for a descriptor.
    #[must_use]
    pub fn invalid_satellite(descriptor: &SatelliteDescriptor, message: impl Into<String>) -> Self {
        Self::InvalidSatellite {
            name: descriptor.name.clone(),
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Factories
// ============================================================================

/// Creates a fresh detection controller.
pub type ControllerFactory = Box<dyn Fn() -> Box<dyn DetectionController> + Send + Sync>;
/// Builds an instrumentation adapter from a descriptor.
pub type InstrumentationFactory =
    Box<dyn Fn(&SatelliteDescriptor) -> Result<Box<dyn InstrumentationAdapter>, ExtensionError> + Send + Sync>;
/// Builds a measurement adapter from a descriptor.
pub type MeasurementFactory =
    Box<dyn Fn(&SatelliteDescriptor) -> Result<Box<dyn MeasurementAdapter>, ExtensionError> + Send + Sync>;
/// Builds a workload adapter from a descriptor.
pub type WorkloadFactory =
    Box<dyn Fn(&SatelliteDescriptor) -> Result<Box<dyn WorkloadAdapter>, ExtensionError> + Send + Sync>;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry of named extension factories.
#[derive(Default)]
pub struct ExtensionRegistry {
    /// Controller factories keyed by extension name.
    controllers: BTreeMap<String, ControllerFactory>,
    /// Instrumentation adapter factories keyed by extension name.
    instrumentation: BTreeMap<String, InstrumentationFactory>,
    /// Measurement adapter factories keyed by extension name.
    measurement: BTreeMap<String, MeasurementFactory>,
    /// Workload adapter factories keyed by extension name.
    workload: BTreeMap<String, WorkloadFactory>,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller factory.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::AlreadyRegistered`] on duplicate names.
    pub fn register_controller<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), ExtensionError>
    where
        F: Fn() -> Box<dyn DetectionController> + Send + Sync + 'static,
    {
        let factory: ControllerFactory = Box::new(factory);
        insert_unique(&mut self.controllers, ExtensionKind::Controller, name.into(), factory)
    }

    /// Registers an instrumentation adapter factory.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::AlreadyRegistered`] on duplicate names.
    pub fn register_instrumentation<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), ExtensionError>
    where
        F: Fn(&SatelliteDescriptor) -> Result<Box<dyn InstrumentationAdapter>, ExtensionError> + Send + Sync + 'static,
    {
        let factory: InstrumentationFactory = Box::new(factory);
        insert_unique(&mut self.instrumentation, ExtensionKind::Satellite(SatelliteKind::Instrumentation), name.into(), factory)
    }

    /// Registers a measurement adapter factory.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::AlreadyRegistered`] on duplicate names.
    pub fn register_measurement<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), ExtensionError>
    where
        F: Fn(&SatelliteDescriptor) -> Result<Box<dyn MeasurementAdapter>, ExtensionError> + Send + Sync + 'static,
    {
        let factory: MeasurementFactory = Box::new(factory);
        insert_unique(&mut self.measurement, ExtensionKind::Satellite(SatelliteKind::Measurement), name.into(), factory)
    }

    /// Registers a workload adapter factory.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::AlreadyRegistered`] on duplicate names.
    pub fn register_workload<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), ExtensionError>
    where
        F: Fn(&SatelliteDescriptor) -> Result<Box<dyn WorkloadAdapter>, ExtensionError> + Send + Sync + 'static,
    {
        let factory: WorkloadFactory = Box::new(factory);
        insert_unique(&mut self.workload, ExtensionKind::Satellite(SatelliteKind::Workload), name.into(), factory)
    }

    /// Creates a fresh controller for the extension name.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::UnknownExtension`] when the name is not registered.
    pub fn resolve_controller(&self, name: &str) -> Result<Box<dyn DetectionController>, ExtensionError> {
        let factory = self.controllers.get(name).ok_or_else(|| ExtensionError::UnknownExtension {
            kind: ExtensionKind::Controller,
            name: name.to_string(),
        })?;
        debug!(extension = name, "resolved detection controller");
        Ok(factory())
    }

    /// Returns true when a controller is registered under the name.
    #[must_use]
    pub fn has_controller(&self, name: &str) -> bool {
        self.controllers.contains_key(name)
    }

    /// Returns the registered controller names.
    #[must_use]
    pub fn controller_names(&self) -> Vec<String> {
        self.controllers.keys().cloned().collect()
    }

    /// Returns the registered satellite extension names of a kind.
    #[must_use]
    pub fn satellite_names(&self, kind: SatelliteKind) -> Vec<String> {
        match kind {
            SatelliteKind::Instrumentation => self.instrumentation.keys().cloned().collect(),
            SatelliteKind::Measurement => self.measurement.keys().cloned().collect(),
            SatelliteKind::Workload => self.workload.keys().cloned().collect(),
        }
    }

    /// Builds the three brokers from satellite descriptors, preserving order per kind.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] when an extension is unknown or a factory
    /// rejects its descriptor.
    pub fn build_brokers(&self, descriptors: &[SatelliteDescriptor]) -> Result<SatelliteBrokers, ExtensionError> {
        let mut instrumentation = Vec::new();
        let mut measurement = Vec::new();
        let mut workload = Vec::new();
        for descriptor in descriptors {
            match descriptor.kind {
                SatelliteKind::Instrumentation => {
                    let build = lookup(&self.instrumentation, descriptor)?;
                    instrumentation.push(build(descriptor)?);
                }
                SatelliteKind::Measurement => {
                    let build = lookup(&self.measurement, descriptor)?;
                    measurement.push(build(descriptor)?);
                }
                SatelliteKind::Workload => {
                    let build = lookup(&self.workload, descriptor)?;
                    workload.push(build(descriptor)?);
                }
            }
            debug!(
                kind = %descriptor.kind,
                extension = descriptor.extension_name.as_str(),
                satellite = descriptor.name.as_str(),
                "built satellite adapter"
            );
        }
        let mut brokers = SatelliteBrokers::new();
        brokers.instrumentation.set_controllers(instrumentation);
        brokers.measurement.set_controllers(measurement);
        brokers.workload.set_controllers(workload);
        Ok(brokers)
    }
}

/// Inserts a factory, rejecting duplicate names.
fn insert_unique<V>(
    map: &mut BTreeMap<String, V>,
    kind: ExtensionKind,
    name: String,
    value: V,
) -> Result<(), ExtensionError> {
    if map.contains_key(&name) {
        return Err(ExtensionError::AlreadyRegistered {
            kind,
            name,
        });
    }
    map.insert(name, value);
    Ok(())
}

/// Looks up the factory named by a descriptor.
fn lookup<'m, V>(map: &'m BTreeMap<String, V>, descriptor: &SatelliteDescriptor) -> Result<&'m V, ExtensionError> {
    map.get(&descriptor.extension_name).ok_or_else(|| ExtensionError::UnknownExtension {
        kind: ExtensionKind::Satellite(descriptor.kind),
        name: descriptor.extension_name.clone(),
    })
}
