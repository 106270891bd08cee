// crates/spotter-core/src/core/satellite.rs
// ============================================================================
// Module: Spotter Satellite Descriptors
// Description: Declarative description of remote satellite endpoints.
// Purpose: Carry kind, extension, and endpoint data from config to adapters.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`SatelliteDescriptor`] names a satellite kind, the adapter extension that
//! talks to it, and its endpoint. Adapters keep a [`SatelliteInfo`] built from
//! the descriptor so that name, host, port, and properties are shared across
//! every kind-specific trait.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Satellite Kinds
// ============================================================================

/// Satellite kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatelliteKind {
    /// Code instrumentation satellite.
    Instrumentation,
    /// Measurement collection satellite.
    Measurement,
    /// Load generation satellite.
    Workload,
}

impl SatelliteKind {
    /// Returns the stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instrumentation => "instrumentation",
            Self::Measurement => "measurement",
            Self::Workload => "workload",
        }
    }
}

impl fmt::Display for SatelliteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Description of one configured satellite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteDescriptor {
    /// Satellite kind.
    pub kind: SatelliteKind,
    /// Adapter extension name resolved through the registry.
    pub extension_name: String,
    /// Satellite display name.
    pub name: String,
    /// Satellite host.
    pub host: String,
    /// Satellite port.
    pub port: u16,
    /// Free-form adapter properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Endpoint information shared by every adapter kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteInfo {
    /// Satellite display name.
    name: String,
    /// Satellite host.
    host: String,
    /// Satellite port.
    port: u16,
    /// Free-form adapter properties.
    properties: BTreeMap<String, String>,
}

impl SatelliteInfo {
    /// Creates endpoint information.
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            properties: BTreeMap::new(),
        }
    }

    /// Builds endpoint information from a descriptor.
    #[must_use]
    pub fn from_descriptor(descriptor: &SatelliteDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            host: descriptor.host.clone(),
            port: descriptor.port,
            properties: descriptor.properties.clone(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns the satellite name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the satellite host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the satellite port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns all properties.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Returns one property value.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Replaces all properties.
    pub fn set_properties(&mut self, properties: BTreeMap<String, String>) {
        self.properties = properties;
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
