// crates/spotter-core/src/core/instrumentation.rs
// ============================================================================
// Module: Spotter Instrumentation Description
// Description: What to instrument and which scopes to include or exclude.
// Purpose: Shared description handed to every instrumentation satellite.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`InstrumentationDescription`] lists instrumentation entities (a scope
//! pattern plus probe names) and global include/exclude scope filters.
//! Satellites may declare their own filters through adapter properties; the
//! instrumentation broker merges those into a per-adapter copy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Adapter property listing additional include scopes (comma separated).
pub const INCLUDES_PROPERTY: &str = "instrumentation.includes";
/// Adapter property listing additional exclude scopes (comma separated).
pub const EXCLUDES_PROPERTY: &str = "instrumentation.excludes";

// ============================================================================
// SECTION: Types
// ============================================================================

/// One scope pattern with the probes to attach to it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentationEntity {
    /// Scope pattern (for example a package or method glob).
    pub scope: String,
    /// Probe names.
    #[serde(default)]
    pub probes: BTreeSet<String>,
}

impl InstrumentationEntity {
    /// Creates an entity for the given scope and probes.
    #[must_use]
    pub fn new<I, S>(scope: impl Into<String>, probes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scope: scope.into(),
            probes: probes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Instrumentation request shared across satellites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationDescription {
    /// Entities to instrument.
    #[serde(default)]
    pub entities: Vec<InstrumentationEntity>,
    /// Scopes that must be included.
    #[serde(default)]
    pub includes: BTreeSet<String>,
    /// Scopes that must be excluded.
    #[serde(default)]
    pub excludes: BTreeSet<String>,
}

impl InstrumentationDescription {
    /// Creates an empty description.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when there is nothing to instrument.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Adds an entity, merging probes into an existing entity with the same scope.
    #[must_use]
    pub fn with_entity(mut self, entity: InstrumentationEntity) -> Self {
        self.add_entity(entity);
        self
    }

    /// Adds an include scope.
    #[must_use]
    pub fn with_include(mut self, scope: impl Into<String>) -> Self {
        self.includes.insert(scope.into());
        self
    }

    /// Adds an exclude scope.
    #[must_use]
    pub fn with_exclude(mut self, scope: impl Into<String>) -> Self {
        self.excludes.insert(scope.into());
        self
    }

    /// Merges another description into this one.
    pub fn merge(&mut self, other: &Self) {
        for entity in &other.entities {
            self.add_entity(entity.clone());
        }
        self.includes.extend(other.includes.iter().cloned());
        self.excludes.extend(other.excludes.iter().cloned());
    }

    /// Returns a copy extended with the given include/exclude scopes.
    #[must_use]
    pub fn with_scope_filters(
        &self,
        includes: impl IntoIterator<Item = String>,
        excludes: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut merged = self.clone();
        merged.includes.extend(includes);
        merged.excludes.extend(excludes);
        merged
    }

    /// Returns a copy extended with the scope filters declared in adapter properties.
    #[must_use]
    pub fn with_property_filters(&self, properties: &BTreeMap<String, String>) -> Self {
        let (includes, excludes) = scope_filters_from_properties(properties);
        self.with_scope_filters(includes, excludes)
    }

    /// Adds an entity in place.
    fn add_entity(&mut self, entity: InstrumentationEntity) {
        if let Some(existing) = self.entities.iter_mut().find(|e| e.scope == entity.scope) {
            existing.probes.extend(entity.probes);
        } else {
            self.entities.push(entity);
        }
    }
}

// ============================================================================
// SECTION: Property Parsing
// ============================================================================

/// Extracts include and exclude scopes from adapter properties.
#[must_use]
pub fn scope_filters_from_properties(
    properties: &BTreeMap<String, String>,
) -> (BTreeSet<String>, BTreeSet<String>) {
    (split_scopes(properties.get(INCLUDES_PROPERTY)), split_scopes(properties.get(EXCLUDES_PROPERTY)))
}

/// Splits a comma separated scope list, dropping blanks.
fn split_scopes(value: Option<&String>) -> BTreeSet<String> {
    value
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|scope| !scope.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}
