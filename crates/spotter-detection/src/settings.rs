// crates/spotter-detection/src/settings.rs
// ============================================================================
// Module: Controller Settings
// Description: Typed view of the config keys shared by built-in controllers.
// Purpose: Parse node config into series parameters and instrumentation needs.
// Dependencies: spotter-core
// ============================================================================

//! ## Overview
//! Built-in controllers read the same series keys from node config:
//!
//! - `metric`: metric to analyse (default `response_time_ms`)
//! - `scope`: comma separated scopes to instrument
//! - `probes`: comma separated probe names (default: the metric)
//! - `experiments`: number of experiment steps
//! - `max_users`: users at the last step (default: the configured plan)
//! - `reuse_scope`: label under which siblings share one series
//!
//! Numeric keys accept any value that parses as the target type; zero step or
//! user counts are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::str::FromStr;

use spotter_core::ControllerError;
use spotter_core::InstrumentationDescription;
use spotter_core::InstrumentationEntity;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Metric analysed when `metric` is not configured.
pub const DEFAULT_METRIC: &str = "response_time_ms";

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Series parameters shared by the built-in controllers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSettings {
    /// Metric to analyse.
    pub metric: String,
    /// Scopes to instrument, in config order.
    pub scopes: Vec<String>,
    /// Probes attached to every scope.
    pub probes: BTreeSet<String>,
    /// Number of experiment steps.
    pub experiments: u32,
    /// Users at the last step, when overriding the configured plan.
    pub max_users: Option<u32>,
    /// Reuse scope label.
    pub reuse_scope: Option<String>,
}

impl SeriesSettings {
    /// Creates settings with defaults and `experiments` steps.
    #[must_use]
    pub fn with_experiments(experiments: u32) -> Self {
        Self {
            metric: DEFAULT_METRIC.to_string(),
            scopes: Vec::new(),
            probes: BTreeSet::from([DEFAULT_METRIC.to_string()]),
            experiments,
            max_users: None,
            reuse_scope: None,
        }
    }

    /// Parses the series keys of a node config.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] when a value is malformed.
    pub fn from_config(config: &BTreeMap<String, String>, default_experiments: u32) -> Result<Self, ControllerError> {
        let metric = text(config, "metric").unwrap_or_else(|| DEFAULT_METRIC.to_string());
        let mut probes = list(config, "probes").into_iter().collect::<BTreeSet<_>>();
        if probes.is_empty() {
            probes.insert(metric.clone());
        }
        let experiments = parse(config, "experiments")?.unwrap_or(default_experiments);
        if experiments == 0 {
            return Err(ControllerError::invalid_config("experiments", "must be at least 1"));
        }
        let max_users = parse::<u32>(config, "max_users")?;
        if max_users == Some(0) {
            return Err(ControllerError::invalid_config("max_users", "must be at least 1"));
        }
        Ok(Self {
            metric,
            scopes: list(config, "scope"),
            probes,
            experiments,
            max_users,
            reuse_scope: text(config, "reuse_scope"),
        })
    }

    /// Returns the instrumentation this controller needs.
    #[must_use]
    pub fn description(&self) -> InstrumentationDescription {
        self.scopes.iter().fold(InstrumentationDescription::new(), |description, scope| {
            description.with_entity(InstrumentationEntity::new(scope.as_str(), self.probes.iter().cloned()))
        })
    }
}

// ============================================================================
// SECTION: Parsing Helpers
// ============================================================================

/// Returns a trimmed non-empty value.
pub(crate) fn text(config: &BTreeMap<String, String>, key: &str) -> Option<String> {
    config.get(key).map(|raw| raw.trim()).filter(|raw| !raw.is_empty()).map(ToString::to_string)
}

/// Parses an optional value.
pub(crate) fn parse<T>(config: &BTreeMap<String, String>, key: &str) -> Result<Option<T>, ControllerError>
where
    T: FromStr,
{
    text(config, key)
        .map(|raw| raw.parse().map_err(|_| ControllerError::invalid_config(key, format!("cannot parse '{raw}'"))))
        .transpose()
}

/// Splits a comma separated value, dropping blanks.
fn list(config: &BTreeMap<String, String>, key: &str) -> Vec<String> {
    config
        .get(key)
        .map(|raw| raw.split(',').map(str::trim).filter(|item| !item.is_empty()).map(ToString::to_string).collect())
        .unwrap_or_default()
}
