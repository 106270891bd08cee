// crates/spotter-config/src/config.rs
// ============================================================================
// Module: Spotter Configuration
// Description: Configuration loading and validation for Spotter.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: spotter-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, else `SPOTTER_CONFIG`, else
//! `./spotter.toml`. Relative hierarchy and report paths are resolved against
//! the directory of the config file. Missing or invalid configuration fails
//! closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use spotter_core::EngineConfig;
use spotter_core::ExperimentPlan;
use spotter_core::LoadConfig;
use spotter_core::SatelliteDescriptor;
use spotter_core::SatelliteKind;
use spotter_core::TraversalPolicy;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "spotter.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SPOTTER_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of configured satellites.
pub(crate) const MAX_SATELLITES: usize = 64;
/// Maximum number of steps in the default experiment series.
pub(crate) const MAX_EXPERIMENTS: u32 = 100;
/// Maximum number of properties per satellite.
pub(crate) const MAX_SATELLITE_PROPERTIES: usize = 128;
/// Default report directory, relative to the config file.
const DEFAULT_REPORT_DIR: &str = "spotter-reports";
/// Accepted log levels.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ============================================================================
// SECTION: Scalar Values
// ============================================================================

/// Scalar value accepted in property and controller config tables.
///
/// Every variant renders to the string form adapters and controllers read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    Text(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// Renders a scalar table into string key/value pairs.
#[must_use]
pub fn stringify_scalars(values: &BTreeMap<String, ScalarValue>) -> BTreeMap<String, String> {
    values.iter().map(|(key, value)| (key.clone(), value.to_string())).collect()
}

// ============================================================================
// SECTION: Root Configuration
// ============================================================================

/// Spotter configuration loaded from `spotter.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotterConfig {
    /// Diagnosis run settings.
    #[serde(default)]
    pub diagnosis: DiagnosisConfig,
    /// Defaults for the default experiment series.
    #[serde(default)]
    pub experiment: ExperimentConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Satellite definitions.
    #[serde(default)]
    pub satellites: Vec<SatelliteConfig>,
    /// Path the config was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl SpotterConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source_path = Some(resolved);
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.diagnosis.validate()?;
        self.experiment.validate()?;
        self.logging.validate()?;
        if self.satellites.len() > MAX_SATELLITES {
            return Err(ConfigError::Invalid(format!("too many satellites (max {MAX_SATELLITES})")));
        }
        let mut names = BTreeSet::new();
        for satellite in &self.satellites {
            satellite.validate()?;
            if !names.insert((satellite.kind, satellite.name.trim())) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate {} satellite name: {}",
                    satellite.kind, satellite.name
                )));
            }
        }
        Ok(())
    }

    /// Returns the directory relative paths are resolved against.
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    /// Returns the resolved hierarchy path, if one is configured.
    #[must_use]
    pub fn hierarchy_path(&self) -> Option<PathBuf> {
        self.diagnosis.hierarchy.as_deref().map(|path| self.resolve(path))
    }

    /// Returns the resolved report directory.
    #[must_use]
    pub fn report_dir(&self) -> PathBuf {
        self.resolve(&self.diagnosis.report_dir)
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            traversal: self.diagnosis.traversal,
            default_plan: self.experiment.plan(),
        }
    }

    /// Returns satellite descriptors in configuration order.
    #[must_use]
    pub fn satellite_descriptors(&self) -> Vec<SatelliteDescriptor> {
        self.satellites.iter().map(SatelliteConfig::descriptor).collect()
    }

    /// Resolves a path against the config directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.base_dir().join(path) }
    }
}

// ============================================================================
// SECTION: Diagnosis
// ============================================================================

/// Diagnosis run settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisConfig {
    /// Problem hierarchy file (`.toml`, `.json`, `.yaml`).
    #[serde(default)]
    pub hierarchy: Option<PathBuf>,
    /// Rule deciding descent into children.
    #[serde(default)]
    pub traversal: TraversalPolicy,
    /// Directory receiving per-job reports.
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            hierarchy: None,
            traversal: TraversalPolicy::default(),
            report_dir: default_report_dir(),
        }
    }
}

impl DiagnosisConfig {
    /// Validates path settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(hierarchy) = &self.hierarchy {
            validate_path_string("diagnosis.hierarchy", &hierarchy.to_string_lossy())?;
        }
        validate_path_string("diagnosis.report_dir", &self.report_dir.to_string_lossy())
    }
}

// ============================================================================
// SECTION: Experiment Defaults
// ============================================================================

/// Defaults for the default experiment series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Number of steps.
    #[serde(default = "default_num_experiments")]
    pub num_experiments: u32,
    /// Users at the last step.
    #[serde(default = "default_max_users")]
    pub max_users: u32,
    /// Ramp-up interval length in seconds.
    #[serde(default = "default_interval_secs")]
    pub ramp_up_interval_secs: u64,
    /// Users added per ramp-up interval.
    #[serde(default = "default_users_per_interval")]
    pub ramp_up_users_per_interval: u32,
    /// Cool-down interval length in seconds.
    #[serde(default = "default_interval_secs")]
    pub cool_down_interval_secs: u64,
    /// Users removed per cool-down interval.
    #[serde(default = "default_users_per_interval")]
    pub cool_down_users_per_interval: u32,
    /// Stable phase duration in seconds.
    #[serde(default = "default_experiment_duration_secs")]
    pub experiment_duration_secs: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            num_experiments: default_num_experiments(),
            max_users: default_max_users(),
            ramp_up_interval_secs: default_interval_secs(),
            ramp_up_users_per_interval: default_users_per_interval(),
            cool_down_interval_secs: default_interval_secs(),
            cool_down_users_per_interval: default_users_per_interval(),
            experiment_duration_secs: default_experiment_duration_secs(),
        }
    }
}

impl ExperimentConfig {
    /// Returns the experiment plan these defaults describe.
    #[must_use]
    pub const fn plan(&self) -> ExperimentPlan {
        ExperimentPlan {
            num_experiments: self.num_experiments,
            max_users: self.max_users,
            template: LoadConfig {
                num_users: self.max_users,
                ramp_up_interval_secs: self.ramp_up_interval_secs,
                ramp_up_users_per_interval: self.ramp_up_users_per_interval,
                cool_down_interval_secs: self.cool_down_interval_secs,
                cool_down_users_per_interval: self.cool_down_users_per_interval,
                experiment_duration_secs: self.experiment_duration_secs,
            },
        }
    }

    /// Validates counts and durations.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.num_experiments > MAX_EXPERIMENTS {
            return Err(ConfigError::Invalid(format!(
                "experiment.num_experiments must be at most {MAX_EXPERIMENTS}"
            )));
        }
        if self.experiment_duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "experiment.experiment_duration_secs must be greater than zero".to_string(),
            ));
        }
        self.plan().validate().map_err(|err| ConfigError::Invalid(format!("experiment: {err}")))
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Returns the stable config label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Validates the level name.
    fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Satellites
// ============================================================================

/// One configured satellite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteConfig {
    /// Satellite kind.
    pub kind: SatelliteKind,
    /// Registered extension building the adapter.
    pub extension: String,
    /// Satellite name, unique per kind.
    pub name: String,
    /// Satellite host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Satellite port.
    #[serde(default)]
    pub port: u16,
    /// Adapter properties.
    #[serde(default)]
    pub properties: BTreeMap<String, ScalarValue>,
}

impl SatelliteConfig {
    /// Returns the core descriptor of this satellite.
    #[must_use]
    pub fn descriptor(&self) -> SatelliteDescriptor {
        SatelliteDescriptor {
            kind: self.kind,
            extension_name: self.extension.trim().to_string(),
            name: self.name.trim().to_string(),
            host: self.host.trim().to_string(),
            port: self.port,
            properties: stringify_scalars(&self.properties),
        }
    }

    /// Validates satellite identity and properties.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("satellite name is empty".to_string()));
        }
        if self.extension.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("satellite {} has no extension", self.name)));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("satellite {} has no host", self.name)));
        }
        if self.properties.len() > MAX_SATELLITE_PROPERTIES {
            return Err(ConfigError::Invalid(format!("satellite {} has too many properties", self.name)));
        }
        if self.properties.keys().any(|key| key.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("satellite {} has an empty property key", self.name)));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a resolved path against length limits.
pub(crate) fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default report directory.
fn default_report_dir() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT_DIR)
}

/// Default number of experiment steps.
const fn default_num_experiments() -> u32 {
    3
}

/// Default maximum user count.
const fn default_max_users() -> u32 {
    50
}

/// Default ramp interval length in seconds.
const fn default_interval_secs() -> u64 {
    1
}

/// Default users per ramp interval.
const fn default_users_per_interval() -> u32 {
    10
}

/// Default stable phase duration in seconds.
const fn default_experiment_duration_secs() -> u64 {
    60
}

/// Default log level.
fn default_log_level() -> String {
    "info".to_string()
}

/// Default satellite host.
fn default_host() -> String {
    "localhost".to_string()
}
