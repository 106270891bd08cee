// crates/spotter-satellites/src/http.rs
// ============================================================================
// Module: HTTP Satellites
// Description: Satellite adapters speaking JSON over HTTP.
// Purpose: Reach remote instrumentation, measurement, and workload services.
// Dependencies: spotter-core, reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! Every operation is a `POST {scheme}://{host}:{port}{base_path}/{kind}/{operation}`
//! with a JSON body. A 2xx status is success; any other status, a transport
//! failure, or an oversized body becomes the adapter error. Phase waits use a
//! separate client bounded by `wait_timeout_ms`; a timed out wait is reported
//! as interrupted.
//!
//! Recognized descriptor properties: `scheme` (`http` | `https`), `base_path`,
//! `timeout_ms`, `wait_timeout_ms`, `max_response_bytes`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use spotter_core::ExtensionError;
use spotter_core::InstrumentationAdapter;
use spotter_core::InstrumentationDescription;
use spotter_core::InstrumentationError;
use spotter_core::LoadConfig;
use spotter_core::MeasurementAdapter;
use spotter_core::MeasurementData;
use spotter_core::MeasurementError;
use spotter_core::SatelliteAdapter;
use spotter_core::SatelliteDescriptor;
use spotter_core::SatelliteInfo;
use spotter_core::SatelliteKind;
use spotter_core::WorkloadAdapter;
use spotter_core::WorkloadError;
use tracing::debug;

use crate::properties::parse_or;
use crate::properties::text_or;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Connection settings of one HTTP satellite.
///
/// # Invariants
/// - `scheme` is `http` or `https`.
/// - `base_path` is empty or starts with `/` and has no trailing `/`.
/// - `max_response_bytes` is a hard upper bound on response bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSatelliteConfig {
    /// URL scheme.
    pub scheme: String,
    /// Path prefix placed before `/{kind}/{operation}`.
    pub base_path: String,
    /// Timeout of ordinary requests in milliseconds.
    pub timeout_ms: u64,
    /// Timeout of phase-wait requests in milliseconds.
    pub wait_timeout_ms: u64,
    /// Maximum accepted response size in bytes.
    pub max_response_bytes: usize,
}

impl Default for HttpSatelliteConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            base_path: String::new(),
            timeout_ms: 10_000,
            wait_timeout_ms: 3_600_000,
            max_response_bytes: 16 * 1024 * 1024,
        }
    }
}

impl HttpSatelliteConfig {
    /// Reads the settings from descriptor properties.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::InvalidSatellite`] when a property is
    /// malformed or the endpoint is unusable.
    pub fn from_descriptor(descriptor: &SatelliteDescriptor) -> Result<Self, ExtensionError> {
        let defaults = Self::default();
        let scheme = text_or(descriptor, "scheme", &defaults.scheme).to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ExtensionError::invalid_satellite(descriptor, format!("unsupported scheme {scheme}")));
        }
        if descriptor.host.trim().is_empty() {
            return Err(ExtensionError::invalid_satellite(descriptor, "http satellites need a host"));
        }
        if descriptor.port == 0 {
            return Err(ExtensionError::invalid_satellite(descriptor, "http satellites need a port"));
        }
        let config = Self {
            scheme,
            base_path: normalize_base_path(&text_or(descriptor, "base_path", "")),
            timeout_ms: parse_or(descriptor, "timeout_ms", defaults.timeout_ms)?,
            wait_timeout_ms: parse_or(descriptor, "wait_timeout_ms", defaults.wait_timeout_ms)?,
            max_response_bytes: parse_or(descriptor, "max_response_bytes", defaults.max_response_bytes)?,
        };
        if config.timeout_ms == 0 || config.wait_timeout_ms == 0 {
            return Err(ExtensionError::invalid_satellite(descriptor, "timeouts must be greater than zero"));
        }
        Ok(config)
    }
}

/// Trims slashes so that the prefix joins cleanly with `/{kind}`.
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() { String::new() } else { format!("/{trimmed}") }
}

// ============================================================================
// SECTION: Channel
// ============================================================================

/// Failure of one HTTP call.
struct CallError {
    /// Failure details.
    message: String,
    /// True when the request hit its timeout.
    timed_out: bool,
}

impl CallError {
    /// Builds a non-timeout failure.
    const fn failed(message: String) -> Self {
        Self {
            message,
            timed_out: false,
        }
    }
}

/// Request plumbing shared by the three adapter kinds.
struct HttpChannel {
    /// Endpoint information.
    info: SatelliteInfo,
    /// Kind segment of the request path.
    kind: SatelliteKind,
    /// Connection settings.
    config: HttpSatelliteConfig,
    /// Client for ordinary requests.
    client: Client,
    /// Client for phase-wait requests.
    wait_client: Client,
}

impl HttpChannel {
    /// Builds the channel and its clients.
    fn new(descriptor: &SatelliteDescriptor) -> Result<Self, ExtensionError> {
        let config = HttpSatelliteConfig::from_descriptor(descriptor)?;
        let client = build_client(config.timeout_ms)
            .map_err(|err| ExtensionError::invalid_satellite(descriptor, err))?;
        let wait_client = build_client(config.wait_timeout_ms)
            .map_err(|err| ExtensionError::invalid_satellite(descriptor, err))?;
        Ok(Self {
            info: SatelliteInfo::from_descriptor(descriptor),
            kind: descriptor.kind,
            config,
            client,
            wait_client,
        })
    }

    /// Returns the URL of an operation.
    fn url(&self, operation: &str) -> String {
        format!(
            "{}://{}:{}{}/{}/{operation}",
            self.config.scheme,
            self.info.host(),
            self.info.port(),
            self.config.base_path,
            self.kind
        )
    }

    /// Posts a JSON body and returns the response body.
    fn post<B>(&self, operation: &str, body: &B, waiting: bool) -> Result<Vec<u8>, CallError>
    where
        B: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|err| CallError::failed(format!("{operation} request encoding failed: {err}")))?;
        let client = if waiting { &self.wait_client } else { &self.client };
        let url = self.url(operation);
        debug!(satellite = self.info.name(), url = %url, "satellite request");
        let mut response =
            client.post(url.as_str()).header(CONTENT_TYPE, "application/json").body(payload).send().map_err(|err| {
                CallError {
                    message: format!("{operation} request failed: {err}"),
                    timed_out: err.is_timeout(),
                }
            })?;
        let status = response.status();
        let body = read_response_limited(&mut response, self.config.max_response_bytes)
            .map_err(|message| CallError::failed(format!("{operation}: {message}")))?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(CallError::failed(format!("{operation} returned {}: {}", status.as_u16(), text.trim())));
        }
        Ok(body)
    }

    /// Posts an empty object and ignores the response body.
    fn command(&self, operation: &str) -> Result<(), CallError> {
        self.post(operation, &serde_json::Map::new(), false).map(|_| ())
    }

    /// Posts an empty object and decodes the JSON response.
    fn query<T>(&self, operation: &str) -> Result<T, CallError>
    where
        T: DeserializeOwned,
    {
        let body = self.post(operation, &serde_json::Map::new(), false)?;
        serde_json::from_slice(&body)
            .map_err(|err| CallError::failed(format!("{operation} returned an invalid payload: {err}")))
    }
}

/// Builds a client with the given request timeout.
fn build_client(timeout_ms: u64) -> Result<Client, String> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent("spotter/0.1")
        .redirect(Policy::none())
        .build()
        .map_err(|err| format!("http client build failed: {err}"))
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, String> {
    let max_bytes_u64 = u64::try_from(max_bytes).map_err(|_| "response size limit exceeds u64".to_string())?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err("response exceeds size limit".to_string());
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| format!("failed to read response: {err}"))?;
    if buf.len() > max_bytes {
        return Err("response exceeds size limit".to_string());
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Instrumentation
// ============================================================================

/// Instrumentation satellite reached over HTTP.
pub struct HttpInstrumentation {
    /// Request channel.
    channel: HttpChannel,
}

impl HttpInstrumentation {
    /// Builds the adapter from a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::InvalidSatellite`] when the descriptor is unusable.
    pub fn new(descriptor: &SatelliteDescriptor) -> Result<Self, ExtensionError> {
        Ok(Self {
            channel: HttpChannel::new(descriptor)?,
        })
    }

    /// Converts a call failure into an adapter error.
    fn error(&self, err: CallError) -> InstrumentationError {
        InstrumentationError::Satellite {
            satellite: self.channel.info.name().to_string(),
            message: err.message,
        }
    }
}

impl SatelliteAdapter for HttpInstrumentation {
    fn info(&self) -> &SatelliteInfo {
        &self.channel.info
    }

    fn info_mut(&mut self) -> &mut SatelliteInfo {
        &mut self.channel.info
    }
}

impl InstrumentationAdapter for HttpInstrumentation {
    fn initialize(&self) -> Result<(), InstrumentationError> {
        self.channel.command("initialize").map_err(|err| self.error(err))
    }

    fn instrument(&self, description: &InstrumentationDescription) -> Result<(), InstrumentationError> {
        self.channel.post("instrument", description, false).map(|_| ()).map_err(|err| self.error(err))
    }

    fn uninstrument(&self) -> Result<(), InstrumentationError> {
        self.channel.command("uninstrument").map_err(|err| self.error(err))
    }
}

// ============================================================================
// SECTION: Measurement
// ============================================================================

/// Clock payload returned by `current_time`.
#[derive(Debug, Deserialize)]
struct ClockResponse {
    /// Satellite clock in unix milliseconds.
    time_ms: u64,
}

/// Measurement satellite reached over HTTP.
pub struct HttpMeasurement {
    /// Request channel.
    channel: HttpChannel,
}

impl HttpMeasurement {
    /// Builds the adapter from a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::InvalidSatellite`] when the descriptor is unusable.
    pub fn new(descriptor: &SatelliteDescriptor) -> Result<Self, ExtensionError> {
        Ok(Self {
            channel: HttpChannel::new(descriptor)?,
        })
    }

    /// Converts a call failure into an adapter error.
    fn error(&self, err: CallError) -> MeasurementError {
        MeasurementError::Satellite {
            satellite: self.channel.info.name().to_string(),
            message: err.message,
        }
    }
}

impl SatelliteAdapter for HttpMeasurement {
    fn info(&self) -> &SatelliteInfo {
        &self.channel.info
    }

    fn info_mut(&mut self) -> &mut SatelliteInfo {
        &mut self.channel.info
    }
}

impl MeasurementAdapter for HttpMeasurement {
    fn initialize(&self) -> Result<(), MeasurementError> {
        self.channel.command("initialize").map_err(|err| self.error(err))
    }

    fn enable_monitoring(&self) -> Result<(), MeasurementError> {
        self.channel.command("enable_monitoring").map_err(|err| self.error(err))
    }

    fn disable_monitoring(&self) -> Result<(), MeasurementError> {
        self.channel.command("disable_monitoring").map_err(|err| self.error(err))
    }

    fn measurement_data(&self) -> Result<MeasurementData, MeasurementError> {
        let mut data: MeasurementData = self.channel.query("measurement_data").map_err(|err| self.error(err))?;
        for record in &mut data.records {
            if record.satellite.is_none() {
                record.satellite = Some(self.channel.info.name().to_string());
            }
        }
        Ok(data)
    }

    fn current_time(&self) -> Result<u64, MeasurementError> {
        let clock: ClockResponse = self.channel.query("current_time").map_err(|err| self.error(err))?;
        Ok(clock.time_ms)
    }
}

// ============================================================================
// SECTION: Workload
// ============================================================================

/// Workload satellite reached over HTTP.
pub struct HttpWorkload {
    /// Request channel.
    channel: HttpChannel,
}

impl HttpWorkload {
    /// Builds the adapter from a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::InvalidSatellite`] when the descriptor is unusable.
    pub fn new(descriptor: &SatelliteDescriptor) -> Result<Self, ExtensionError> {
        Ok(Self {
            channel: HttpChannel::new(descriptor)?,
        })
    }

    /// Posts a phase wait and maps timeouts to interruptions.
    fn wait(&self, operation: &str) -> Result<(), WorkloadError> {
        let satellite = self.channel.info.name().to_string();
        match self.channel.post(operation, &serde_json::Map::new(), true) {
            Ok(_) => Ok(()),
            Err(err) if err.timed_out => Err(WorkloadError::Interrupted {
                satellite,
                message: err.message,
            }),
            Err(err) => Err(WorkloadError::Satellite {
                satellite,
                message: err.message,
            }),
        }
    }
}

impl SatelliteAdapter for HttpWorkload {
    fn info(&self) -> &SatelliteInfo {
        &self.channel.info
    }

    fn info_mut(&mut self) -> &mut SatelliteInfo {
        &mut self.channel.info
    }
}

impl WorkloadAdapter for HttpWorkload {
    fn initialize(&self) -> Result<(), WorkloadError> {
        self.channel.command("initialize").map_err(|err| WorkloadError::Satellite {
            satellite: self.channel.info.name().to_string(),
            message: err.message,
        })
    }

    fn start_load(&self, load: &LoadConfig) -> Result<(), WorkloadError> {
        load.validate().map_err(|err| WorkloadError::InvalidLoad {
            satellite: self.channel.info.name().to_string(),
            message: err.to_string(),
        })?;
        self.channel.post("start_load", load, false).map(|_| ()).map_err(|err| WorkloadError::Satellite {
            satellite: self.channel.info.name().to_string(),
            message: err.message,
        })
    }

    fn wait_for_warmup_phase_termination(&self) -> Result<(), WorkloadError> {
        self.wait("wait_for_warmup_phase_termination")
    }

    fn wait_for_experiment_phase_termination(&self) -> Result<(), WorkloadError> {
        self.wait("wait_for_experiment_phase_termination")
    }

    fn wait_for_finished_load(&self) -> Result<(), WorkloadError> {
        self.wait("wait_for_finished_load")
    }
}
