// crates/spotter-satellites/src/properties.rs
// ============================================================================
// Module: Satellite Property Parsing
// Description: Typed access to free-form satellite descriptor properties.
// Purpose: Reject malformed adapter settings when brokers are built.
// Dependencies: spotter-core
// ============================================================================

//! ## Overview
//! Descriptor properties are strings. Adapters read the ones they understand
//! through these helpers so that a malformed value fails at broker build time
//! with [`ExtensionError::InvalidSatellite`] instead of mid-experiment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::str::FromStr;

use spotter_core::ExtensionError;
use spotter_core::SatelliteDescriptor;

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a property, using `default` when it is absent or blank.
pub(crate) fn parse_or<T>(descriptor: &SatelliteDescriptor, key: &str, default: T) -> Result<T, ExtensionError>
where
    T: FromStr,
{
    match descriptor.properties.get(key).map(|raw| raw.trim()) {
        None | Some("") => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ExtensionError::invalid_satellite(descriptor, format!("property {key} is malformed: {raw}"))),
    }
}

/// Parses a non-negative finite float property.
pub(crate) fn parse_non_negative(
    descriptor: &SatelliteDescriptor,
    key: &str,
    default: f64,
) -> Result<f64, ExtensionError> {
    let value: f64 = parse_or(descriptor, key, default)?;
    if !value.is_finite() || value < 0.0 {
        return Err(ExtensionError::invalid_satellite(
            descriptor,
            format!("property {key} must be a non-negative number"),
        ));
    }
    Ok(value)
}

/// Returns a string property, using `default` when it is absent or blank.
pub(crate) fn text_or(descriptor: &SatelliteDescriptor, key: &str, default: &str) -> String {
    descriptor
        .properties
        .get(key)
        .map(|raw| raw.trim())
        .filter(|raw| !raw.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Splits a comma separated property into a set, dropping blanks.
pub(crate) fn name_set(descriptor: &SatelliteDescriptor, key: &str) -> BTreeSet<String> {
    descriptor
        .properties
        .get(key)
        .map(|raw| {
            raw.split(',').map(str::trim).filter(|name| !name.is_empty()).map(ToString::to_string).collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use std::collections::BTreeMap;

    use spotter_core::ExtensionError;
    use spotter_core::SatelliteDescriptor;
    use spotter_core::SatelliteKind;

    use super::name_set;
    use super::parse_non_negative;
    use super::parse_or;

    fn descriptor(pairs: &[(&str, &str)]) -> SatelliteDescriptor {
        SatelliteDescriptor {
            kind: SatelliteKind::Workload,
            extension_name: "simulated".to_string(),
            name: "load".to_string(),
            host: "localhost".to_string(),
            port: 0,
            properties: pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn blank_values_use_the_default() {
        let desc = descriptor(&[("timeout_ms", "  ")]);
        assert_eq!(parse_or(&desc, "timeout_ms", 7_u64).unwrap(), 7);
        assert_eq!(parse_or(&desc, "missing", 3_u64).unwrap(), 3);
    }

    #[test]
    fn malformed_values_name_the_key() {
        let desc = descriptor(&[("time_scale", "fast")]);
        let err = parse_non_negative(&desc, "time_scale", 1.0).unwrap_err();
        assert!(matches!(err, ExtensionError::InvalidSatellite { ref name, ref message }
            if name == "load" && message.contains("time_scale")));
        let negative = descriptor(&[("time_scale", "-1")]);
        assert!(parse_non_negative(&negative, "time_scale", 1.0).is_err());
    }

    #[test]
    fn name_sets_split_on_commas() {
        let desc = descriptor(&[("fail_on", " start_load, ,initialize ")]);
        let names: Vec<String> = name_set(&desc, "fail_on").into_iter().collect();
        assert_eq!(names, vec!["initialize", "start_load"]);
    }
}
