// crates/spotter-core/src/core/measurement.rs
// ============================================================================
// Module: Spotter Measurement Data
// Description: Records collected by measurement satellites.
// Purpose: Provide a mergeable collection of timestamped metric samples.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Measurement satellites report flat [`MeasurementRecord`] lists. The broker
//! concatenates the lists of every satellite into one [`MeasurementData`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Single metric sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Sample time in unix milliseconds (satellite clock).
    pub timestamp_ms: u64,
    /// Metric name.
    pub metric: String,
    /// Sample value.
    pub value: f64,
    /// Code location the sample belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Satellite that produced the sample.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellite: Option<String>,
}

impl MeasurementRecord {
    /// Creates a record without location or satellite tags.
    #[must_use]
    pub fn new(timestamp_ms: u64, metric: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp_ms,
            metric: metric.into(),
            value,
            location: None,
            satellite: None,
        }
    }

    /// Sets the code location.
    #[must_use]
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Collection of measurement records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementData {
    /// Records in arrival order.
    pub records: Vec<MeasurementRecord>,
}

impl MeasurementData {
    /// Wraps a record list.
    #[must_use]
    pub const fn new(records: Vec<MeasurementRecord>) -> Self {
        Self {
            records,
        }
    }

    /// Appends every record of `other`.
    pub fn extend(&mut self, other: Self) {
        self.records.extend(other.records);
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the mean value of a metric, if any sample exists.
    #[must_use]
    pub fn mean(&self, metric: &str) -> Option<f64> {
        mean_of(self.records.iter().filter(|r| r.metric == metric).map(|r| r.value))
    }

    /// Returns the mean value of a metric per location (unlocated samples use `"*"`).
    #[must_use]
    pub fn mean_by_location(&self, metric: &str) -> BTreeMap<String, f64> {
        let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for record in self.records.iter().filter(|r| r.metric == metric) {
            let key = record.location.clone().unwrap_or_else(|| "*".to_string());
            grouped.entry(key).or_default().push(record.value);
        }
        grouped
            .into_iter()
            .filter_map(|(location, values)| mean_of(values.into_iter()).map(|m| (location, m)))
            .collect()
    }
}

/// Computes an arithmetic mean.
fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0_f64, 0_u32), |(sum, count), v| (sum + v, count.saturating_add(1)));
    if count == 0 { None } else { Some(sum / f64::from(count)) }
}
