// crates/spotter-detection/src/analyzer.rs
// ============================================================================
// Module: Built-in Analyzers
// Description: Threshold and growth-ratio verdicts over experiment datasets.
// Purpose: Turn measured metrics into detection results.
// Dependencies: spotter-core
// ============================================================================

//! ## Overview
//! Analyzers are pure: the same datasets always produce the same result.
//! Means are computed per location; samples without a location are grouped
//! under `*`. Missing data never produces a detection: an analyzer without
//! samples for its metric reports "not detected" and says why.

// ============================================================================
// SECTION: Imports
// ============================================================================

use spotter_core::Analyzer;
use spotter_core::Dataset;
use spotter_core::ProblemOccurrence;
use spotter_core::SpotterResult;

// ============================================================================
// SECTION: Dataset Selection
// ============================================================================

/// Returns the dataset with the most users, preferring later steps on ties.
fn highest_load(datasets: &[Dataset]) -> Option<&Dataset> {
    datasets.iter().max_by_key(|dataset| (dataset.load.num_users, dataset.step))
}

/// Returns the dataset with the fewest users, preferring earlier steps on ties.
fn lowest_load(datasets: &[Dataset]) -> Option<&Dataset> {
    datasets.iter().min_by_key(|dataset| (dataset.load.num_users, dataset.step))
}

/// Builds a not-detected result with a single explanatory line.
fn inconclusive(message: String) -> SpotterResult {
    let mut result = SpotterResult::new(false);
    result.append_message(message);
    result
}

// ============================================================================
// SECTION: Threshold
// ============================================================================

/// Detects when a metric's mean at the highest load exceeds a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdAnalyzer {
    /// Metric to compare.
    pub metric: String,
    /// Upper bound of an acceptable mean.
    pub threshold: f64,
}

impl ThresholdAnalyzer {
    /// Creates an analyzer.
    #[must_use]
    pub fn new(metric: impl Into<String>, threshold: f64) -> Self {
        Self {
            metric: metric.into(),
            threshold,
        }
    }
}

impl Analyzer for ThresholdAnalyzer {
    fn analyze(&self, datasets: &[Dataset]) -> SpotterResult {
        let Some(highest) = highest_load(datasets) else {
            return inconclusive("no datasets to analyse".to_string());
        };
        let users = highest.load.num_users;
        let means = highest.data.mean_by_location(&self.metric);
        if means.is_empty() {
            return inconclusive(format!("no samples of {} at {users} users", self.metric));
        }

        let occurrences: Vec<ProblemOccurrence> = means
            .into_iter()
            .filter(|(_, mean)| *mean > self.threshold)
            .map(|(location, mean)| {
                ProblemOccurrence::new(
                    location,
                    format!("mean {} {mean:.2} exceeds {} at {users} users", self.metric, self.threshold),
                )
            })
            .collect();

        let mut result = SpotterResult::new(!occurrences.is_empty());
        result.append_message(format!(
            "analysed {} dataset(s); highest load {users} users; threshold {} for {}",
            datasets.len(),
            self.threshold,
            self.metric
        ));
        if !occurrences.is_empty() {
            result.append_message(format!("{} location(s) above threshold", occurrences.len()));
        }
        for occurrence in occurrences {
            result.add_occurrence(occurrence);
        }
        result
    }
}

// ============================================================================
// SECTION: Scalability
// ============================================================================

/// Detects when a metric grows faster than allowed between the lowest and
/// highest load.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalabilityAnalyzer {
    /// Metric to compare.
    pub metric: String,
    /// Largest acceptable `high / low` ratio.
    pub max_growth_ratio: f64,
}

impl ScalabilityAnalyzer {
    /// Creates an analyzer.
    #[must_use]
    pub fn new(metric: impl Into<String>, max_growth_ratio: f64) -> Self {
        Self {
            metric: metric.into(),
            max_growth_ratio,
        }
    }
}

impl Analyzer for ScalabilityAnalyzer {
    fn analyze(&self, datasets: &[Dataset]) -> SpotterResult {
        let (Some(lowest), Some(highest)) = (lowest_load(datasets), highest_load(datasets)) else {
            return inconclusive("no datasets to analyse".to_string());
        };
        let (low_users, high_users) = (lowest.load.num_users, highest.load.num_users);
        if low_users == high_users {
            return inconclusive(format!("scalability analysis needs two load levels, got only {low_users} users"));
        }
        let low_means = lowest.data.mean_by_location(&self.metric);
        let high_means = highest.data.mean_by_location(&self.metric);

        let mut compared = 0_usize;
        let mut occurrences = Vec::new();
        for (location, high) in high_means {
            let Some(low) = low_means.get(&location).copied().filter(|low| *low > 0.0) else {
                continue;
            };
            compared += 1;
            let ratio = high / low;
            if ratio > self.max_growth_ratio {
                occurrences.push(ProblemOccurrence::new(
                    location,
                    format!(
                        "{} grew {ratio:.2}x from {low_users} to {high_users} users (limit {}x)",
                        self.metric, self.max_growth_ratio
                    ),
                ));
            }
        }
        if compared == 0 {
            return inconclusive(format!("no comparable samples of {} across load levels", self.metric));
        }

        let mut result = SpotterResult::new(!occurrences.is_empty());
        result.append_message(format!(
            "analysed {} dataset(s); {} from {low_users} to {high_users} users; limit {}x",
            datasets.len(),
            self.metric,
            self.max_growth_ratio
        ));
        for occurrence in occurrences {
            result.add_occurrence(occurrence);
        }
        result
    }
}
