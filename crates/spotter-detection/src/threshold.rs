// crates/spotter-detection/src/threshold.rs
// ============================================================================
// Module: Threshold Controller
// Description: Detection controller comparing a metric against a threshold.
// Purpose: Flag problems whose metric mean is too high under the highest load.
// Dependencies: spotter-core, tracing
// ============================================================================

//! ## Overview
//! The threshold controller runs the default experiment series (one step
//! unless `experiments` says otherwise) and hands the datasets to a
//! [`ThresholdAnalyzer`]. The `threshold` key is required. With `reuse_scope`
//! set, the controller offers its instrumentation to a series shared with
//! siblings of the same scope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use spotter_core::Analyzer;
use spotter_core::ControllerError;
use spotter_core::DetectionController;
use spotter_core::ExperimentContext;
use spotter_core::ExperimentReuser;
use spotter_core::ExperimentSeries;
use spotter_core::InstrumentationDescription;
use spotter_core::SpotterResult;
use spotter_core::run_default_series;
use tracing::debug;

use crate::analyzer::ThresholdAnalyzer;
use crate::settings::SeriesSettings;
use crate::settings::parse;

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Steps run when `experiments` is not configured.
const DEFAULT_EXPERIMENTS: u32 = 1;

/// Threshold detection controller.
#[derive(Debug, Clone)]
pub struct ThresholdController {
    /// Series parameters.
    settings: SeriesSettings,
    /// Verdict logic.
    analyzer: ThresholdAnalyzer,
}

impl Default for ThresholdController {
    fn default() -> Self {
        let settings = SeriesSettings::with_experiments(DEFAULT_EXPERIMENTS);
        let analyzer = ThresholdAnalyzer::new(settings.metric.clone(), 0.0);
        Self {
            settings,
            analyzer,
        }
    }
}

impl ThresholdController {
    /// Returns the parsed series settings.
    #[must_use]
    pub const fn settings(&self) -> &SeriesSettings {
        &self.settings
    }

    /// Returns the configured analyzer.
    #[must_use]
    pub const fn analyzer(&self) -> &ThresholdAnalyzer {
        &self.analyzer
    }
}

impl DetectionController for ThresholdController {
    fn load_properties(&mut self, config: &BTreeMap<String, String>) -> Result<(), ControllerError> {
        let settings = SeriesSettings::from_config(config, DEFAULT_EXPERIMENTS)?;
        let threshold: f64 =
            parse(config, "threshold")?.ok_or_else(|| ControllerError::invalid_config("threshold", "is required"))?;
        if !threshold.is_finite() {
            return Err(ControllerError::invalid_config("threshold", "must be finite"));
        }
        debug!(metric = settings.metric.as_str(), threshold, experiments = settings.experiments, "threshold controller configured");
        self.analyzer = ThresholdAnalyzer::new(settings.metric.clone(), threshold);
        self.settings = settings;
        Ok(())
    }

    fn num_of_experiments(&self) -> u32 {
        self.settings.experiments
    }

    fn execute_experiments(&self, ctx: &ExperimentContext<'_>) -> Result<ExperimentSeries, ControllerError> {
        run_default_series(ctx, &self.settings.description(), self.settings.experiments, self.settings.max_users)
    }

    fn analyze(&self, series: &ExperimentSeries) -> SpotterResult {
        self.analyzer.analyze(&series.datasets)
    }

    fn experiment_reuser(&self) -> Option<&dyn ExperimentReuser> {
        if self.settings.reuse_scope.is_some() { Some(self) } else { None }
    }
}

impl ExperimentReuser for ThresholdController {
    fn reuse_scope(&self) -> &str {
        self.settings.reuse_scope.as_deref().unwrap_or_default()
    }

    fn instrumentation_description(&self) -> InstrumentationDescription {
        self.settings.description()
    }

    fn max_users(&self) -> Option<u32> {
        self.settings.max_users
    }
}
