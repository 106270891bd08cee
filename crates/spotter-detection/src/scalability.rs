// crates/spotter-detection/src/scalability.rs
// ============================================================================
// Module: Scalability Controller
// Description: Detection controller comparing a metric across load levels.
// Purpose: Flag problems whose metric grows too fast as users increase.
// Dependencies: spotter-core, tracing
// ============================================================================

//! ## Overview
//! The scalability controller runs the default experiment series over several
//! loads (three steps unless `experiments` says otherwise) and hands the
//! datasets to a [`ScalabilityAnalyzer`]. `max_growth_ratio` defaults to 2.

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

use crate::analyzer::ScalabilityAnalyzer;
use crate::settings::SeriesSettings;
use crate::settings::parse;

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Steps run when `experiments` is not configured.
const DEFAULT_EXPERIMENTS: u32 = 3;
/// Growth ratio used when `max_growth_ratio` is not configured.
const DEFAULT_MAX_GROWTH_RATIO: f64 = 2.0;

/// Scalability detection controller.
#[derive(Debug, Clone)]
pub struct ScalabilityController {
    /// Series parameters.
    settings: SeriesSettings,
    /// Verdict logic.
    analyzer: ScalabilityAnalyzer,
}

impl Default for ScalabilityController {
    fn default() -> Self {
        let settings = SeriesSettings::with_experiments(DEFAULT_EXPERIMENTS);
        let analyzer = ScalabilityAnalyzer::new(settings.metric.clone(), DEFAULT_MAX_GROWTH_RATIO);
        Self {
            settings,
            analyzer,
        }
    }
}

impl ScalabilityController {
    /// Returns the parsed series settings.
    #[must_use]
    pub const fn settings(&self) -> &SeriesSettings {
        &self.settings
    }

    /// Returns the configured analyzer.
    #[must_use]
    pub const fn analyzer(&self) -> &ScalabilityAnalyzer {
        &self.analyzer
    }
}

impl DetectionController for ScalabilityController {
    fn load_properties(&mut self, config: &BTreeMap<String, String>) -> Result<(), ControllerError> {
        let settings = SeriesSettings::from_config(config, DEFAULT_EXPERIMENTS)?;
        let ratio: f64 = parse(config, "max_growth_ratio")?.unwrap_or(DEFAULT_MAX_GROWTH_RATIO);
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ControllerError::invalid_config("max_growth_ratio", "must be a positive number"));
        }
        debug!(metric = settings.metric.as_str(), ratio, experiments = settings.experiments, "scalability controller configured");
        self.analyzer = ScalabilityAnalyzer::new(settings.metric.clone(), ratio);
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

impl ExperimentReuser for ScalabilityController {
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
