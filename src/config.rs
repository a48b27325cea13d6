//! Optimizer configuration: allocation granularity, advisory thresholds and
//! scenario constants.
//!
//! Every field has a default, so a JSON document only needs to name the
//! values it overrides.

use serde::{Deserialize, Serialize};

use crate::error::{BudgetError, Result};

/// What to do when the summed minimum spends exceed the total budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfeasiblePolicy {
    /// Scale every channel floor down proportionally and record a warning.
    #[default]
    ScaleMinimums,
    /// Fail the call with `BudgetError::InfeasibleBudget`.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Number of increments the post-floor budget is split into.
    pub increments: usize,
    pub infeasible_policy: InfeasiblePolicy,

    /// Budget change (percent of current) that counts as a major shift.
    pub change_threshold_pct: f64,
    pub high_saturation: f64,
    pub low_saturation: f64,
    pub high_efficiency: f64,
    pub low_efficiency: f64,
    /// Projected/current ROI ratio above which the gain is reported.
    pub roi_gain_ratio: f64,
    /// Placeholder impact (percent) of the continuous optimization phase.
    pub continuous_optimization_impact: f64,

    /// Size of the addressable HCP universe used to normalise reach.
    pub hcp_universe: f64,
    /// Rx lift per point of ROI change.
    pub rx_lift_factor: f64,
    pub scenario_saturation_risk: f64,
    pub scenario_change_risk_pct: f64,
    pub scenario_roi_opportunity_pct: f64,
    pub reach_opportunity_pct: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            increments: 100,
            infeasible_policy: InfeasiblePolicy::ScaleMinimums,
            change_threshold_pct: 20.0,
            high_saturation: 0.8,
            low_saturation: 0.3,
            high_efficiency: 2.5,
            low_efficiency: 1.0,
            roi_gain_ratio: 1.1,
            continuous_optimization_impact: 5.0,
            hcp_universe: 85_000.0,
            rx_lift_factor: 0.5,
            scenario_saturation_risk: 0.85,
            scenario_change_risk_pct: 50.0,
            scenario_roi_opportunity_pct: 10.0,
            reach_opportunity_pct: 5.0,
        }
    }
}

impl OptimizerConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: OptimizerConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.increments == 0 {
            return Err(BudgetError::Config {
                message: "increments must be at least 1".to_string(),
            });
        }
        let values = [
            ("change_threshold_pct", self.change_threshold_pct),
            ("high_saturation", self.high_saturation),
            ("low_saturation", self.low_saturation),
            ("high_efficiency", self.high_efficiency),
            ("low_efficiency", self.low_efficiency),
            ("roi_gain_ratio", self.roi_gain_ratio),
            ("continuous_optimization_impact", self.continuous_optimization_impact),
            ("hcp_universe", self.hcp_universe),
            ("rx_lift_factor", self.rx_lift_factor),
            ("scenario_saturation_risk", self.scenario_saturation_risk),
            ("scenario_change_risk_pct", self.scenario_change_risk_pct),
            ("scenario_roi_opportunity_pct", self.scenario_roi_opportunity_pct),
            ("reach_opportunity_pct", self.reach_opportunity_pct),
        ];
        if let Some((name, _)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(BudgetError::Config {
                message: format!("{name} must be finite"),
            });
        }
        if self.hcp_universe <= 0.0 {
            return Err(BudgetError::Config {
                message: "hcp_universe must be positive".to_string(),
            });
        }
        if self.low_saturation > self.high_saturation {
            return Err(BudgetError::Config {
                message: "low_saturation exceeds high_saturation".to_string(),
            });
        }
        Ok(())
    }
}
