//! What-if scenario simulation over a proposed channel budget map.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::channel::{Channel, ChannelProfileTable};
use crate::config::OptimizerConfig;
use crate::error::{BudgetError, Result};
use crate::optimization::{blended_roi, CurrentAllocation};
use crate::saturation::{roi_at_spend, saturation_ratio};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProjection {
    pub channel: Channel,
    pub current_budget: f64,
    pub proposed_budget: f64,
    pub projected_roi: f64,
    pub saturation: f64,
    /// HCPs reached at the proposed spend.
    pub reach: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub current_blended_roi: f64,
    pub projected_blended_roi: f64,
    pub roi_change_pct: f64,
    /// Reach delta as a percentage of the HCP universe.
    pub reach_change_pct: f64,
    pub estimated_rx_lift_pct: f64,
    pub channels: Vec<ChannelProjection>,
    pub risks: Vec<String>,
    pub opportunities: Vec<String>,
    pub warnings: Vec<BudgetError>,
}

pub struct ScenarioSimulator<'a> {
    table: &'a ChannelProfileTable,
    config: &'a OptimizerConfig,
}

impl<'a> ScenarioSimulator<'a> {
    /// Fails with `BudgetError::Config` if `config` does not validate.
    pub fn new(table: &'a ChannelProfileTable, config: &'a OptimizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { table, config })
    }

    /// Simulate a proposal keyed by channel name. Unknown names and unusable
    /// amounts are reported as warnings and left out of the proposal.
    pub fn simulate(
        &self,
        current: &[CurrentAllocation],
        proposed: &[(String, f64)],
    ) -> ScenarioResult {
        let mut warnings = Vec::new();
        let mut typed = Vec::with_capacity(proposed.len());
        for (name, budget) in proposed {
            match Channel::parse(name) {
                Ok(channel) if self.table.contains(channel) => {
                    if budget.is_finite() && *budget >= 0.0 {
                        typed.push((channel, *budget));
                    } else {
                        warnings.push(BudgetError::InvalidConstraint {
                            channel: name.clone(),
                            detail: format!("proposed budget {budget} ignored"),
                        });
                    }
                }
                _ => warnings.push(BudgetError::UnknownChannel { name: name.clone() }),
            }
        }
        let mut result = self.simulate_channels(current, &typed);
        warnings.append(&mut result.warnings);
        result.warnings = warnings;
        result
    }

    /// Simulate a proposal keyed by channel. Channels not in `proposed`
    /// keep their current budget.
    pub fn simulate_channels(
        &self,
        current: &[CurrentAllocation],
        proposed: &[(Channel, f64)],
    ) -> ScenarioResult {
        let config = self.config;
        let mut risks = Vec::new();
        let mut channels = Vec::with_capacity(self.table.len());
        let mut current_pairs = Vec::with_capacity(self.table.len());
        let mut current_reach = 0.0;
        let mut proposed_reach = 0.0;

        for (channel, profile) in self.table.iter() {
            let snapshot = current.iter().find(|c| c.channel == channel);
            let current_budget = snapshot.map_or(0.0, |c| c.current_budget.max(0.0));
            let current_roi = snapshot.map_or(0.0, |c| c.current_roi.max(0.0));
            let proposed_budget = proposed
                .iter()
                .rev()
                .find(|(c, _)| *c == channel)
                .map_or(current_budget, |(_, b)| *b);

            let projected_roi = roi_at_spend(profile, proposed_budget);
            let saturation = saturation_ratio(profile, proposed_budget);
            let reach = proposed_budget * profile.reach_per_dollar;
            current_reach += current_budget * profile.reach_per_dollar;
            proposed_reach += reach;

            if saturation > config.scenario_saturation_risk {
                risks.push(format!(
                    "{channel} would run at {:.0}% of saturation",
                    saturation * 100.0
                ));
            }
            if proposed_budget < profile.min_spend {
                risks.push(format!(
                    "{channel} budget ${proposed_budget:.0} is below the ${:.0} minimum",
                    profile.min_spend
                ));
            }
            if current_budget > 0.0 {
                let change_pct = (proposed_budget - current_budget) / current_budget * 100.0;
                if change_pct.abs() > config.scenario_change_risk_pct {
                    risks.push(format!(
                        "{channel} budget changes by {change_pct:+.0}%, execution risk is high"
                    ));
                }
            }

            current_pairs.push((current_budget, current_roi));
            channels.push(ChannelProjection {
                channel,
                current_budget,
                proposed_budget,
                projected_roi,
                saturation,
                reach,
            });
        }

        let current_blended_roi = blended_roi(current_pairs);
        let projected_blended_roi =
            blended_roi(channels.iter().map(|c| (c.proposed_budget, c.projected_roi)));
        let roi_change_pct = if current_blended_roi > 0.0 {
            (projected_blended_roi - current_blended_roi) / current_blended_roi * 100.0
        } else {
            0.0
        };

        let universe = config.hcp_universe;
        let reach_change_pct = if universe > 0.0 {
            (proposed_reach.min(universe) - current_reach.min(universe)) / universe * 100.0
        } else {
            0.0
        };
        let estimated_rx_lift_pct = roi_change_pct * config.rx_lift_factor;

        let mut opportunities = Vec::new();
        if roi_change_pct > config.scenario_roi_opportunity_pct {
            opportunities.push(format!(
                "Blended ROI improves by {roi_change_pct:.1}%, \
                 an estimated {estimated_rx_lift_pct:.1}% Rx lift"
            ));
        }
        if reach_change_pct > config.reach_opportunity_pct {
            opportunities.push(format!(
                "HCP reach expands by {reach_change_pct:.1}% of the target universe"
            ));
        }

        debug!(
            current_blended_roi,
            projected_blended_roi,
            risks = risks.len(),
            "scenario simulated"
        );

        ScenarioResult {
            current_blended_roi,
            projected_blended_roi,
            roi_change_pct,
            reach_change_pct,
            estimated_rx_lift_pct,
            channels,
            risks,
            opportunities,
            warnings: Vec::new(),
        }
    }
}
