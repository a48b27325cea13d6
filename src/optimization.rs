//! Budget optimization using greedy marginal-ROI allocation.
//!
//! The budget is first spread over channel floors, then the remainder is
//! handed out in fixed increments, each going to the channel with the highest
//! marginal ROI that still has headroom. Marginal ROI comes from the
//! simplified curves in [`crate::saturation::marginal_roi`], so the result is
//! an approximation rather than a proven optimum.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::channel::{Channel, ChannelProfile, ChannelProfileTable};
use crate::config::{InfeasiblePolicy, OptimizerConfig};
use crate::error::{BudgetError, Result};
use crate::plan::{implementation_plan, ImplementationStep};
use crate::recommendations::recommendations_for;
use crate::saturation::{marginal_roi, roi_at_spend, saturation_ratio};

/// Per-channel overrides, keyed by channel name as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BudgetConstraints {
    pub min_budgets: BTreeMap<String, f64>,
    pub max_budgets: BTreeMap<String, f64>,
    /// Pins a channel to an exact spend; overrides min and max.
    pub fixed_budgets: BTreeMap<String, f64>,
    pub total_budget_limit: Option<f64>,
}

/// Current-state snapshot for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAllocation {
    pub channel: Channel,
    pub current_budget: f64,
    pub current_roi: f64,
}

impl CurrentAllocation {
    /// Snapshot whose ROI is read off the channel's response curve.
    pub fn from_spend(channel: Channel, profile: &ChannelProfile, spend: f64) -> Self {
        Self {
            channel,
            current_budget: spend,
            current_roi: roi_at_spend(profile, spend),
        }
    }

    /// Build snapshots for every listed channel present in `table`.
    pub fn snapshot(table: &ChannelProfileTable, budgets: &[(Channel, f64)]) -> Vec<Self> {
        budgets
            .iter()
            .filter_map(|&(channel, spend)| {
                table
                    .get(channel)
                    .map(|profile| Self::from_spend(channel, profile, spend))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAllocation {
    pub channel: Channel,
    pub current_budget: f64,
    pub optimized_budget: f64,
    pub current_roi: f64,
    pub projected_roi: f64,
    /// Optimized spend over saturation spend, capped at 1.
    pub saturation: f64,
    pub efficiency: f64,
    pub recommendations: Vec<String>,
}

impl BudgetAllocation {
    pub fn from_current(current: &CurrentAllocation) -> Self {
        Self {
            channel: current.channel,
            current_budget: current.current_budget,
            optimized_budget: 0.0,
            current_roi: current.current_roi,
            projected_roi: 0.0,
            saturation: 0.0,
            efficiency: 0.0,
            recommendations: Vec::new(),
        }
    }

    /// Fill in the derived fields once `optimized_budget` is settled.
    pub fn finalize(&mut self, profile: &ChannelProfile, config: &OptimizerConfig) {
        self.projected_roi = roi_at_spend(profile, self.optimized_budget);
        self.saturation = saturation_ratio(profile, self.optimized_budget);
        self.efficiency = self.projected_roi * (1.0 - self.saturation) * profile.quality_score;
        self.recommendations = recommendations_for(self, config);
    }

    pub fn budget_change(&self) -> f64 {
        self.optimized_budget - self.current_budget
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub current_allocations: Vec<CurrentAllocation>,
    pub optimized_allocations: Vec<BudgetAllocation>,
    pub total_current_budget: f64,
    pub total_optimized_budget: f64,
    pub current_blended_roi: f64,
    pub projected_blended_roi: f64,
    pub roi_improvement_pct: f64,
    pub implementation_plan: Vec<ImplementationStep>,
    pub warnings: Vec<BudgetError>,
}

impl OptimizationResult {
    pub fn allocation(&self, channel: Channel) -> Option<&BudgetAllocation> {
        self.optimized_allocations
            .iter()
            .find(|a| a.channel == channel)
    }

    /// Channel to optimized spend, in table order.
    pub fn optimized_budgets(&self) -> Vec<(Channel, f64)> {
        self.optimized_allocations
            .iter()
            .map(|a| (a.channel, a.optimized_budget))
            .collect()
    }

    pub fn projected_return(&self) -> f64 {
        self.optimized_allocations
            .iter()
            .map(|a| a.optimized_budget * a.projected_roi)
            .sum()
    }
}

/// One point of a budget sensitivity sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPoint {
    pub total_budget: f64,
    pub projected_blended_roi: f64,
    pub projected_return: f64,
    /// Extra return per extra dollar relative to the previous point.
    pub marginal_return: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: f64,
    max: f64,
}

/// Spend-weighted ROI over `(spend, roi)` pairs; 0 when nothing is spent.
pub fn blended_roi<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (spend, weighted) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(s, w), (spend, roi)| (s + spend, w + spend * roi));
    if spend > 0.0 {
        weighted / spend
    } else {
        0.0
    }
}

/// Stateless optimizer over a fixed channel table.
#[derive(Debug, Clone, Default)]
pub struct BudgetOptimizer {
    table: ChannelProfileTable,
    config: OptimizerConfig,
}

impl BudgetOptimizer {
    /// Fails with `BudgetError::Config` if `config` does not validate.
    pub fn new(table: ChannelProfileTable, config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { table, config })
    }

    pub fn table(&self) -> &ChannelProfileTable {
        &self.table
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Distribute `total_budget` across the table's channels.
    pub fn optimize(
        &self,
        total_budget: f64,
        current: &[CurrentAllocation],
        constraints: &BudgetConstraints,
    ) -> Result<OptimizationResult> {
        if !total_budget.is_finite() || total_budget <= 0.0 {
            return Err(BudgetError::InvalidBudget {
                value: total_budget,
            });
        }
        let mut warnings = Vec::new();

        let budget = self.effective_budget(total_budget, constraints, &mut warnings);
        let bounds = self.resolve_bounds(constraints, &mut warnings);
        let mut allocations = self.seed_allocations(current, &mut warnings);

        let floors = self.floor_pass(budget, &bounds, &mut warnings)?;
        let spends = self.greedy_pass(budget, floors, &bounds, &mut warnings);

        for ((allocation, spend), (_, profile)) in
            allocations.iter_mut().zip(spends).zip(self.table.iter())
        {
            allocation.optimized_budget = spend;
            allocation.finalize(profile, &self.config);
        }

        let current_allocations: Vec<CurrentAllocation> = allocations
            .iter()
            .map(|a| CurrentAllocation {
                channel: a.channel,
                current_budget: a.current_budget,
                current_roi: a.current_roi,
            })
            .collect();
        let total_current_budget = allocations.iter().map(|a| a.current_budget).sum();
        let total_optimized_budget = allocations.iter().map(|a| a.optimized_budget).sum();
        let current_blended_roi =
            blended_roi(allocations.iter().map(|a| (a.current_budget, a.current_roi)));
        let projected_blended_roi =
            blended_roi(allocations.iter().map(|a| (a.optimized_budget, a.projected_roi)));
        let roi_improvement_pct = if current_blended_roi > 0.0 {
            (projected_blended_roi - current_blended_roi) / current_blended_roi * 100.0
        } else {
            0.0
        };
        let plan = implementation_plan(&allocations, &self.config);

        for warning in &warnings {
            warn!(%warning, "budget optimization warning");
        }
        debug!(
            budget,
            channels = allocations.len(),
            current_blended_roi,
            projected_blended_roi,
            "budget optimization complete"
        );

        Ok(OptimizationResult {
            current_allocations,
            optimized_allocations: allocations,
            total_current_budget,
            total_optimized_budget,
            current_blended_roi,
            projected_blended_roi,
            roi_improvement_pct,
            implementation_plan: plan,
            warnings,
        })
    }

    /// Optimize once per budget level, to chart diminishing returns.
    ///
    /// Levels that fail validation are skipped.
    pub fn budget_sensitivity(
        &self,
        levels: &[f64],
        current: &[CurrentAllocation],
        constraints: &BudgetConstraints,
    ) -> Vec<BudgetPoint> {
        let mut points: Vec<BudgetPoint> = Vec::with_capacity(levels.len());
        for &level in levels {
            let result = match self.optimize(level, current, constraints) {
                Ok(result) => result,
                Err(e) => {
                    warn!(level, error = %e, "skipping budget level");
                    continue;
                }
            };
            let projected_return = result.projected_return();
            let marginal_return = points.last().and_then(|prev| {
                let spend_delta = result.total_optimized_budget - prev.total_budget;
                (spend_delta.abs() > f64::EPSILON)
                    .then(|| (projected_return - prev.projected_return) / spend_delta)
            });
            points.push(BudgetPoint {
                total_budget: result.total_optimized_budget,
                projected_blended_roi: result.projected_blended_roi,
                projected_return,
                marginal_return,
            });
        }
        points
    }

    fn effective_budget(
        &self,
        total_budget: f64,
        constraints: &BudgetConstraints,
        warnings: &mut Vec<BudgetError>,
    ) -> f64 {
        match constraints.total_budget_limit {
            Some(limit) if !limit.is_finite() || limit <= 0.0 => {
                warnings.push(BudgetError::InvalidConstraint {
                    channel: "total".to_string(),
                    detail: format!("budget limit {limit} ignored"),
                });
                total_budget
            }
            Some(limit) if limit < total_budget => {
                warnings.push(BudgetError::BudgetCapped {
                    requested: total_budget,
                    limit,
                });
                limit
            }
            _ => total_budget,
        }
    }

    /// Look up a constraint key, recording a warning if it names no channel
    /// in the table or carries an unusable value.
    fn constraint_target(
        &self,
        name: &str,
        value: f64,
        warnings: &mut Vec<BudgetError>,
    ) -> Option<usize> {
        let index = Channel::parse(name)
            .ok()
            .and_then(|channel| self.table.channels().position(|c| c == channel));
        let Some(index) = index else {
            warnings.push(BudgetError::UnknownChannel {
                name: name.to_string(),
            });
            return None;
        };
        if !value.is_finite() || value < 0.0 {
            warnings.push(BudgetError::InvalidConstraint {
                channel: name.to_string(),
                detail: format!("value {value} must be a non-negative number"),
            });
            return None;
        }
        Some(index)
    }

    fn resolve_bounds(
        &self,
        constraints: &BudgetConstraints,
        warnings: &mut Vec<BudgetError>,
    ) -> Vec<Bounds> {
        let mut bounds: Vec<Bounds> = self
            .table
            .iter()
            .map(|(_, p)| Bounds {
                min: p.min_spend,
                max: p.saturation_spend,
            })
            .collect();
        let mut explicit_min = vec![false; bounds.len()];
        let mut explicit_max = vec![false; bounds.len()];

        for (name, &value) in &constraints.min_budgets {
            if let Some(i) = self.constraint_target(name, value, warnings) {
                bounds[i].min = value;
                explicit_min[i] = true;
            }
        }
        for (name, &value) in &constraints.max_budgets {
            if let Some(i) = self.constraint_target(name, value, warnings) {
                bounds[i].max = value;
                explicit_max[i] = true;
            }
        }
        for (name, &value) in &constraints.fixed_budgets {
            if let Some(i) = self.constraint_target(name, value, warnings) {
                bounds[i] = Bounds {
                    min: value,
                    max: value,
                };
                explicit_min[i] = true;
                explicit_max[i] = true;
            }
        }

        for (i, channel) in self.table.channels().enumerate() {
            let bound = &mut bounds[i];
            if bound.min <= bound.max {
                continue;
            }
            match (explicit_min[i], explicit_max[i]) {
                (true, true) => {
                    warnings.push(BudgetError::ConflictingBounds {
                        channel: channel.to_string(),
                        min: bound.min,
                        max: bound.max,
                    });
                    bound.min = bound.max;
                }
                (false, true) => {
                    warnings.push(BudgetError::FloorLowered {
                        channel: channel.to_string(),
                        default_min: bound.min,
                        max: bound.max,
                    });
                    bound.min = bound.max;
                }
                // A raised floor lifts the default saturation cap with it
                _ => bound.max = bound.min,
            }
        }
        bounds
    }

    /// One allocation per table channel, in table order.
    fn seed_allocations(
        &self,
        current: &[CurrentAllocation],
        warnings: &mut Vec<BudgetError>,
    ) -> Vec<BudgetAllocation> {
        for entry in current {
            if !self.table.contains(entry.channel) {
                warnings.push(BudgetError::UnknownChannel {
                    name: entry.channel.to_string(),
                });
            }
        }

        self.table
            .channels()
            .map(|channel| {
                let mut snapshot = current
                    .iter()
                    .find(|c| c.channel == channel)
                    .copied()
                    .unwrap_or(CurrentAllocation {
                        channel,
                        current_budget: 0.0,
                        current_roi: 0.0,
                    });
                if !snapshot.current_budget.is_finite() || snapshot.current_budget < 0.0 {
                    warnings.push(BudgetError::InvalidConstraint {
                        channel: channel.to_string(),
                        detail: format!("current budget {} treated as 0", snapshot.current_budget),
                    });
                    snapshot.current_budget = 0.0;
                }
                if !snapshot.current_roi.is_finite() || snapshot.current_roi < 0.0 {
                    warnings.push(BudgetError::NumericDomain {
                        channel: channel.to_string(),
                        detail: format!("current ROI {} floored to 0", snapshot.current_roi),
                    });
                    snapshot.current_roi = 0.0;
                }
                BudgetAllocation::from_current(&snapshot)
            })
            .collect()
    }

    fn floor_pass(
        &self,
        budget: f64,
        bounds: &[Bounds],
        warnings: &mut Vec<BudgetError>,
    ) -> Result<Vec<f64>> {
        let floors: Vec<f64> = bounds.iter().map(|b| b.min).collect();
        let required: f64 = floors.iter().sum();
        if required <= budget {
            return Ok(floors);
        }

        let infeasible = BudgetError::InfeasibleBudget {
            total_budget: budget,
            required_minimum: required,
        };
        match self.config.infeasible_policy {
            InfeasiblePolicy::Reject => Err(infeasible),
            InfeasiblePolicy::ScaleMinimums => {
                warnings.push(infeasible);
                let scale = budget / required;
                Ok(floors.into_iter().map(|f| f * scale).collect())
            }
        }
    }

    fn greedy_pass(
        &self,
        budget: f64,
        mut spends: Vec<f64>,
        bounds: &[Bounds],
        warnings: &mut Vec<BudgetError>,
    ) -> Vec<f64> {
        let tolerance = budget * 1e-9;
        let mut remaining = budget - spends.iter().sum::<f64>();
        if remaining <= tolerance {
            return spends;
        }

        let profiles: Vec<&ChannelProfile> = self.table.iter().map(|(_, p)| p).collect();
        let increment = remaining / self.config.increments as f64;
        // Each round either grants a full increment or fills a channel to its cap
        let max_rounds = self.config.increments * profiles.len() + profiles.len();

        for _ in 0..max_rounds {
            if remaining <= tolerance {
                break;
            }

            // Strictly greater: the first channel in table order wins ties
            let mut best: Option<(usize, f64)> = None;
            for (i, profile) in profiles.iter().enumerate() {
                if spends[i] >= bounds[i].max - tolerance {
                    continue;
                }
                let marginal = marginal_roi(profile, spends[i]);
                if best.map_or(true, |(_, top)| marginal > top) {
                    best = Some((i, marginal));
                }
            }
            let Some((i, _)) = best else {
                break;
            };

            let grant = increment.min(remaining).min(bounds[i].max - spends[i]);
            spends[i] += grant;
            remaining -= grant;
        }

        if remaining > tolerance {
            warnings.push(BudgetError::UnallocatedBudget { amount: remaining });
        }
        spends
    }
}
