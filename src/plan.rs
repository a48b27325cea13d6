//! Phased rollout plan derived from the before/after allocation delta.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::config::OptimizerConfig;
use crate::optimization::BudgetAllocation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationStep {
    pub phase: u32,
    pub title: String,
    pub description: String,
    pub timeline: String,
    /// Signed budget delta per channel.
    pub budget_changes: BTreeMap<Channel, f64>,
    pub expected_impact: f64,
    /// Phases that must complete before this one starts.
    pub dependencies: Vec<u32>,
}

/// Impact-weighted ROI gain: Σ|Δ|·(projected − current) / Σ|Δ|.
fn weighted_impact(allocations: &[&BudgetAllocation]) -> f64 {
    let weight: f64 = allocations.iter().map(|a| a.budget_change().abs()).sum();
    if weight <= 0.0 {
        return 0.0;
    }
    allocations
        .iter()
        .map(|a| a.budget_change().abs() * (a.projected_roi - a.current_roi))
        .sum::<f64>()
        / weight
}

fn phase_step(
    phase: u32,
    title: &str,
    description: String,
    timeline: &str,
    channels: &[&BudgetAllocation],
    dependencies: Vec<u32>,
) -> ImplementationStep {
    ImplementationStep {
        phase,
        title: title.to_string(),
        description,
        timeline: timeline.to_string(),
        budget_changes: channels
            .iter()
            .map(|a| (a.channel, a.budget_change()))
            .collect(),
        expected_impact: weighted_impact(channels),
        dependencies,
    }
}

fn channel_list(channels: &[&BudgetAllocation]) -> String {
    channels
        .iter()
        .map(|a| a.channel.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split the allocation changes into quick wins, strategic reallocation and
/// an always-present continuous optimization phase.
///
/// Phases 1 and 2 are only emitted when they carry at least one channel.
pub fn implementation_plan(
    allocations: &[BudgetAllocation],
    config: &OptimizerConfig,
) -> Vec<ImplementationStep> {
    let mut quick_wins = Vec::new();
    let mut strategic = Vec::new();

    for allocation in allocations {
        let delta = allocation.budget_change();
        let tolerance = allocation.current_budget.abs().max(1.0) * 1e-9;
        if delta.abs() <= tolerance {
            continue;
        }
        let major = allocation.current_budget <= 0.0
            || delta.abs() / allocation.current_budget * 100.0 >= config.change_threshold_pct;
        if major {
            strategic.push(allocation);
        } else if allocation.projected_roi > allocation.current_roi {
            quick_wins.push(allocation);
        }
    }

    let mut steps = Vec::new();
    if !quick_wins.is_empty() {
        steps.push(phase_step(
            1,
            "Quick wins",
            format!(
                "Apply small budget adjustments with immediate ROI gains: {}",
                channel_list(&quick_wins)
            ),
            "0-30 days",
            &quick_wins,
            Vec::new(),
        ));
    }
    if !strategic.is_empty() {
        let dependencies = steps.iter().map(|s| s.phase).collect();
        steps.push(phase_step(
            2,
            "Strategic reallocation",
            format!("Shift budget between channels: {}", channel_list(&strategic)),
            "30-60 days",
            &strategic,
            dependencies,
        ));
    }

    let dependencies = steps.iter().map(|s| s.phase).collect();
    steps.push(ImplementationStep {
        phase: 3,
        title: "Continuous optimization".to_string(),
        description: "Monitor channel response and rebalance as performance data arrives"
            .to_string(),
        timeline: "60-90 days".to_string(),
        budget_changes: BTreeMap::new(),
        expected_impact: config.continuous_optimization_impact,
        dependencies,
    });
    steps
}
