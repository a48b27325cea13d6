//! Advisory text for a finalized channel allocation.

use crate::config::OptimizerConfig;
use crate::optimization::BudgetAllocation;

/// Every matching rule contributes one line, in a fixed order: budget
/// change, saturation, efficiency, ROI gain.
pub fn recommendations_for(allocation: &BudgetAllocation, config: &OptimizerConfig) -> Vec<String> {
    let mut out = Vec::new();

    if allocation.current_budget > 0.0 {
        let change_pct = allocation.budget_change() / allocation.current_budget * 100.0;
        if change_pct > config.change_threshold_pct {
            out.push(format!(
                "Increase budget by {:.0}% to capture additional returns",
                change_pct
            ));
        } else if change_pct < -config.change_threshold_pct {
            out.push(format!(
                "Reduce budget by {:.0}% and reallocate to higher-ROI channels",
                change_pct.abs()
            ));
        }
    } else if allocation.optimized_budget > 0.0 {
        out.push(format!(
            "New investment of ${:.0} recommended",
            allocation.optimized_budget
        ));
    }

    if allocation.saturation > config.high_saturation {
        out.push("Approaching saturation: consider reallocating incremental spend".to_string());
    } else if allocation.saturation < config.low_saturation {
        out.push("Significant growth potential available".to_string());
    }

    if allocation.efficiency > config.high_efficiency {
        out.push("High efficiency: prioritize this channel".to_string());
    } else if allocation.efficiency < config.low_efficiency {
        out.push("Low efficiency: optimize execution or reduce spend".to_string());
    }

    if allocation.projected_roi > allocation.current_roi * config.roi_gain_ratio {
        let gain_pct = if allocation.current_roi > 0.0 {
            (allocation.projected_roi / allocation.current_roi - 1.0) * 100.0
        } else {
            100.0
        };
        out.push(format!(
            "Projected ROI improves from {:.2}x to {:.2}x (+{:.1}%)",
            allocation.current_roi, allocation.projected_roi, gain_pct
        ));
    }

    out
}
