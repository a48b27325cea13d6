//! End-to-end behaviour of the optimizer over the default channel table.

use dce_budget_core::{
    roi_at_spend, BudgetConstraints, BudgetError, BudgetOptimizer, Channel, ChannelProfile,
    ChannelProfileTable, CurrentAllocation, InfeasiblePolicy, OptimizerConfig, ResponseType,
    ScenarioSimulator,
};

const TOTAL: f64 = 47_000_000.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn default_current(table: &ChannelProfileTable) -> Vec<CurrentAllocation> {
    CurrentAllocation::snapshot(table, &ChannelProfileTable::default_current_budgets())
}

fn table_with_field_force(edit: impl Fn(&mut ChannelProfile)) -> ChannelProfileTable {
    let entries = ChannelProfileTable::default()
        .iter()
        .map(|(channel, profile)| {
            let mut profile = *profile;
            if channel == Channel::FieldForce {
                edit(&mut profile);
            }
            (channel, profile)
        })
        .collect();
    ChannelProfileTable::new(entries).unwrap()
}

#[test]
fn budget_is_conserved_across_levels() {
    init_tracing();
    let optimizer = BudgetOptimizer::default();
    let current = default_current(optimizer.table());
    for total in [14_000_000.0, 25_000_000.0, TOTAL, 60_000_000.0] {
        let result = optimizer
            .optimize(total, &current, &BudgetConstraints::default())
            .unwrap();
        let allocated: f64 = result
            .optimized_allocations
            .iter()
            .map(|a| a.optimized_budget)
            .sum();
        assert!((allocated - total).abs() < total * 1e-9, "{total}: {allocated}");
        assert!(result.warnings.is_empty(), "{total}: {:?}", result.warnings);
    }
}

#[test]
fn bounds_are_respected() {
    init_tracing();
    let optimizer = BudgetOptimizer::default();
    let current = default_current(optimizer.table());
    let mut constraints = BudgetConstraints::default();
    constraints
        .min_budgets
        .insert("Conferences".to_string(), 3_000_000.0);
    constraints
        .max_budgets
        .insert("Medical Education".to_string(), 2_500_000.0);

    let result = optimizer.optimize(TOTAL, &current, &constraints).unwrap();
    for allocation in &result.optimized_allocations {
        let profile = optimizer.table().get(allocation.channel).unwrap();
        let (min, max) = match allocation.channel {
            Channel::Conferences => (3_000_000.0, profile.saturation_spend),
            Channel::MedicalEducation => (profile.min_spend, 2_500_000.0),
            _ => (profile.min_spend, profile.saturation_spend),
        };
        assert!(allocation.optimized_budget >= min - 1e-6, "{:?}", allocation.channel);
        assert!(allocation.optimized_budget <= max + 1e-6, "{:?}", allocation.channel);
        assert!(allocation.saturation <= 1.0);
    }
}

#[test]
fn roi_curves_flatten_or_decline_towards_saturation() {
    let base = *ChannelProfileTable::default()
        .get(Channel::FieldForce)
        .unwrap();
    let spot = |response_type| {
        let profile = ChannelProfile {
            response_type,
            ..base
        };
        [0.0, 0.5, 1.0, 2.0].map(|k| roi_at_spend(&profile, k * profile.saturation_spend))
    };

    let linear = spot(ResponseType::Linear);
    assert!(linear.windows(2).all(|w| w[1] <= w[0]), "{linear:?}");

    // Step function peaks in the middle band, then only falls
    let step = spot(ResponseType::StepFunction);
    assert!(step[1..].windows(2).all(|w| w[1] <= w[0]), "{step:?}");

    // Exponential decay saturates: flat from the saturation point on
    let exp = spot(ResponseType::ExponentialDecay);
    assert!(exp[3] <= exp[2], "{exp:?}");
    assert!(exp.iter().all(|&v| v <= base.base_roi * base.quality_score + 1e-12));
}

#[test]
fn optimize_is_idempotent() {
    let optimizer = BudgetOptimizer::default();
    let current = default_current(optimizer.table());
    let mut constraints = BudgetConstraints::default();
    constraints.min_budgets.insert("Radio".to_string(), 1.0);
    let first = optimizer.optimize(TOTAL, &current, &constraints).unwrap();
    let second = optimizer.optimize(TOTAL, &current, &constraints).unwrap();
    assert_eq!(first, second);
}

#[test]
fn optimization_never_regresses_blended_roi() {
    init_tracing();
    let optimizer = BudgetOptimizer::default();
    let current = default_current(optimizer.table());
    let result = optimizer
        .optimize(TOTAL, &current, &BudgetConstraints::default())
        .unwrap();
    assert!(result.projected_blended_roi >= result.current_blended_roi);
    assert!(result.roi_improvement_pct >= 0.0);
    assert!((result.total_current_budget - TOTAL).abs() < 1e-6);
    assert!(result
        .optimized_allocations
        .iter()
        .all(|a| !a.recommendations.is_empty()));
}

#[test]
fn infeasible_budget_scales_minimums() {
    init_tracing();
    let table = table_with_field_force(|p| p.min_spend = 10_000_000.0);
    let required = table.total_min_spend();
    let optimizer = BudgetOptimizer::new(table, OptimizerConfig::default()).unwrap();
    let current = default_current(optimizer.table());

    let result = optimizer
        .optimize(5_000_000.0, &current, &BudgetConstraints::default())
        .unwrap();
    assert!((result.total_optimized_budget - 5_000_000.0).abs() < 1e-6);
    assert!(result
        .optimized_allocations
        .iter()
        .all(|a| a.optimized_budget >= 0.0));
    let field = result.allocation(Channel::FieldForce).unwrap();
    assert!((field.optimized_budget - 5_000_000.0 * 10_000_000.0 / required).abs() < 1e-3);
    assert_eq!(
        result.warnings,
        vec![BudgetError::InfeasibleBudget {
            total_budget: 5_000_000.0,
            required_minimum: required,
        }]
    );
}

#[test]
fn infeasible_budget_rejected_when_configured() {
    let table = table_with_field_force(|p| p.min_spend = 10_000_000.0);
    let config = OptimizerConfig {
        infeasible_policy: InfeasiblePolicy::Reject,
        ..Default::default()
    };
    let optimizer = BudgetOptimizer::new(table, config).unwrap();
    let err = optimizer
        .optimize(5_000_000.0, &[], &BudgetConstraints::default())
        .unwrap_err();
    assert!(matches!(err, BudgetError::InfeasibleBudget { .. }));
    assert!(err.to_string().contains("below the summed minimum spend"));
}

#[test]
fn field_force_curve_endpoints() {
    let table = ChannelProfileTable::default();
    let field = table.get(Channel::FieldForce).unwrap();
    assert!(roi_at_spend(field, 0.0).abs() < 1e-12);

    for response_type in [
        ResponseType::Logarithmic,
        ResponseType::LinearPlateau,
        ResponseType::ExponentialDecay,
        ResponseType::StepFunction,
        ResponseType::Linear,
    ] {
        let profile = ChannelProfile {
            response_type,
            ..*field
        };
        assert!(
            roi_at_spend(&profile, profile.saturation_spend) < profile.base_roi,
            "{response_type:?}"
        );
    }
}

#[test]
fn no_op_reoptimization_only_plans_continuous_phase() {
    let optimizer = BudgetOptimizer::default();
    let current = default_current(optimizer.table());
    let first = optimizer
        .optimize(TOTAL, &current, &BudgetConstraints::default())
        .unwrap();
    assert!(first.implementation_plan.len() > 1);

    // Re-optimizing from the optimized state changes nothing
    let settled = CurrentAllocation::snapshot(optimizer.table(), &first.optimized_budgets());
    let second = optimizer
        .optimize(TOTAL, &settled, &BudgetConstraints::default())
        .unwrap();
    assert_eq!(second.implementation_plan.len(), 1);
    let phase = &second.implementation_plan[0];
    assert_eq!(phase.phase, 3);
    assert_eq!(phase.timeline, "60-90 days");
    assert!(phase.budget_changes.is_empty());
    assert!(second.roi_improvement_pct.abs() < 1e-9);
}

#[test]
fn optimized_budgets_feed_scenario_simulation() {
    let optimizer = BudgetOptimizer::default();
    let current = default_current(optimizer.table());
    let result = optimizer
        .optimize(TOTAL, &current, &BudgetConstraints::default())
        .unwrap();

    let simulator = ScenarioSimulator::new(optimizer.table(), optimizer.config()).unwrap();
    let scenario = simulator.simulate_channels(&current, &result.optimized_budgets());
    assert!((scenario.projected_blended_roi - result.projected_blended_roi).abs() < 1e-9);
    assert!((scenario.roi_change_pct - result.roi_improvement_pct).abs() < 1e-9);
    assert!((scenario.estimated_rx_lift_pct - scenario.roi_change_pct * 0.5).abs() < 1e-12);
}

#[test]
fn result_serializes_for_the_presentation_layer() {
    let table = table_with_field_force(|p| p.min_spend = 10_000_000.0);
    let optimizer = BudgetOptimizer::new(table, OptimizerConfig::default()).unwrap();
    let result = optimizer
        .optimize(5_000_000.0, &[], &BudgetConstraints::default())
        .unwrap();
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["optimizedAllocations"][0]["channel"], "Field Force");
    assert_eq!(value["warnings"][0]["kind"], "infeasible_budget");
    assert_eq!(value["implementationPlan"].as_array().unwrap().last().unwrap()["phase"], 3);
}
