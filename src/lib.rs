//! DCE budget core: channel budget optimization for the commercial-strategy
//! planner.
//!
//! This crate provides:
//! - Channel response curves (logarithmic, linear-plateau, exponential-decay,
//!   step-function, linear) with saturation
//! - Greedy marginal-ROI budget allocation under per-channel bounds
//! - Recommendations, a phased implementation plan and what-if scenarios
//!
//! Everything is synchronous and side-effect free. With the `python` feature
//! the optimizer is also exposed as a Python extension module.

pub mod channel;
pub mod config;
pub mod error;
pub mod optimization;
pub mod plan;
pub mod recommendations;
pub mod saturation;
pub mod scenario;

pub use channel::{Channel, ChannelProfile, ChannelProfileTable, ResponseType};
pub use config::{InfeasiblePolicy, OptimizerConfig};
pub use error::{BudgetError, Result};
pub use optimization::{
    blended_roi, BudgetAllocation, BudgetConstraints, BudgetOptimizer, BudgetPoint,
    CurrentAllocation, OptimizationResult,
};
pub use plan::{implementation_plan, ImplementationStep};
pub use recommendations::recommendations_for;
pub use saturation::{marginal_roi, response_curve, roi_at_spend, saturation_ratio, spend_grid};
pub use scenario::{ChannelProjection, ScenarioResult, ScenarioSimulator};

#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;
    use pyo3::types::PyDict;

    use crate::{
        response_curve, roi_at_spend, BudgetConstraints, BudgetError, BudgetOptimizer, Channel,
        ChannelProfile, ChannelProfileTable, CurrentAllocation, OptimizationResult,
        OptimizerConfig, ScenarioSimulator,
    };

    fn to_py_err(e: BudgetError) -> PyErr {
        PyValueError::new_err(e.to_string())
    }

    fn default_profile(table: &ChannelProfileTable, name: &str) -> PyResult<ChannelProfile> {
        let channel = Channel::parse(name).map_err(to_py_err)?;
        table
            .get(channel)
            .copied()
            .ok_or_else(|| to_py_err(BudgetError::UnknownChannel { name: name.to_string() }))
    }

    fn snapshot(
        table: &ChannelProfileTable,
        current_budgets: &[(String, f64)],
    ) -> PyResult<Vec<CurrentAllocation>> {
        let typed = current_budgets
            .iter()
            .map(|(name, spend)| Ok((Channel::parse(name).map_err(to_py_err)?, *spend)))
            .collect::<PyResult<Vec<_>>>()?;
        Ok(CurrentAllocation::snapshot(table, &typed))
    }

    fn run_optimizer(
        total_budget: f64,
        current_budgets: &[(String, f64)],
        constraints_json: Option<&str>,
        config_json: Option<&str>,
    ) -> PyResult<OptimizationResult> {
        let config = match config_json {
            Some(raw) => OptimizerConfig::from_json(raw).map_err(to_py_err)?,
            None => OptimizerConfig::default(),
        };
        let constraints: BudgetConstraints = match constraints_json {
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| to_py_err(BudgetError::from(e)))?,
            None => BudgetConstraints::default(),
        };
        let optimizer =
            BudgetOptimizer::new(ChannelProfileTable::default(), config).map_err(to_py_err)?;
        let current = snapshot(optimizer.table(), current_budgets)?;
        optimizer
            .optimize(total_budget, &current, &constraints)
            .map_err(to_py_err)
    }

    /// Python module definition
    #[pymodule]
    fn dce_budget_core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(roi_at_spend_rust, m)?)?;
        m.add_function(wrap_pyfunction!(response_curve_rust, m)?)?;
        m.add_function(wrap_pyfunction!(optimize_budget_rust, m)?)?;
        m.add_function(wrap_pyfunction!(optimization_report_rust, m)?)?;
        m.add_function(wrap_pyfunction!(simulate_scenario_rust, m)?)?;
        Ok(())
    }

    /// ROI of a default-table channel at one spend level.
    #[pyfunction]
    fn roi_at_spend_rust(channel: &str, spend: f64) -> PyResult<f64> {
        let table = ChannelProfileTable::default();
        let profile = default_profile(&table, channel)?;
        Ok(roi_at_spend(&profile, spend))
    }

    /// ROI curve of a default-table channel over a NumPy spend grid.
    #[pyfunction]
    fn response_curve_rust(
        py: Python,
        channel: &str,
        spends: PyReadonlyArray1<f64>,
    ) -> PyResult<Py<PyArray1<f64>>> {
        let table = ChannelProfileTable::default();
        let profile = default_profile(&table, channel)?;
        let spends = spends.as_array();
        let result = response_curve(&profile, &spends);
        Ok(result.into_pyarray(py).to_owned())
    }

    /// Optimized spend per channel, as a dict.
    #[pyfunction]
    #[pyo3(
        signature = (total_budget, current_budgets, constraints_json = None, config_json = None)
    )]
    fn optimize_budget_rust(
        py: Python,
        total_budget: f64,
        current_budgets: Vec<(String, f64)>,
        constraints_json: Option<&str>,
        config_json: Option<&str>,
    ) -> PyResult<Py<PyDict>> {
        let result = run_optimizer(total_budget, &current_budgets, constraints_json, config_json)?;

        let dict = PyDict::new(py);
        for (channel, spend) in result.optimized_budgets() {
            dict.set_item(channel.name(), spend)?;
        }
        Ok(dict.into())
    }

    /// Full optimization result (allocations, plan, warnings) as JSON.
    #[pyfunction]
    #[pyo3(
        signature = (total_budget, current_budgets, constraints_json = None, config_json = None)
    )]
    fn optimization_report_rust(
        total_budget: f64,
        current_budgets: Vec<(String, f64)>,
        constraints_json: Option<&str>,
        config_json: Option<&str>,
    ) -> PyResult<String> {
        let result = run_optimizer(total_budget, &current_budgets, constraints_json, config_json)?;
        serde_json::to_string(&result).map_err(|e| to_py_err(BudgetError::from(e)))
    }

    /// What-if scenario over the default table, as JSON.
    #[pyfunction]
    fn simulate_scenario_rust(
        current_budgets: Vec<(String, f64)>,
        proposed_budgets: Vec<(String, f64)>,
    ) -> PyResult<String> {
        let table = ChannelProfileTable::default();
        let config = OptimizerConfig::default();
        let current = snapshot(&table, &current_budgets)?;
        let result = ScenarioSimulator::new(&table, &config)
            .map_err(to_py_err)?
            .simulate(&current, &proposed_budgets);
        serde_json::to_string(&result).map_err(|e| to_py_err(BudgetError::from(e)))
    }
}
