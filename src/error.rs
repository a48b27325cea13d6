//! Error types for the budget optimizer.
//!
//! Most of these are recoverable: the optimizer records them in the
//! result's `warnings` list and keeps going. Only inputs that make a call
//! meaningless are returned as `Err`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetError {
    #[error("Unknown channel '{name}'")]
    UnknownChannel { name: String },

    #[error(
        "Total budget {total_budget:.0} is below the summed minimum spend {required_minimum:.0}"
    )]
    InfeasibleBudget {
        total_budget: f64,
        required_minimum: f64,
    },

    #[error("Numeric domain error for {channel}: {detail}")]
    NumericDomain { channel: String, detail: String },

    #[error("Total budget must be a positive finite number, got {value}")]
    InvalidBudget { value: f64 },

    #[error("Invalid constraint for {channel}: {detail}")]
    InvalidConstraint { channel: String, detail: String },

    #[error("Conflicting bounds for {channel}: min {min:.0} exceeds max {max:.0}")]
    ConflictingBounds { channel: String, min: f64, max: f64 },

    #[error("Default minimum {default_min:.0} for {channel} lowered to the {max:.0} cap")]
    FloorLowered {
        channel: String,
        default_min: f64,
        max: f64,
    },

    #[error("Requested budget {requested:.0} capped at limit {limit:.0}")]
    BudgetCapped { requested: f64, limit: f64 },

    #[error("{amount:.0} could not be allocated: every channel is at its maximum")]
    UnallocatedBudget { amount: f64 },

    #[error("Invalid profile for {channel}: {reason}")]
    InvalidProfile { channel: String, reason: String },

    #[error("Channel {channel} appears more than once")]
    DuplicateChannel { channel: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

pub type Result<T> = std::result::Result<T, BudgetError>;

impl From<serde_json::Error> for BudgetError {
    fn from(e: serde_json::Error) -> Self {
        BudgetError::Config {
            message: e.to_string(),
        }
    }
}
