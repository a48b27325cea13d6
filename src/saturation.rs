//! Saturation response model - ROI as a function of channel spend.

use ndarray::{Array1, ArrayView1};

use crate::channel::{ChannelProfile, ResponseType};

/// Floor NaN, infinities and negatives to zero.
#[inline]
fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Spend as a fraction of the channel's saturation spend, clamped to [0, 1].
///
/// A degenerate profile (zero or non-finite saturation spend) yields 0.
pub fn saturation_ratio(profile: &ChannelProfile, spend: f64) -> f64 {
    let ratio = spend / profile.saturation_spend;
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Instantaneous ROI at a given spend level.
///
/// The curve adjusts `base_roi` by a multiplier depending on the response
/// type, then scales by `quality_score`:
/// - logarithmic: ln(1 + 10r) / ln(11)
/// - linear-plateau: 1 until r = 0.8, then 1 - 2(r - 0.8)
/// - exponential-decay: (1 - e^-3r) / (1 - e^-3)
/// - step-function: 0.8, 1.0, 0.9, 0.6 at r < 0.3, 0.6, 0.9, else
/// - linear: 1 - 0.3r
pub fn roi_at_spend(profile: &ChannelProfile, spend: f64) -> f64 {
    let r = saturation_ratio(profile, spend);
    let multiplier = match profile.response_type {
        ResponseType::Logarithmic => (1.0 + 10.0 * r).ln() / 11f64.ln(),
        ResponseType::LinearPlateau => {
            if r < 0.8 {
                1.0
            } else {
                1.0 - 2.0 * (r - 0.8)
            }
        }
        ResponseType::ExponentialDecay => (1.0 - (-3.0 * r).exp()) / (1.0 - (-3.0f64).exp()),
        ResponseType::StepFunction => {
            if r < 0.3 {
                0.8
            } else if r < 0.6 {
                1.0
            } else if r < 0.9 {
                0.9
            } else {
                0.6
            }
        }
        ResponseType::Linear => 1.0 - 0.3 * r,
    };
    non_negative(profile.base_roi * multiplier * profile.quality_score)
}

/// Marginal ROI used to rank channels during greedy allocation.
///
/// This is a simplified per-curve heuristic, not the derivative of
/// [`roi_at_spend`], so the allocator is an approximation. Quality score
/// does not enter the ranking.
pub fn marginal_roi(profile: &ChannelProfile, current_spend: f64) -> f64 {
    let r = saturation_ratio(profile, current_spend);
    let base = profile.base_roi;
    let marginal = match profile.response_type {
        ResponseType::Logarithmic => base / (1.0 + 2.0 * r),
        ResponseType::LinearPlateau => {
            if r < 0.8 {
                base
            } else {
                base * 0.25
            }
        }
        ResponseType::ExponentialDecay => base * (-2.0 * r).exp(),
        ResponseType::StepFunction => {
            if r < 0.6 {
                base
            } else if r < 0.9 {
                base * 0.5
            } else {
                base * 0.1
            }
        }
        ResponseType::Linear => base * (1.0 - 0.6 * r),
    };
    non_negative(marginal)
}

/// ROI evaluated over a grid of spend levels, for charting.
pub fn response_curve(profile: &ChannelProfile, spends: &ArrayView1<f64>) -> Array1<f64> {
    spends.map(|&spend| roi_at_spend(profile, spend.max(0.0)))
}

/// Evenly spaced spend levels from 0 to twice the saturation spend.
pub fn spend_grid(profile: &ChannelProfile, points: usize) -> Array1<f64> {
    let upper = non_negative(profile.saturation_spend) * 2.0;
    Array1::linspace(0.0, upper, points.max(2))
}
