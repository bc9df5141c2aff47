use crate::{Error, Result};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use statrs::function::logistic::logistic;

/// Probability that a patient survives until a vehicle arrives after `t` minutes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SurvivalCurve {
    /// `1 / (1 + exp(intercept + slope * t))`
    Logistic { intercept: f64, slope: f64 },
    /// `1` up to and including `minutes`, `0` afterwards
    Threshold { minutes: f64 },
    /// `exp(-rate * t)`
    Exponential { rate: f64 },
}

impl SurvivalCurve {
    pub fn survival(&self, minutes: f64) -> f64 {
        match *self {
            SurvivalCurve::Logistic { intercept, slope } => logistic(-(intercept + slope * minutes)),
            SurvivalCurve::Threshold { minutes: limit } => {
                if minutes <= limit {
                    1.0
                } else {
                    0.0
                }
            }
            SurvivalCurve::Exponential { rate } => (-rate * minutes).exp(),
        }
    }

    /// Cardiac arrest (logistic), 15 minute and 60 minute response targets.
    pub fn defaults() -> Vec<SurvivalCurve> {
        vec![
            SurvivalCurve::Logistic {
                intercept: 0.26,
                slope: 0.139,
            },
            SurvivalCurve::Threshold { minutes: 15.0 },
            SurvivalCurve::Threshold { minutes: 60.0 },
        ]
    }
}

/// Survival tensor shaped `[patient_type][pickup][station]` from travel times
/// shaped `[station][pickup]`.
pub fn survival_tensor(curves: &[SurvivalCurve], travel_times: &Array2<f64>) -> Array3<f64> {
    let (num_stations, num_pickups) = travel_times.dim();
    Array3::from_shape_fn((curves.len(), num_pickups, num_stations), |(t, p, s)| {
        curves[t].survival(travel_times[[s, p]])
    })
}

/// Primary and secondary survival tensors for the same set of curves.
pub fn survival_time_vectors(
    curves: &[SurvivalCurve],
    primary_travel_times: &Array2<f64>,
    secondary_travel_times: &Array2<f64>,
) -> Result<(Array3<f64>, Array3<f64>)> {
    if primary_travel_times.dim() != secondary_travel_times.dim() {
        return Err(Error::shape(
            "secondary travel times",
            primary_travel_times.dim(),
            secondary_travel_times.dim(),
        ));
    }
    Ok((
        survival_tensor(curves, primary_travel_times),
        survival_tensor(curves, secondary_travel_times),
    ))
}
