use crate::{
    precedence::{station_precedence, vehicle_type_precedence},
    survival::{survival_time_vectors, SurvivalCurve},
    Error, Result,
};
use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

/// Divisors turning raw travel times into per-vehicle-type travel times.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SpeedRatios {
    pub primary: f64,
    pub secondary: f64,
}

impl Default for SpeedRatios {
    fn default() -> Self {
        Self {
            primary: 0.75,
            secondary: 1.215,
        }
    }
}

/// Everything about one experiment that stays fixed while allocations change.
///
/// Built once per run and never mutated afterwards. All tensors are checked
/// for consistent dimensions on construction:
///
/// * `demand_rates`: `[patient_type][pickup]`
/// * survival tensors: `[patient_type][pickup][station]`
/// * weights: `[patient_type]`
/// * `beta`, `r`: `[pickup][station][station]`
#[derive(Debug, Clone)]
pub struct Instance {
    demand_rates: Array2<f64>,
    primary_survivals: Array3<f64>,
    secondary_survivals: Array3<f64>,
    weights_single_vehicle: Array1<f64>,
    weights_multiple_vehicles: Array1<f64>,
    beta: Array3<bool>,
    r: Array3<bool>,
}

impl Instance {
    pub fn new(
        demand_rates: Array2<f64>,
        primary_survivals: Array3<f64>,
        secondary_survivals: Array3<f64>,
        weights_single_vehicle: Array1<f64>,
        weights_multiple_vehicles: Array1<f64>,
        beta: Array3<bool>,
        r: Array3<bool>,
    ) -> Result<Self> {
        let (num_patient_types, num_pickups) = demand_rates.dim();
        let (_, _, num_stations) = primary_survivals.dim();
        let survival_dim = (num_patient_types, num_pickups, num_stations);
        let precedence_dim = (num_pickups, num_stations, num_stations);

        if primary_survivals.dim() != survival_dim {
            return Err(Error::shape("primary survivals", survival_dim, primary_survivals.dim()));
        }
        if secondary_survivals.dim() != survival_dim {
            return Err(Error::shape("secondary survivals", survival_dim, secondary_survivals.dim()));
        }
        if weights_single_vehicle.len() != num_patient_types {
            return Err(Error::shape(
                "single vehicle weights",
                num_patient_types,
                weights_single_vehicle.len(),
            ));
        }
        if weights_multiple_vehicles.len() != num_patient_types {
            return Err(Error::shape(
                "multiple vehicle weights",
                num_patient_types,
                weights_multiple_vehicles.len(),
            ));
        }
        if beta.dim() != precedence_dim {
            return Err(Error::shape("beta", precedence_dim, beta.dim()));
        }
        if r.dim() != precedence_dim {
            return Err(Error::shape("R", precedence_dim, r.dim()));
        }

        if demand_rates.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(Error::configuration("demand rates must be finite and non-negative"));
        }
        if primary_survivals
            .iter()
            .chain(secondary_survivals.iter())
            .any(|s| !(0.0..=1.0).contains(s))
        {
            return Err(Error::configuration("survival probabilities must lie in [0, 1]"));
        }
        if weights_single_vehicle
            .iter()
            .chain(weights_multiple_vehicles.iter())
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(Error::configuration("weights must be finite and non-negative"));
        }

        Ok(Self {
            demand_rates,
            primary_survivals,
            secondary_survivals,
            weights_single_vehicle,
            weights_multiple_vehicles,
            beta,
            r,
        })
    }

    /// Derives precedence and survival tensors from raw travel times shaped
    /// `[station][pickup]`.
    pub fn from_travel_times(
        travel_times: &Array2<f64>,
        speeds: &SpeedRatios,
        curves: &[SurvivalCurve],
        demand_rates: Array2<f64>,
        weights_single_vehicle: Array1<f64>,
        weights_multiple_vehicles: Array1<f64>,
    ) -> Result<Self> {
        if travel_times.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(Error::configuration("travel times must be finite and non-negative"));
        }
        if !(speeds.primary > 0.0 && speeds.secondary > 0.0) {
            return Err(Error::configuration(format!(
                "speed ratios must be positive, got {:?}",
                speeds
            )));
        }
        if curves.len() != demand_rates.nrows() {
            return Err(Error::shape("survival curves", demand_rates.nrows(), curves.len()));
        }
        if travel_times.ncols() != demand_rates.ncols() {
            return Err(Error::shape(
                "demand pickup locations",
                travel_times.ncols(),
                demand_rates.ncols(),
            ));
        }

        let primary_travel_times = travel_times / speeds.primary;
        let secondary_travel_times = travel_times / speeds.secondary;
        let beta = station_precedence(travel_times);
        let r = vehicle_type_precedence(&primary_travel_times, &secondary_travel_times)?;
        let (primary_survivals, secondary_survivals) =
            survival_time_vectors(curves, &primary_travel_times, &secondary_travel_times)?;

        Self::new(
            demand_rates,
            primary_survivals,
            secondary_survivals,
            weights_single_vehicle,
            weights_multiple_vehicles,
            beta,
            r,
        )
    }

    pub fn num_stations(&self) -> usize {
        self.primary_survivals.dim().2
    }

    pub fn num_pickups(&self) -> usize {
        self.demand_rates.ncols()
    }

    pub fn num_patient_types(&self) -> usize {
        self.demand_rates.nrows()
    }

    pub fn demand_rates(&self) -> &Array2<f64> {
        &self.demand_rates
    }

    pub fn primary_survivals(&self) -> &Array3<f64> {
        &self.primary_survivals
    }

    pub fn secondary_survivals(&self) -> &Array3<f64> {
        &self.secondary_survivals
    }

    pub fn weights_single_vehicle(&self) -> &Array1<f64> {
        &self.weights_single_vehicle
    }

    pub fn weights_multiple_vehicles(&self) -> &Array1<f64> {
        &self.weights_multiple_vehicles
    }

    pub fn beta(&self) -> &Array3<bool> {
        &self.beta
    }

    pub fn r(&self) -> &Array3<bool> {
        &self.r
    }

    /// Weighted demand volume; no allocation can save more than this.
    pub fn total_demand(&self) -> f64 {
        self.demand_rates
            .outer_iter()
            .enumerate()
            .map(|(t, row)| {
                (self.weights_single_vehicle[t] + self.weights_multiple_vehicles[t]) * row.sum()
            })
            .sum()
    }

    /// Demand of the patient types answered by the faster of both vehicle types.
    pub fn multiple_vehicle_demand(&self) -> f64 {
        self.demand_rates
            .outer_iter()
            .enumerate()
            .filter(|(t, _)| self.weights_multiple_vehicles[*t] > 0.0)
            .map(|(_, row)| row.sum())
            .sum()
    }
}
