use crate::{
    utilisation::{UtilisationModel, Utilisations},
    Allocation, Error, Instance, Result,
};
use ndarray::{Array1, Array2, Axis};

/// Probability that a given station supplies the responding vehicle,
/// shaped `[pickup][station]`.
///
/// `primary` and `secondary` treat each vehicle type on its own: the station
/// has a free vehicle and every same-type station ahead of it is fully busy.
/// `secondary_first` and `primary_first` describe the race between both types
/// for patients that get whichever vehicle arrives first.
#[derive(Debug, Clone)]
pub struct DispatchProbabilities {
    pub primary: Array2<f64>,
    pub secondary: Array2<f64>,
    pub secondary_first: Array2<f64>,
    pub primary_first: Array2<f64>,
}

/// Arrival rate routed to each station, per vehicle type.
#[derive(Debug, Clone, PartialEq)]
pub struct Workloads {
    pub primary: Array1<f64>,
    pub secondary: Array1<f64>,
}

fn check_dimensions(
    instance: &Instance,
    allocation: &Allocation,
    utilisations: &Utilisations,
) -> Result<()> {
    let num_stations = instance.num_stations();
    if allocation.num_stations() != num_stations {
        return Err(Error::shape("allocation", num_stations, allocation.num_stations()));
    }
    if utilisations.primary.len() != num_stations {
        return Err(Error::shape(
            "primary utilisations",
            num_stations,
            utilisations.primary.len(),
        ));
    }
    if utilisations.secondary.len() != num_stations {
        return Err(Error::shape(
            "secondary utilisations",
            num_stations,
            utilisations.secondary.len(),
        ));
    }
    Ok(())
}

/// `u^z` per station: probability that every vehicle stationed there is busy.
/// A station without vehicles is always "busy".
fn all_busy(utilisations: &Array1<f64>, counts: &[u32]) -> Array1<f64> {
    Array1::from_shape_fn(counts.len(), |s| utilisations[s].powi(counts[s] as i32))
}

pub fn dispatch_probabilities(
    instance: &Instance,
    allocation: &Allocation,
    utilisations: &Utilisations,
) -> Result<DispatchProbabilities> {
    check_dimensions(instance, allocation, utilisations)?;
    let num_stations = instance.num_stations();
    let num_pickups = instance.num_pickups();
    let beta = instance.beta();
    let r = instance.r();

    let busy_primary = all_busy(&utilisations.primary, allocation.primary());
    let busy_secondary = all_busy(&utilisations.secondary, allocation.secondary());

    let mut dispatch = DispatchProbabilities {
        primary: Array2::zeros((num_pickups, num_stations)),
        secondary: Array2::zeros((num_pickups, num_stations)),
        secondary_first: Array2::zeros((num_pickups, num_stations)),
        primary_first: Array2::zeros((num_pickups, num_stations)),
    };

    for p in 0..num_pickups {
        for s in 0..num_stations {
            let free_primary = 1.0 - busy_primary[s];
            let free_secondary = 1.0 - busy_secondary[s];
            if free_primary == 0.0 && free_secondary == 0.0 {
                continue;
            }

            let mut closer_primary_busy = 1.0;
            let mut closer_secondary_busy = 1.0;
            // primaries at least as fast as the secondary from s
            let mut faster_primary_busy = 1.0;
            // secondaries strictly faster than the primary from s
            let mut faster_secondary_busy = 1.0;
            for b in 0..num_stations {
                if beta[[p, b, s]] {
                    closer_primary_busy *= busy_primary[b];
                    closer_secondary_busy *= busy_secondary[b];
                }
                if r[[p, b, s]] {
                    faster_primary_busy *= busy_primary[b];
                }
                if !r[[p, s, b]] {
                    faster_secondary_busy *= busy_secondary[b];
                }
            }

            dispatch.primary[[p, s]] = free_primary * closer_primary_busy;
            dispatch.secondary[[p, s]] = free_secondary * closer_secondary_busy;
            dispatch.secondary_first[[p, s]] =
                free_secondary * closer_secondary_busy * faster_primary_busy;
            dispatch.primary_first[[p, s]] =
                free_primary * closer_primary_busy * faster_secondary_busy;
        }
    }

    Ok(dispatch)
}

/// Expected number of survivors per unit time for `allocation` under the
/// given busy probabilities.
///
/// Single-vehicle patient types contribute `S_p * P(primary from s responds)`;
/// multiple-vehicle types contribute the race terms of both vehicle types.
/// Each patient type is weighted by its single/multiple weights.
pub fn evaluate(
    instance: &Instance,
    allocation: &Allocation,
    utilisations: &Utilisations,
) -> Result<f64> {
    let dispatch = dispatch_probabilities(instance, allocation, utilisations)?;
    let demand_rates = instance.demand_rates();
    let primary_survivals = instance.primary_survivals();
    let secondary_survivals = instance.secondary_survivals();
    let weights_single = instance.weights_single_vehicle();
    let weights_multiple = instance.weights_multiple_vehicles();

    let mut total = 0.0;
    for t in 0..instance.num_patient_types() {
        let (w_single, w_multiple) = (weights_single[t], weights_multiple[t]);
        if w_single == 0.0 && w_multiple == 0.0 {
            continue;
        }
        for p in 0..instance.num_pickups() {
            let demand = demand_rates[[t, p]];
            if demand == 0.0 {
                continue;
            }
            let mut saved = 0.0;
            for s in 0..instance.num_stations() {
                let psi = primary_survivals[[t, p, s]] * dispatch.primary[[p, s]];
                let psi_tilde = secondary_survivals[[t, p, s]] * dispatch.secondary_first[[p, s]]
                    + primary_survivals[[t, p, s]] * dispatch.primary_first[[p, s]];
                saved += w_single * psi + w_multiple * psi_tilde;
            }
            total += demand * saved;
        }
    }
    Ok(total)
}

/// Resolves busy probabilities through `model`, then evaluates.
pub fn survival_objective(
    instance: &Instance,
    allocation: &Allocation,
    model: &UtilisationModel,
) -> Result<f64> {
    let utilisations = model.utilisations(instance, allocation)?;
    evaluate(instance, allocation, &utilisations)
}

/// Demand of each vehicle type split by pickup: every patient needs a primary
/// vehicle, patients of multiple-vehicle types also need a secondary one.
fn demand_by_type(instance: &Instance) -> (Array1<f64>, Array1<f64>) {
    let demand_rates = instance.demand_rates();
    let weights_multiple = instance.weights_multiple_vehicles();

    let primary_demand = demand_rates.sum_axis(Axis(0));
    let mut secondary_demand = Array1::<f64>::zeros(instance.num_pickups());
    for (t, row) in demand_rates.outer_iter().enumerate() {
        if weights_multiple[t] > 0.0 {
            secondary_demand += &row;
        }
    }
    (primary_demand, secondary_demand)
}

/// Demand that finds every same-type station ahead of each station busy,
/// whether or not the station itself then has a free vehicle.
pub fn offered_workloads(
    instance: &Instance,
    allocation: &Allocation,
    utilisations: &Utilisations,
) -> Result<Workloads> {
    check_dimensions(instance, allocation, utilisations)?;
    let num_stations = instance.num_stations();
    let beta = instance.beta();
    let busy_primary = all_busy(&utilisations.primary, allocation.primary());
    let busy_secondary = all_busy(&utilisations.secondary, allocation.secondary());
    let (primary_demand, secondary_demand) = demand_by_type(instance);

    let mut workloads = Workloads {
        primary: Array1::zeros(num_stations),
        secondary: Array1::zeros(num_stations),
    };
    for p in 0..instance.num_pickups() {
        for s in 0..num_stations {
            let mut closer_primary_busy = 1.0;
            let mut closer_secondary_busy = 1.0;
            for b in 0..num_stations {
                if beta[[p, b, s]] {
                    closer_primary_busy *= busy_primary[b];
                    closer_secondary_busy *= busy_secondary[b];
                }
            }
            workloads.primary[s] += primary_demand[p] * closer_primary_busy;
            workloads.secondary[s] += secondary_demand[p] * closer_secondary_busy;
        }
    }
    Ok(workloads)
}

/// Demand routed to each station when the first free vehicle of each type is
/// dispatched: the offered demand times the chance a vehicle there is free.
pub fn station_workloads(
    instance: &Instance,
    allocation: &Allocation,
    utilisations: &Utilisations,
) -> Result<Workloads> {
    let offered = offered_workloads(instance, allocation, utilisations)?;
    let free_primary = all_busy(&utilisations.primary, allocation.primary()).mapv(|busy| 1.0 - busy);
    let free_secondary =
        all_busy(&utilisations.secondary, allocation.secondary()).mapv(|busy| 1.0 - busy);
    Ok(Workloads {
        primary: offered.primary * free_primary,
        secondary: offered.secondary * free_secondary,
    })
}
