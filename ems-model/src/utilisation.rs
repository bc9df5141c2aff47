use crate::{objective::offered_workloads, Allocation, Error, Instance, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_CEILING: f64 = 0.99;

/// Busy probability of a single vehicle at each station, per vehicle type.
#[derive(Debug, Clone, PartialEq)]
pub struct Utilisations {
    pub primary: Array1<f64>,
    pub secondary: Array1<f64>,
}

impl Utilisations {
    pub fn constant(num_stations: usize, primary: f64, secondary: f64) -> Self {
        Self {
            primary: Array1::from_elem(num_stations, primary),
            secondary: Array1::from_elem(num_stations, secondary),
        }
    }

    /// Clamps into `[0, ceiling]`; NaN entries become `ceiling`.
    pub fn clamped(mut self, ceiling: f64) -> Self {
        let clamp = move |u: f64| {
            if u.is_nan() {
                ceiling
            } else {
                u.clamp(0.0, ceiling)
            }
        };
        self.primary.mapv_inplace(clamp);
        self.secondary.mapv_inplace(clamp);
        self
    }

    pub fn max_difference(&self, other: &Utilisations) -> f64 {
        self.primary
            .iter()
            .zip(other.primary.iter())
            .chain(self.secondary.iter().zip(other.secondary.iter()))
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    fn relax_towards(&mut self, target: &Utilisations, damping: f64) {
        self.primary
            .zip_mut_with(&target.primary, |u, t| *u += damping * (t - *u));
        self.secondary
            .zip_mut_with(&target.secondary, |u, t| *u += damping * (t - *u));
    }
}

fn default_ceiling() -> f64 {
    DEFAULT_CEILING
}

fn default_tolerance() -> f64 {
    1e-9
}

fn default_max_iterations() -> usize {
    500
}

fn default_damping() -> f64 {
    1.0
}

const NEWTON_STEPS: usize = 100;

/// How busy probabilities are obtained for an allocation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UtilisationModel {
    Constant {
        primary: f64,
        secondary: f64,
    },
    Given {
        primary: Vec<f64>,
        secondary: Vec<f64>,
    },
    Proportional {
        service_rate_primary: f64,
        service_rate_secondary: f64,
        #[serde(default = "default_ceiling")]
        ceiling: f64,
    },
    SelfConsistent(SelfConsistentSolver),
}

impl Default for UtilisationModel {
    fn default() -> Self {
        UtilisationModel::Proportional {
            service_rate_primary: 1.0 / (4.5 * 60.0),
            service_rate_secondary: 1.0 / (3.5 * 60.0),
            ceiling: DEFAULT_CEILING,
        }
    }
}

impl UtilisationModel {
    pub fn validate(&self, num_stations: usize) -> Result<()> {
        let probability = |name: &str, u: f64| {
            if (0.0..=1.0).contains(&u) {
                Ok(())
            } else {
                Err(Error::configuration(format!(
                    "{} utilisation must lie in [0, 1], got {}",
                    name, u
                )))
            }
        };
        match self {
            UtilisationModel::Constant { primary, secondary } => {
                probability("primary", *primary)?;
                probability("secondary", *secondary)
            }
            UtilisationModel::Given { primary, secondary } => {
                if primary.len() != num_stations {
                    return Err(Error::shape("given primary utilisations", num_stations, primary.len()));
                }
                if secondary.len() != num_stations {
                    return Err(Error::shape(
                        "given secondary utilisations",
                        num_stations,
                        secondary.len(),
                    ));
                }
                primary.iter().try_for_each(|u| probability("primary", *u))?;
                secondary.iter().try_for_each(|u| probability("secondary", *u))
            }
            UtilisationModel::Proportional {
                service_rate_primary,
                service_rate_secondary,
                ceiling,
            } => validate_rates(*service_rate_primary, *service_rate_secondary, *ceiling),
            UtilisationModel::SelfConsistent(solver) => solver.validate(),
        }
    }

    pub fn utilisations(&self, instance: &Instance, allocation: &Allocation) -> Result<Utilisations> {
        let num_stations = instance.num_stations();
        self.validate(num_stations)?;
        if allocation.num_stations() != num_stations {
            return Err(Error::shape("allocation", num_stations, allocation.num_stations()));
        }
        match self {
            UtilisationModel::Constant { primary, secondary } => {
                Ok(Utilisations::constant(num_stations, *primary, *secondary))
            }
            UtilisationModel::Given { primary, secondary } => Ok(Utilisations {
                primary: Array1::from(primary.clone()),
                secondary: Array1::from(secondary.clone()),
            }),
            UtilisationModel::Proportional {
                service_rate_primary,
                service_rate_secondary,
                ceiling,
            } => Ok(proportional(
                instance,
                allocation,
                *service_rate_primary,
                *service_rate_secondary,
                *ceiling,
            )),
            UtilisationModel::SelfConsistent(solver) => {
                let solved = solver.solve(instance, allocation)?;
                if let Err(error) = solved.check() {
                    warn!(%error, ceiling = solver.ceiling, "clamping utilisations");
                }
                Ok(solved.utilisations.clamped(solver.ceiling))
            }
        }
    }
}

fn validate_rates(service_rate_primary: f64, service_rate_secondary: f64, ceiling: f64) -> Result<()> {
    if !(service_rate_primary.is_finite() && service_rate_primary > 0.0)
        || !(service_rate_secondary.is_finite() && service_rate_secondary > 0.0)
    {
        return Err(Error::configuration(format!(
            "service rates must be positive, got {} and {}",
            service_rate_primary, service_rate_secondary
        )));
    }
    if !(ceiling > 0.0 && ceiling <= 1.0) {
        return Err(Error::configuration(format!(
            "utilisation ceiling must lie in (0, 1], got {}",
            ceiling
        )));
    }
    Ok(())
}

/// `load / (service_rate * z)`, zero where nothing is stationed.
fn offered_utilisation(load: impl Fn(usize) -> f64, counts: &[u32], service_rate: f64, ceiling: f64) -> Array1<f64> {
    Array1::from_shape_fn(counts.len(), |s| {
        if counts[s] == 0 {
            0.0
        } else {
            (load(s) / (service_rate * counts[s] as f64)).clamp(0.0, ceiling)
        }
    })
}

/// Every station of a type is assumed to see the whole demand for that type:
/// all demand for primaries, multiple-vehicle demand for secondaries.
pub fn proportional(
    instance: &Instance,
    allocation: &Allocation,
    service_rate_primary: f64,
    service_rate_secondary: f64,
    ceiling: f64,
) -> Utilisations {
    let primary_load = instance.demand_rates().sum();
    let secondary_load = instance.multiple_vehicle_demand();
    Utilisations {
        primary: offered_utilisation(|_| primary_load, allocation.primary(), service_rate_primary, ceiling),
        secondary: offered_utilisation(
            |_| secondary_load,
            allocation.secondary(),
            service_rate_secondary,
            ceiling,
        ),
    }
}

/// Utilisation of a station holding `count` vehicles that is offered
/// `offered` demand: the root of `u * service_rate * count = offered * (1 - u^count)`,
/// capped at `ceiling`.
fn station_utilisation(offered: f64, count: u32, service_rate: f64, ceiling: f64) -> f64 {
    if count == 0 || offered <= 0.0 {
        return 0.0;
    }
    let z = count as i32;
    let load = offered / (service_rate * count as f64);
    let excess = |u: f64| u - load * (1.0 - u.powi(z));
    if !(excess(ceiling) > 0.0) {
        return ceiling;
    }
    // excess is convex and increasing, so Newton steps from the cap descend onto the root
    let mut u = ceiling;
    for _ in 0..NEWTON_STEPS {
        let step = excess(u) / (1.0 + load * count as f64 * u.powi(z - 1));
        u -= step;
        if step <= f64::EPSILON * u {
            break;
        }
    }
    u.max(0.0)
}

/// Fixed point of `u_s = min(ceiling, lambda_s(u) / (mu * z_s))`, where
/// `lambda_s(u)` is the demand the dispatch model of the objective routes to
/// station `s`.
///
/// Each sweep solves every station exactly against the demand offered to it
/// by the stations ahead, which only grows as those stations get busier. The
/// sweeps therefore descend monotonically from the proportional estimate onto
/// the largest fixed point, and adding a vehicle anywhere can only lower the
/// chance that a station is fully busy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SelfConsistentSolver {
    pub service_rate_primary: f64,
    pub service_rate_secondary: f64,
    #[serde(default = "default_ceiling")]
    pub ceiling: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Step towards each sweep's result, in `(0, 1]`.
    #[serde(default = "default_damping")]
    pub damping: f64,
}

impl SelfConsistentSolver {
    pub fn new(service_rate_primary: f64, service_rate_secondary: f64) -> Self {
        Self {
            service_rate_primary,
            service_rate_secondary,
            ceiling: DEFAULT_CEILING,
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            damping: default_damping(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_rates(self.service_rate_primary, self.service_rate_secondary, self.ceiling)?;
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::configuration(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::configuration("max_iterations must be at least 1"));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(Error::configuration(format!(
                "damping must lie in (0, 1], got {}",
                self.damping
            )));
        }
        Ok(())
    }

    fn sweep(&self, offered: &Array1<f64>, counts: &[u32], service_rate: f64) -> Array1<f64> {
        Array1::from_shape_fn(counts.len(), |s| {
            station_utilisation(offered[s], counts[s], service_rate, self.ceiling)
        })
    }

    /// Runs the sweeps from the proportional estimate. Running out of
    /// iterations is not an error here; see [`FixedPoint::check`].
    pub fn solve(&self, instance: &Instance, allocation: &Allocation) -> Result<FixedPoint> {
        let mut current = proportional(
            instance,
            allocation,
            self.service_rate_primary,
            self.service_rate_secondary,
            self.ceiling,
        );
        let mut residual = f64::INFINITY;
        for iteration in 1..=self.max_iterations {
            let offered = offered_workloads(instance, allocation, &current)?;
            let target = Utilisations {
                primary: self.sweep(&offered.primary, allocation.primary(), self.service_rate_primary),
                secondary: self.sweep(
                    &offered.secondary,
                    allocation.secondary(),
                    self.service_rate_secondary,
                ),
            };
            residual = target.max_difference(&current);
            current.relax_towards(&target, self.damping);
            if residual < self.tolerance {
                return Ok(FixedPoint {
                    utilisations: current,
                    iterations: iteration,
                    residual,
                    converged: true,
                });
            }
        }
        Ok(FixedPoint {
            utilisations: current,
            iterations: self.max_iterations,
            residual,
            converged: false,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FixedPoint {
    pub utilisations: Utilisations,
    pub iterations: usize,
    pub residual: f64,
    pub converged: bool,
}

impl FixedPoint {
    pub fn check(&self) -> Result<()> {
        if self.converged {
            Ok(())
        } else {
            Err(Error::NumericDivergence {
                iterations: self.iterations,
                residual: self.residual,
            })
        }
    }
}
