//! Perturbations of an allocation.
//!
//! Every operator returns a new [`Allocation`] and fails with
//! [`Error::InfeasibleMutation`] instead of producing an invalid one.
//!
//! The two exchange operators sample without replacement over capacity slots:
//! a station with `k` free places can receive up to `k` of the traded
//! secondary vehicles, and a station holding `k` secondary vehicles can give
//! up to `k` of them. A station may therefore appear more than once, but a
//! trade never exceeds a cap or takes a vehicle that is not there.

use ems_model::{Allocation, Error, Result};
use rand::{seq::index, Rng};
use serde::{Deserialize, Serialize};

/// Per-station caps and the number of secondary vehicles traded for one primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub max_primary: u32,
    pub max_secondary: u32,
    pub ratio: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MutationPolicy {
    /// Only move vehicles between stations; totals never change.
    #[default]
    RetainCounts,
    /// Moves plus trades of one primary for `ratio` secondary vehicles.
    FullExchange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    MovePrimary,
    MoveSecondary,
    PrimaryToSecondary,
    SecondaryToPrimary,
}

impl Operator {
    pub fn name(self) -> &'static str {
        match self {
            Operator::MovePrimary => "move_primary",
            Operator::MoveSecondary => "move_secondary",
            Operator::PrimaryToSecondary => "switch_primary_to_secondary",
            Operator::SecondaryToPrimary => "switch_secondary_to_primary",
        }
    }

    pub fn is_feasible(self, allocation: &Allocation, bounds: &Bounds) -> bool {
        match self {
            Operator::MovePrimary => can_move(allocation.primary(), bounds.max_primary),
            Operator::MoveSecondary => can_move(allocation.secondary(), bounds.max_secondary),
            Operator::PrimaryToSecondary => {
                let ratio = bounds.ratio as u64;
                allocation.total_primary() as u64 * ratio
                    > allocation.total_secondary() as u64 + ratio
                    && free_slots(allocation.secondary(), bounds.max_secondary) >= ratio
            }
            Operator::SecondaryToPrimary => {
                allocation.total_secondary() > bounds.ratio
                    && free_slots(allocation.primary(), bounds.max_primary) > 0
            }
        }
    }

    pub fn apply<R: Rng>(self, rng: &mut R, allocation: &Allocation, bounds: &Bounds) -> Result<Allocation> {
        match self {
            Operator::MovePrimary => move_vehicle_of_same_type(rng, allocation, bounds),
            Operator::MoveSecondary => move_secondary_vehicle_of_same_type(rng, allocation, bounds),
            Operator::PrimaryToSecondary => switch_primary_to_secondary(rng, allocation, bounds),
            Operator::SecondaryToPrimary => switch_secondary_to_primary(rng, allocation, bounds),
        }
    }
}

impl MutationPolicy {
    pub fn operators(self) -> &'static [Operator] {
        match self {
            MutationPolicy::RetainCounts => &[Operator::MovePrimary, Operator::MoveSecondary],
            MutationPolicy::FullExchange => &[
                Operator::MovePrimary,
                Operator::MoveSecondary,
                Operator::PrimaryToSecondary,
                Operator::SecondaryToPrimary,
            ],
        }
    }
}

fn free_slots(counts: &[u32], cap: u32) -> u64 {
    counts.iter().map(|&z| cap.saturating_sub(z) as u64).sum()
}

fn can_move(counts: &[u32], cap: u32) -> bool {
    move_donors(counts, cap).next().is_some()
}

/// Stations holding a vehicle that some other station has room for.
fn move_donors(counts: &[u32], cap: u32) -> impl Iterator<Item = usize> + '_ {
    (0..counts.len()).filter(move |&s| {
        counts[s] > 0 && (0..counts.len()).any(|r| r != s && counts[r] < cap)
    })
}

/// Moves one vehicle from station `from` to station `to`.
pub fn move_vehicle(counts: &[u32], from: usize, to: usize) -> Result<Vec<u32>> {
    if from >= counts.len() || to >= counts.len() || from == to {
        return Err(Error::infeasible(
            "move_vehicle",
            format!("cannot move from station {} to {} of {}", from, to, counts.len()),
        ));
    }
    if counts[from] == 0 {
        return Err(Error::infeasible(
            "move_vehicle",
            format!("station {} has no vehicle in {:?}", from, counts),
        ));
    }
    let mut moved = counts.to_vec();
    moved[from] -= 1;
    moved[to] += 1;
    Ok(moved)
}

fn move_within<R: Rng>(rng: &mut R, counts: &[u32], cap: u32, operator: &'static str) -> Result<Vec<u32>> {
    let donors: Vec<usize> = move_donors(counts, cap).collect();
    if donors.is_empty() {
        return Err(Error::infeasible(
            operator,
            format!("no vehicle can move within {:?} under cap {}", counts, cap),
        ));
    }
    let from = donors[rng.gen_range(0..donors.len())];
    let recipients: Vec<usize> = (0..counts.len())
        .filter(|&r| r != from && counts[r] < cap)
        .collect();
    let to = recipients[rng.gen_range(0..recipients.len())];
    move_vehicle(counts, from, to)
}

/// Moves one primary vehicle to a different station with room for it.
///
/// The donor is drawn uniformly from stations that can give a vehicle away,
/// then the recipient uniformly from the other stations below `max_primary`.
pub fn move_vehicle_of_same_type<R: Rng>(
    rng: &mut R,
    allocation: &Allocation,
    bounds: &Bounds,
) -> Result<Allocation> {
    let primary = move_within(
        rng,
        allocation.primary(),
        bounds.max_primary,
        Operator::MovePrimary.name(),
    )?;
    Allocation::new(primary, allocation.secondary().to_vec())
}

/// [`move_vehicle_of_same_type`] applied to the secondary fleet.
pub fn move_secondary_vehicle_of_same_type<R: Rng>(
    rng: &mut R,
    allocation: &Allocation,
    bounds: &Bounds,
) -> Result<Allocation> {
    let swapped_bounds = Bounds {
        max_primary: bounds.max_secondary,
        max_secondary: bounds.max_primary,
        ratio: bounds.ratio,
    };
    move_vehicle_of_same_type(rng, &allocation.swapped(), &swapped_bounds)
        .map(|moved| moved.swapped())
        .map_err(|error| match error {
            Error::InfeasibleMutation { reason, .. } => {
                Error::infeasible(Operator::MoveSecondary.name(), reason)
            }
            other => other,
        })
}

/// Expands per-station counts into one entry per unit, e.g. `[2, 0, 1] -> [0, 0, 2]`.
fn unit_slots(counts: impl Iterator<Item = u32>) -> Vec<usize> {
    counts
        .enumerate()
        .flat_map(|(s, n)| std::iter::repeat(s).take(n as usize))
        .collect()
}

/// Removes one primary vehicle and adds `ratio` secondary vehicles.
pub fn switch_primary_to_secondary<R: Rng>(
    rng: &mut R,
    allocation: &Allocation,
    bounds: &Bounds,
) -> Result<Allocation> {
    let operator = Operator::PrimaryToSecondary;
    if !operator.is_feasible(allocation, bounds) {
        return Err(Error::infeasible(
            operator.name(),
            format!(
                "{} primary and {} secondary vehicles with {} free secondary places",
                allocation.total_primary(),
                allocation.total_secondary(),
                free_slots(allocation.secondary(), bounds.max_secondary)
            ),
        ));
    }
    let (mut primary, mut secondary) = allocation.clone().into_parts();

    let donors: Vec<usize> = (0..primary.len()).filter(|&s| primary[s] > 0).collect();
    primary[donors[rng.gen_range(0..donors.len())]] -= 1;

    let free = unit_slots(secondary.iter().map(|&z| bounds.max_secondary.saturating_sub(z)));
    for slot in index::sample(rng, free.len(), bounds.ratio as usize).into_iter() {
        secondary[free[slot]] += 1;
    }
    Allocation::new(primary, secondary)
}

/// Removes `ratio` secondary vehicles and adds one primary vehicle.
pub fn switch_secondary_to_primary<R: Rng>(
    rng: &mut R,
    allocation: &Allocation,
    bounds: &Bounds,
) -> Result<Allocation> {
    let operator = Operator::SecondaryToPrimary;
    if !operator.is_feasible(allocation, bounds) {
        return Err(Error::infeasible(
            operator.name(),
            format!(
                "{} secondary vehicles for a ratio of {} with {} free primary places",
                allocation.total_secondary(),
                bounds.ratio,
                free_slots(allocation.primary(), bounds.max_primary)
            ),
        ));
    }
    let (mut primary, mut secondary) = allocation.clone().into_parts();

    let vehicles = unit_slots(secondary.iter().copied());
    for unit in index::sample(rng, vehicles.len(), bounds.ratio as usize).into_iter() {
        secondary[vehicles[unit]] -= 1;
    }

    let recipients: Vec<usize> = (0..primary.len())
        .filter(|&s| primary[s] < bounds.max_primary)
        .collect();
    primary[recipients[rng.gen_range(0..recipients.len())]] += 1;
    Allocation::new(primary, secondary)
}

/// Applies one operator drawn uniformly from those of `policy` that are
/// feasible for `allocation`.
pub fn mutate<R: Rng>(
    rng: &mut R,
    allocation: &Allocation,
    policy: MutationPolicy,
    bounds: &Bounds,
) -> Result<Allocation> {
    let feasible: Vec<Operator> = policy
        .operators()
        .iter()
        .copied()
        .filter(|op| op.is_feasible(allocation, bounds))
        .collect();
    if feasible.is_empty() {
        return Err(Error::infeasible(
            "mutate",
            format!("no {:?} operator applies to {:?}", policy, allocation),
        ));
    }
    feasible[rng.gen_range(0..feasible.len())].apply(rng, allocation, bounds)
}

pub fn repeat_mutation<R: Rng>(
    rng: &mut R,
    allocation: &Allocation,
    policy: MutationPolicy,
    bounds: &Bounds,
    times: usize,
) -> Result<Allocation> {
    let mut mutated = allocation.clone();
    for _ in 0..times {
        mutated = mutate(rng, &mutated, policy, bounds)?;
    }
    Ok(mutated)
}
