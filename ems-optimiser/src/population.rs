use crate::{config::Config, evaluation::BatchEvaluator};
use ems_model::{Allocation, Error, Result};
use rand::{seq::index, Rng};

/// Scatters `total` vehicles over `num_stations` stations holding at most
/// `cap` each, sampling without replacement from every (station, place) pair.
pub fn scatter_vehicles<R: Rng>(rng: &mut R, num_stations: usize, total: u32, cap: u32) -> Result<Vec<u32>> {
    let places = num_stations * cap as usize;
    if total as usize > places {
        return Err(Error::configuration(format!(
            "{} vehicles do not fit in {} stations of {}",
            total, num_stations, cap
        )));
    }
    let mut counts = vec![0u32; num_stations];
    for place in index::sample(rng, places, total as usize).into_iter() {
        counts[place / cap as usize] += 1;
    }
    Ok(counts)
}

/// Redraws the primary/secondary split of a fleet, keeping at least 75% of
/// the primary-equivalent budget as primary vehicles.
pub fn randomise_vehicle_numbers<R: Rng>(rng: &mut R, primary: u32, secondary: u32, ratio: u32) -> (u32, u32) {
    let equivalent = primary + secondary / ratio.max(1);
    let fewest_primary = (3 * equivalent).div_ceil(4);
    let drawn = rng.gen_range(fewest_primary..=equivalent);
    (drawn, (equivalent - drawn) * ratio)
}

pub fn create_initial_population<R: Rng>(
    rng: &mut R,
    config: &Config,
    num_stations: usize,
) -> Result<Vec<Allocation>> {
    (0..config.population_size)
        .map(|_| {
            let (num_primary, num_secondary) = if config.randomise_vehicle_numbers {
                randomise_vehicle_numbers(
                    rng,
                    config.num_primary_vehicles,
                    config.num_secondary_vehicles,
                    config.primary_to_secondary_ratio,
                )
            } else {
                (config.num_primary_vehicles, config.num_secondary_vehicles)
            };
            let primary = scatter_vehicles(rng, num_stations, num_primary, config.max_primary)?;
            let secondary = scatter_vehicles(rng, num_stations, num_secondary, config.max_secondary)?;
            Allocation::new(primary, secondary)
        })
        .collect()
}

/// Sorts `population` best first. Equal scores keep their input order.
pub fn rank_population<E: BatchEvaluator + ?Sized>(
    population: Vec<Allocation>,
    evaluator: &E,
) -> Result<(Vec<Allocation>, Vec<f64>)> {
    let scores = evaluator.evaluate_batch(&population)?;
    if scores.len() != population.len() {
        return Err(Error::shape("batch scores", population.len(), scores.len()));
    }
    let mut order: Vec<usize> = (0..population.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut slots: Vec<Option<Allocation>> = population.into_iter().map(Some).collect();
    let ranked = order.iter().filter_map(|&i| slots[i].take()).collect();
    let ranked_scores = order.iter().map(|&i| scores[i]).collect();
    Ok((ranked, ranked_scores))
}
