use crate::{
    cache::ObjectiveCache,
    config::Config,
    evaluation::{BatchEvaluator, SurvivalEvaluator},
    mutation::repeat_mutation,
    population::{create_initial_population, rank_population},
    schedule::repetition_schedule,
};
use ems_model::{Allocation, Error, Instance, Result, UtilisationModel};
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct OptimisationResult {
    pub best: Allocation,
    pub best_objective: f64,
    /// Final population, best first.
    pub population: Vec<Allocation>,
    pub scores: Vec<f64>,
    /// Ranked scores of every generation, shaped `[iteration][rank]`.
    pub history: Array2<f64>,
    pub cache_size: usize,
}

/// Mutated copies of randomly drawn elites, one per free slot.
///
/// An elite whose mutation turns out infeasible is replaced by a different
/// elite up to `max_elite_redraws` times before the error propagates.
pub fn breed<R: Rng>(
    rng: &mut R,
    elites: &[Allocation],
    count: usize,
    repetitions: usize,
    config: &Config,
) -> Result<Vec<Allocation>> {
    if elites.is_empty() && count > 0 {
        return Err(Error::configuration("cannot breed without elites"));
    }
    let bounds = config.bounds();
    (0..count)
        .map(|_| {
            let mut redraws = 0;
            let mut chosen = rng.gen_range(0..elites.len());
            loop {
                match repeat_mutation(rng, &elites[chosen], config.mutation_policy, &bounds, repetitions) {
                    Ok(child) => return Ok(child),
                    Err(error @ Error::InfeasibleMutation { .. })
                        if redraws < config.max_elite_redraws && elites.len() > 1 =>
                    {
                        redraws += 1;
                        warn!(%error, redraws, "redrawing elite");
                        // skip over the elite that just failed
                        let other = rng.gen_range(0..elites.len() - 1);
                        chosen = if other >= chosen { other + 1 } else { other };
                    }
                    Err(error) => return Err(error),
                }
            }
        })
        .collect()
}

fn log_generation(config: &Config, iteration: usize, repetitions: usize, scores: &[f64]) {
    let best = scores.first().copied().unwrap_or(f64::NAN);
    let worst = scores.last().copied().unwrap_or(f64::NAN);
    if config.progress {
        info!(iteration, repetitions, best, worst, "generation ranked");
    } else {
        debug!(iteration, repetitions, best, worst, "generation ranked");
    }
}

/// Population local search over allocations of `num_stations` stations.
///
/// Each generation ranks the population, keeps the best `keep_size`
/// allocations and refills the rest with mutated elites, applying as many
/// successive mutations as the annealing schedule allows. A final ranking
/// picks the result. The run is fully determined by `config.seed`.
#[instrument(skip_all, fields(num_stations = num_stations, seed = config.seed))]
pub fn optimise<E: BatchEvaluator + ?Sized>(
    num_stations: usize,
    config: &Config,
    evaluator: &E,
) -> Result<OptimisationResult> {
    config.validate(num_stations)?;
    info!(
        population_size = config.population_size,
        keep_size = config.keep_size,
        iterations = config.number_of_iterations,
        policy = ?config.mutation_policy,
        "starting optimisation"
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut population = create_initial_population(&mut rng, config, num_stations)?;
    let schedule = repetition_schedule(
        config.number_of_iterations,
        config.initial_mutation_repetitions,
        config.cooling_rate,
    );

    let mut history = Vec::with_capacity(config.number_of_iterations * config.population_size);
    for (iteration, &repetitions) in schedule.iter().enumerate() {
        let (ranked, scores) = rank_population(population, evaluator)?;
        log_generation(config, iteration, repetitions, &scores);
        history.extend_from_slice(&scores);

        let mut next = ranked;
        next.truncate(config.keep_size);
        let children = breed(
            &mut rng,
            &next,
            config.population_size - config.keep_size,
            repetitions,
            config,
        )?;
        next.extend(children);
        population = next;
    }

    let (population, scores) = rank_population(population, evaluator)?;
    let history_shape = (config.number_of_iterations, config.population_size);
    let history_len = history.len();
    let history = Array2::from_shape_vec(history_shape, history)
        .map_err(|_| Error::shape("score history", history_shape, history_len))?;
    let best = population
        .first()
        .cloned()
        .ok_or_else(|| Error::configuration("empty population"))?;
    let best_objective = scores[0];
    let cache_size = evaluator.cache_size();

    info!(best_objective, cache_size, "optimisation finished");
    Ok(OptimisationResult {
        best,
        best_objective,
        population,
        scores,
        history,
        cache_size,
    })
}

/// [`optimise`] against the survival objective of `instance`, with the worker
/// pool and cache requested by `config`.
pub fn optimise_instance(
    instance: &Instance,
    model: UtilisationModel,
    config: &Config,
) -> Result<OptimisationResult> {
    config.validate(instance.num_stations())?;
    let mut evaluator = SurvivalEvaluator::new(instance, model)?.with_workers(config.num_workers)?;
    if config.use_cache {
        evaluator = evaluator.with_cache(ObjectiveCache::new());
    }
    optimise(instance.num_stations(), config, &evaluator)
}
