use crate::cache::ObjectiveCache;
use ems_model::{objective::survival_objective, Allocation, Error, Instance, Result, UtilisationModel};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

/// Scores a whole population. Scores come back in input order.
pub trait BatchEvaluator {
    fn evaluate_batch(&self, population: &[Allocation]) -> Result<Vec<f64>>;

    /// Distinct allocations scored so far, when the evaluator remembers them.
    fn cache_size(&self) -> usize {
        0
    }
}

/// Sequential evaluator around any scoring function.
pub struct FnEvaluator<F>(pub F);

impl<F> BatchEvaluator for FnEvaluator<F>
where
    F: Fn(&Allocation) -> Result<f64>,
{
    fn evaluate_batch(&self, population: &[Allocation]) -> Result<Vec<f64>> {
        population.iter().map(|allocation| (self.0)(allocation)).collect()
    }
}

/// Survival objective of one instance, optionally memoised and spread over a
/// dedicated rayon pool.
pub struct SurvivalEvaluator<'a> {
    instance: &'a Instance,
    model: UtilisationModel,
    cache: Option<ObjectiveCache>,
    pool: Option<ThreadPool>,
}

impl<'a> SurvivalEvaluator<'a> {
    pub fn new(instance: &'a Instance, model: UtilisationModel) -> Result<Self> {
        model.validate(instance.num_stations())?;
        Ok(Self {
            instance,
            model,
            cache: None,
            pool: None,
        })
    }

    pub fn with_cache(mut self, cache: ObjectiveCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Evaluates batches on `num_workers` threads; a single worker stays on
    /// the calling thread.
    pub fn with_workers(mut self, num_workers: usize) -> Result<Self> {
        if num_workers == 0 {
            return Err(Error::configuration("num_workers must be at least 1"));
        }
        self.pool = if num_workers == 1 {
            None
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(num_workers)
                .thread_name(|i| format!("ems-evaluator-{}", i))
                .build()
                .map_err(|e| Error::configuration(e.to_string()))?;
            Some(pool)
        };
        Ok(self)
    }

    pub fn cache(&self) -> Option<&ObjectiveCache> {
        self.cache.as_ref()
    }

    pub fn evaluate(&self, allocation: &Allocation) -> Result<f64> {
        match &self.cache {
            Some(cache) => cache.get_or_insert_with(allocation, || {
                survival_objective(self.instance, allocation, &self.model)
            }),
            None => survival_objective(self.instance, allocation, &self.model),
        }
    }
}

impl BatchEvaluator for SurvivalEvaluator<'_> {
    fn evaluate_batch(&self, population: &[Allocation]) -> Result<Vec<f64>> {
        match &self.pool {
            Some(pool) => pool.install(|| {
                population
                    .par_iter()
                    .map(|allocation| self.evaluate(allocation))
                    .collect()
            }),
            None => population
                .iter()
                .map(|allocation| self.evaluate(allocation))
                .collect(),
        }
    }

    fn cache_size(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.len())
    }
}
