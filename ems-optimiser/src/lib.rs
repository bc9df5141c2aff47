use ahash::RandomState;
pub(crate) type HashMap<K, V> = std::collections::HashMap<K, V, RandomState>;

pub mod cache;
pub use cache::ObjectiveCache;
pub mod config;
pub use config::Config;
pub mod evaluation;
pub use evaluation::{BatchEvaluator, FnEvaluator, SurvivalEvaluator};
pub mod mutation;
pub use mutation::{Bounds, MutationPolicy, Operator};
pub mod optimiser;
pub use optimiser::{breed, optimise, optimise_instance, OptimisationResult};
pub mod population;
pub mod schedule;
