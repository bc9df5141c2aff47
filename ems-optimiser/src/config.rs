use crate::mutation::{Bounds, MutationPolicy};
use ems_model::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub num_primary_vehicles: u32,
    pub num_secondary_vehicles: u32,
    pub max_primary: u32,
    pub max_secondary: u32,
    pub population_size: usize,
    pub keep_size: usize,
    pub number_of_iterations: usize,
    pub initial_mutation_repetitions: usize,
    pub cooling_rate: f64,
    pub primary_to_secondary_ratio: u32,
    pub mutation_policy: MutationPolicy,
    pub randomise_vehicle_numbers: bool,
    pub max_elite_redraws: usize,
    pub use_cache: bool,
    pub num_workers: usize,
    pub seed: u64,
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_primary_vehicles: 81,
            num_secondary_vehicles: 13,
            max_primary: 10,
            max_secondary: 10,
            population_size: 240,
            keep_size: 40,
            number_of_iterations: 500,
            initial_mutation_repetitions: 6,
            cooling_rate: 0.25,
            primary_to_secondary_ratio: 3,
            mutation_policy: MutationPolicy::RetainCounts,
            randomise_vehicle_numbers: false,
            max_elite_redraws: 3,
            use_cache: true,
            num_workers: 1,
            seed: 0,
            progress: false,
        }
    }
}

impl Config {
    /// Defaults with every key of `overrides` replaced.
    pub fn initialize(overrides: &Option<Map<String, Value>>) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())
            .map_err(|e| Error::configuration(e.to_string()))?;
        if let (Value::Object(ref mut obj), Some(map)) = (&mut merged, overrides) {
            for (k, v) in map {
                obj.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(merged).map_err(|e| Error::configuration(e.to_string()))
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            max_primary: self.max_primary,
            max_secondary: self.max_secondary,
            ratio: self.primary_to_secondary_ratio,
        }
    }

    /// Largest primary and secondary totals a candidate can be created with.
    fn largest_totals(&self) -> (u64, u64) {
        let primary = self.num_primary_vehicles as u64;
        let secondary = self.num_secondary_vehicles as u64;
        if !self.randomise_vehicle_numbers || self.primary_to_secondary_ratio == 0 {
            return (primary, secondary);
        }
        let ratio = self.primary_to_secondary_ratio as u64;
        let equivalent = primary + secondary / ratio;
        let fewest_primary = (3 * equivalent).div_ceil(4);
        (equivalent, (equivalent - fewest_primary) * ratio)
    }

    pub fn validate(&self, num_stations: usize) -> Result<()> {
        if num_stations == 0 {
            return Err(Error::configuration("there must be at least one station"));
        }
        if self.population_size == 0 {
            return Err(Error::configuration("population_size must be at least 1"));
        }
        if self.keep_size == 0 {
            return Err(Error::configuration("keep_size must be at least 1"));
        }
        if self.keep_size >= self.population_size {
            return Err(Error::configuration(format!(
                "keep_size ({}) must be smaller than population_size ({})",
                self.keep_size, self.population_size
            )));
        }
        if !(self.cooling_rate.is_finite() && self.cooling_rate > 0.0) {
            return Err(Error::configuration(format!(
                "cooling_rate must be positive, got {}",
                self.cooling_rate
            )));
        }
        if self.initial_mutation_repetitions == 0 {
            return Err(Error::configuration(
                "initial_mutation_repetitions must be at least 1",
            ));
        }
        if self.primary_to_secondary_ratio == 0 {
            return Err(Error::configuration(
                "primary_to_secondary_ratio must be at least 1",
            ));
        }
        if self.num_workers == 0 {
            return Err(Error::configuration("num_workers must be at least 1"));
        }

        let (primary, secondary) = self.largest_totals();
        let primary_places = self.max_primary as u64 * num_stations as u64;
        let secondary_places = self.max_secondary as u64 * num_stations as u64;
        if primary > primary_places {
            return Err(Error::configuration(format!(
                "{} primary vehicles do not fit in {} stations of {}",
                primary, num_stations, self.max_primary
            )));
        }
        if secondary > secondary_places {
            return Err(Error::configuration(format!(
                "{} secondary vehicles do not fit in {} stations of {}",
                secondary, num_stations, self.max_secondary
            )));
        }
        Ok(())
    }
}
