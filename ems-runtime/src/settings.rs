use anyhow::{anyhow, Result};
use ems_model::{Instance, SpeedRatios, SurvivalCurve, UtilisationModel};
use ems_optimiser::Config;
use ems_utils::{read_matrix, read_vector};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

fn default_demand_time_scale() -> f64 {
    1440.0
}

fn default_weights_single_vehicle() -> Vec<f64> {
    vec![0.0, 0.0, 1.0]
}

fn default_weights_multiple_vehicles() -> Vec<f64> {
    vec![1.0, 1.0, 0.0]
}

/// Per-station utilisations measured elsewhere, one value per station.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UtilisationFiles {
    pub primary: PathBuf,
    pub secondary: PathBuf,
}

/// One experiment: where the data lives and how to model it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExperimentSettings {
    /// Raw travel times in minutes, one row per station, one column per pickup location.
    pub travel_times: PathBuf,
    /// Demand per patient type (rows) and pickup location (columns).
    pub demand: PathBuf,
    /// Name used in result file names; defaults to the demand file stem.
    #[serde(default)]
    pub demand_scenario: Option<String>,
    /// Demand is divided by this to get rates per minute.
    #[serde(default = "default_demand_time_scale")]
    pub demand_time_scale: f64,
    #[serde(default)]
    pub speeds: SpeedRatios,
    #[serde(default = "SurvivalCurve::defaults")]
    pub survival_curves: Vec<SurvivalCurve>,
    #[serde(default = "default_weights_single_vehicle")]
    pub weights_single_vehicle: Vec<f64>,
    #[serde(default = "default_weights_multiple_vehicles")]
    pub weights_multiple_vehicles: Vec<f64>,
    #[serde(default)]
    pub utilisation: UtilisationModel,
    /// Takes precedence over `utilisation` when set.
    #[serde(default)]
    pub utilisation_files: Option<UtilisationFiles>,
    /// Overrides for [`Config`].
    #[serde(default)]
    pub optimiser: Option<Map<String, Value>>,
}

impl ExperimentSettings {
    pub fn load_instance(&self) -> Result<Instance> {
        if !(self.demand_time_scale.is_finite() && self.demand_time_scale > 0.0) {
            return Err(anyhow!(
                "demand_time_scale must be positive, got {}",
                self.demand_time_scale
            ));
        }
        let travel_times = read_matrix(&self.travel_times)?;
        let demand_rates = read_matrix(&self.demand)? / self.demand_time_scale;
        Ok(Instance::from_travel_times(
            &travel_times,
            &self.speeds,
            &self.survival_curves,
            demand_rates,
            Array1::from(self.weights_single_vehicle.clone()),
            Array1::from(self.weights_multiple_vehicles.clone()),
        )?)
    }

    pub fn utilisation_model(&self) -> Result<UtilisationModel> {
        match &self.utilisation_files {
            Some(files) => Ok(UtilisationModel::Given {
                primary: read_vector(&files.primary)?.to_vec(),
                secondary: read_vector(&files.secondary)?.to_vec(),
            }),
            None => Ok(self.utilisation.clone()),
        }
    }

    /// Optimiser configuration with command line overrides applied last.
    pub fn optimiser_config(&self, workers: Option<usize>, seed: Option<u64>) -> Result<Config> {
        let mut config = Config::initialize(&self.optimiser)?;
        if let Some(workers) = workers {
            config.num_workers = workers;
        }
        if let Some(seed) = seed {
            config.seed = seed;
        }
        Ok(config)
    }

    pub fn scenario(&self) -> String {
        self.demand_scenario.clone().unwrap_or_else(|| {
            self.demand
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    /// `demand=<scenario>_primary=<n>_secondary=<m>`
    pub fn tag(&self, config: &Config) -> String {
        format!(
            "demand={}_primary={}_secondary={}",
            self.scenario(),
            config.num_primary_vehicles,
            config.num_secondary_vehicles
        )
    }
}
