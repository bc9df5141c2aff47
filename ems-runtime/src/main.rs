mod settings;

use anyhow::{anyhow, Result};
use clap::{arg, ArgMatches, Command};
use ems_model::{objective::survival_objective, Allocation};
use ems_optimiser::optimise_instance;
use ems_utils::{jsonify, load_json, write_column, write_matrix};
use serde_json::json;
use settings::ExperimentSettings;
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("ems-runtime")
        .about("Optimises ambulance allocations for expected patient survival")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("optimise")
                .about("Searches for the best allocation and writes the results as csv")
                .arg(
                    arg!(<SETTINGS> "Settings json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--output [OUTPUT_DIR] "Directory the result csv files are written to")
                        .default_value("results")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--workers [WORKERS] "Number of threads evaluating a population")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--seed [SEED] "Seed for the random number generator")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("evaluate")
                .about("Evaluates the survival objective of one allocation")
                .arg(
                    arg!(<SETTINGS> "Settings json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(<ALLOCATION> "Allocation json string, path to json file, or '-' for stdin")
                        .value_parser(clap::value_parser!(String)),
                ),
        )
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a String> {
    matches
        .get_one::<String>(id)
        .ok_or_else(|| anyhow!("Missing argument {}", id))
}

fn run(matches: ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("optimise", sub_m)) => optimise(
            required(sub_m, "SETTINGS")?,
            sub_m
                .get_one::<PathBuf>("output")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("results")),
            sub_m.get_one::<usize>("workers").copied(),
            sub_m.get_one::<u64>("seed").copied(),
        ),
        Some(("evaluate", sub_m)) => evaluate(
            required(sub_m, "SETTINGS")?,
            required(sub_m, "ALLOCATION")?,
        ),
        _ => Err(anyhow!("Invalid subcommand")),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli().get_matches()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

pub fn optimise(
    settings: &str,
    output: PathBuf,
    workers: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let settings: ExperimentSettings = load_json(settings)?;
    let instance = settings.load_instance()?;
    let config = settings.optimiser_config(workers, seed)?;
    info!(
        stations = instance.num_stations(),
        pickups = instance.num_pickups(),
        patient_types = instance.num_patient_types(),
        "instance loaded"
    );

    let result = optimise_instance(&instance, settings.utilisation_model()?, &config)?;

    fs::create_dir_all(&output)?;
    let tag = settings.tag(&config);
    let primary_path = output.join(format!("allocation_primary_{}.csv", tag));
    let secondary_path = output.join(format!("allocation_secondary_{}.csv", tag));
    let history_path = output.join(format!("population_objectives_{}.csv", tag));
    write_column(&primary_path, result.best.primary())?;
    write_column(&secondary_path, result.best.secondary())?;
    write_matrix(&history_path, &result.history)?;
    info!(output = %output.display(), tag = %tag, "results written");

    println!(
        "{}",
        jsonify(&json!({
            "best_objective": result.best_objective,
            "best_objective_scaled": result.best_objective * settings.demand_time_scale,
            "cache_size": result.cache_size,
            "primary": result.best.primary(),
            "secondary": result.best.secondary()
        }))?
    );
    Ok(())
}

pub fn evaluate(settings: &str, allocation: &str) -> Result<()> {
    let settings: ExperimentSettings = load_json(settings)?;
    let instance = settings.load_instance()?;
    let allocation: Allocation = load_json(allocation)?;
    let objective = survival_objective(&instance, &allocation, &settings.utilisation_model()?)?;
    println!(
        "{}",
        jsonify(&json!({
            "objective": objective,
            "objective_scaled": objective * settings.demand_time_scale
        }))?
    );
    Ok(())
}
