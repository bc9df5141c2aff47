use ems_model::{Allocation, Error};
use ems_optimiser::population::*;
use ems_optimiser::{Config, FnEvaluator};
use rand::{rngs::StdRng, SeedableRng};

fn small_config() -> Config {
    Config {
        num_primary_vehicles: 8,
        num_secondary_vehicles: 12,
        max_primary: 3,
        max_secondary: 4,
        population_size: 15,
        keep_size: 5,
        ..Config::default()
    }
}

#[test]
fn test_initial_population_respects_totals_and_caps() {
    let config = small_config();
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let population = create_initial_population(&mut rng, &config, 6).unwrap();
        assert_eq!(population.len(), 15);
        for allocation in population.iter() {
            assert_eq!(allocation.num_stations(), 6);
            assert_eq!(allocation.total_primary(), 8);
            assert_eq!(allocation.total_secondary(), 12);
            assert!(allocation.primary().iter().all(|&z| z <= 3));
            assert!(allocation.secondary().iter().all(|&z| z <= 4));
        }
    }
}

#[test]
fn test_scatter_vehicles() {
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(scatter_vehicles(&mut rng, 3, 6, 2).unwrap(), vec![2, 2, 2]);
    assert_eq!(scatter_vehicles(&mut rng, 3, 0, 0).unwrap(), vec![0, 0, 0]);
    assert!(matches!(
        scatter_vehicles(&mut rng, 3, 7, 2),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_randomised_vehicle_numbers() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..200 {
        // 20 + 12 / 3 = 24 primary equivalents
        let (primary, secondary) = randomise_vehicle_numbers(&mut rng, 20, 12, 3);
        assert!((18..=24).contains(&primary));
        assert_eq!(secondary, (24 - primary) * 3);
    }

    let config = Config {
        randomise_vehicle_numbers: true,
        max_secondary: 10,
        ..small_config()
    };
    let mut rng = StdRng::seed_from_u64(2);
    let population = create_initial_population(&mut rng, &config, 6).unwrap();
    for allocation in population.iter() {
        assert_eq!(allocation.primary_equivalent(3), 12.0);
        assert!(allocation.total_primary() >= 9);
    }
}

#[test]
fn test_rank_population() {
    let population: Vec<Allocation> = [1u32, 4, 2, 4, 0]
        .iter()
        .enumerate()
        .map(|(i, &z)| Allocation::new(vec![z, i as u32], vec![0, 0]).unwrap())
        .collect();
    let evaluator = FnEvaluator(|allocation: &Allocation| -> ems_model::Result<f64> {
        Ok(allocation.primary()[0] as f64)
    });
    let (ranked, scores) = rank_population(population, &evaluator).unwrap();
    assert_eq!(scores, vec![4.0, 4.0, 2.0, 1.0, 0.0]);
    // ties keep their input order
    assert_eq!(ranked[0].primary(), &[4, 1]);
    assert_eq!(ranked[1].primary(), &[4, 3]);
    assert_eq!(ranked[4].primary(), &[0, 4]);
}

#[test]
fn test_rank_population_propagates_errors() {
    let population = vec![Allocation::zeros(2)];
    let evaluator = FnEvaluator(|_: &Allocation| -> ems_model::Result<f64> {
        Err(Error::configuration("unavailable"))
    });
    assert!(rank_population(population, &evaluator).is_err());
}
