use ems_model::objective::survival_objective;
use ems_model::utilisation::proportional;
use ems_model::{
    Allocation, Error, Instance, SelfConsistentSolver, SpeedRatios, SurvivalCurve,
    UtilisationModel, Utilisations,
};
use ndarray::{array, Array2};

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-12, "{} != {}", a, b);
}

fn five_station_instance() -> Instance {
    let travel_times = Array2::from_shape_fn((5, 5), |(s, p)| 1.0 + 4.0 * (s as f64 - p as f64).abs() + 0.2 * s as f64);
    let demand_rates = Array2::from_shape_fn((3, 5), |(t, _)| [0.1, 0.2, 0.3][t]);
    Instance::from_travel_times(
        &travel_times,
        &SpeedRatios::default(),
        &SurvivalCurve::defaults(),
        demand_rates,
        array![0.0, 0.0, 1.0],
        array![1.0, 1.0, 0.0],
    )
    .unwrap()
}

fn allocation() -> Allocation {
    Allocation::new(vec![0, 1, 2, 0, 2], vec![0, 1, 2, 0, 2]).unwrap()
}

#[test]
fn test_proportional() {
    let instance = five_station_instance();
    let utilisations = UtilisationModel::Proportional {
        service_rate_primary: 10.0,
        service_rate_secondary: 10.0,
        ceiling: 0.99,
    }
    .utilisations(&instance, &allocation())
    .unwrap();

    for (u, expected) in utilisations.primary.iter().zip([0.0, 0.3, 0.15, 0.0, 0.15]) {
        assert_close(*u, expected);
    }
    for (u, expected) in utilisations.secondary.iter().zip([0.0, 0.15, 0.075, 0.0, 0.075]) {
        assert_close(*u, expected);
    }
}

#[test]
fn test_proportional_flooding() {
    let instance = five_station_instance();
    let utilisations = proportional(&instance, &allocation(), 0.001, 0.001, 0.99);
    for u in utilisations.primary.iter().chain(utilisations.secondary.iter()) {
        assert!(*u == 0.0 || *u == 0.99);
    }
    assert_eq!(utilisations.primary[2], 0.99);
    assert_eq!(utilisations.primary[0], 0.0);
}

#[test]
fn test_constant_and_given() {
    let instance = five_station_instance();
    let utilisations = UtilisationModel::Constant {
        primary: 0.2,
        secondary: 0.4,
    }
    .utilisations(&instance, &allocation())
    .unwrap();
    assert_eq!(utilisations, Utilisations::constant(5, 0.2, 0.4));

    let given = UtilisationModel::Given {
        primary: vec![0.1, 0.2, 0.3, 0.4, 0.5],
        secondary: vec![0.0; 5],
    };
    let utilisations = given.utilisations(&instance, &allocation()).unwrap();
    assert_eq!(utilisations.primary, array![0.1, 0.2, 0.3, 0.4, 0.5]);

    let short = UtilisationModel::Given {
        primary: vec![0.1; 4],
        secondary: vec![0.0; 5],
    };
    assert!(matches!(
        short.utilisations(&instance, &allocation()),
        Err(Error::InputShape { .. })
    ));

    let invalid = UtilisationModel::Constant {
        primary: 1.5,
        secondary: 0.0,
    };
    assert!(matches!(
        invalid.utilisations(&instance, &allocation()),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_self_consistent_converges_below_proportional() {
    let instance = five_station_instance();
    let solver = SelfConsistentSolver::new(10.0, 10.0);
    let solved = solver.solve(&instance, &allocation()).unwrap();
    assert!(solved.check().is_ok());
    assert!(solved.residual < solver.tolerance);

    let estimate = proportional(&instance, &allocation(), 10.0, 10.0, 0.99);
    for (u, upper) in solved.utilisations.primary.iter().zip(estimate.primary.iter()) {
        assert!(*u >= 0.0 && *u <= *upper + 1e-12);
    }
    for (u, upper) in solved.utilisations.secondary.iter().zip(estimate.secondary.iter()) {
        assert!(*u >= 0.0 && *u <= *upper + 1e-12);
    }
    assert_eq!(solved.utilisations.primary[0], 0.0);
    assert_eq!(solved.utilisations.secondary[3], 0.0);
}

fn with_one_more(base: &Allocation, station: usize, primary: bool) -> Allocation {
    let (mut primaries, mut secondaries) = base.clone().into_parts();
    if primary {
        primaries[station] += 1;
    } else {
        secondaries[station] += 1;
    }
    Allocation::new(primaries, secondaries).unwrap()
}

fn assert_converges_and_monotone(instance: &Instance, base: &Allocation, service_rate: f64) {
    let solver = SelfConsistentSolver::new(service_rate, service_rate);
    let model = UtilisationModel::SelfConsistent(solver.clone());
    assert!(solver.solve(instance, base).unwrap().check().is_ok());
    let base_value = survival_objective(instance, base, &model).unwrap();

    for station in 0..base.num_stations() {
        for primary in [true, false] {
            let more = with_one_more(base, station, primary);
            assert!(solver.solve(instance, &more).unwrap().check().is_ok());
            let value = survival_objective(instance, &more, &model).unwrap();
            assert!(
                value >= base_value - 1e-9,
                "rate {}: extra {} vehicle at station {} lowers {} to {}",
                service_rate,
                if primary { "primary" } else { "secondary" },
                station,
                base_value,
                value
            );
        }
    }
}

#[test]
fn test_self_consistent_at_moderate_load() {
    let instance = five_station_instance();
    let base = Allocation::new(vec![1, 0, 2, 1, 0], vec![0, 2, 0, 1, 1]).unwrap();
    for service_rate in [0.02, 0.05, 0.1, 0.5] {
        let solved = SelfConsistentSolver::new(service_rate, service_rate)
            .solve(&instance, &base)
            .unwrap();
        assert!(solved.check().is_ok(), "rate {} residual {}", service_rate, solved.residual);
        assert!(solved.iterations < 100);
        for u in solved.utilisations.primary.iter().chain(solved.utilisations.secondary.iter()) {
            assert!(*u >= 0.0 && *u <= 0.99);
        }
        assert_converges_and_monotone(&instance, &base, service_rate);
    }
}

#[test]
fn test_self_consistent_monotone_with_tied_stations() {
    // stations 0 and 1 are equally far from every pickup, station 2 ties at pickup 2
    let travel_times = array![[5.0, 8.0, 3.0], [5.0, 8.0, 3.0], [5.0, 2.0, 3.0], [9.0, 2.0, 3.0]];
    let instance = Instance::from_travel_times(
        &travel_times,
        &SpeedRatios::default(),
        &SurvivalCurve::defaults(),
        array![[0.01, 0.03, 0.02], [0.02, 0.01, 0.02], [0.03, 0.02, 0.01]],
        array![0.0, 0.0, 1.0],
        array![1.0, 1.0, 0.0],
    )
    .unwrap();
    let base = Allocation::new(vec![1, 1, 0, 1], vec![1, 0, 1, 1]).unwrap();
    for service_rate in [0.02, 0.05] {
        assert_converges_and_monotone(&instance, &base, service_rate);
    }
}

#[test]
fn test_self_consistent_is_idempotent() {
    let instance = five_station_instance();
    let model = UtilisationModel::SelfConsistent(SelfConsistentSolver::new(10.0, 10.0));
    let first = model.utilisations(&instance, &allocation()).unwrap();
    let second = model.utilisations(&instance, &allocation()).unwrap();
    assert!(first.max_difference(&second) < 1e-12);
}

#[test]
fn test_self_consistent_divergence_is_clamped() {
    let instance = five_station_instance();
    let solver = SelfConsistentSolver {
        max_iterations: 1,
        ..SelfConsistentSolver::new(0.5, 0.5)
    };
    let solved = solver.solve(&instance, &allocation()).unwrap();
    assert!(matches!(
        solved.check(),
        Err(Error::NumericDivergence { iterations: 1, .. })
    ));

    let utilisations = UtilisationModel::SelfConsistent(solver)
        .utilisations(&instance, &allocation())
        .unwrap();
    for u in utilisations.primary.iter().chain(utilisations.secondary.iter()) {
        assert!(*u >= 0.0 && *u <= 0.99);
    }
}

#[test]
fn test_self_consistent_flooding() {
    let instance = five_station_instance();
    let model = UtilisationModel::SelfConsistent(SelfConsistentSolver::new(0.001, 0.001));
    let utilisations = model.utilisations(&instance, &allocation()).unwrap();
    for u in utilisations.primary.iter().chain(utilisations.secondary.iter()) {
        assert!(*u >= 0.0 && *u <= 0.99);
    }
}

#[test]
fn test_model_from_json() {
    let model: UtilisationModel = serde_json::from_str(
        r#"{"type": "self_consistent", "service_rate_primary": 0.1, "service_rate_secondary": 0.2, "max_iterations": 50}"#,
    )
    .unwrap();
    match &model {
        UtilisationModel::SelfConsistent(solver) => {
            assert_eq!(solver.max_iterations, 50);
            assert_eq!(solver.ceiling, 0.99);
            assert_eq!(solver.service_rate_secondary, 0.2);
        }
        _ => panic!("unexpected model {:?}", model),
    }

    let model: UtilisationModel = serde_json::from_str(
        r#"{"type": "proportional", "service_rate_primary": 0.1, "service_rate_secondary": 0.2}"#,
    )
    .unwrap();
    assert!(matches!(model, UtilisationModel::Proportional { ceiling, .. } if ceiling == 0.99));
}
