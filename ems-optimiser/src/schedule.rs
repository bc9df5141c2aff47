/// Number of successive mutations applied during generation `iteration`.
///
/// Falls linearly from `initial_repetitions` at iteration 0 to 1 after
/// `(initial_repetitions - 1) / cooling_rate` iterations and stays at 1,
/// rounding up along the way.
pub fn repetitions(
    iteration: usize,
    number_of_iterations: usize,
    initial_repetitions: usize,
    cooling_rate: f64,
) -> usize {
    let initial = initial_repetitions.max(1) as f64;
    let steps_to_reach_1 = (initial - 1.0) / cooling_rate;
    let x = iteration.min(number_of_iterations) as f64;
    if steps_to_reach_1 <= 0.0 || x >= steps_to_reach_1 {
        return 1;
    }
    let slope = (1.0 - initial) / steps_to_reach_1;
    ((initial + slope * x).ceil() as usize).max(1)
}

pub fn repetition_schedule(
    number_of_iterations: usize,
    initial_repetitions: usize,
    cooling_rate: f64,
) -> Vec<usize> {
    (0..number_of_iterations)
        .map(|iteration| {
            repetitions(iteration, number_of_iterations, initial_repetitions, cooling_rate)
        })
        .collect()
}
