use crate::{Error, Result};
use ndarray::{Array2, Array3};

/// Same-type precedence ("beta"), shaped `[pickup][station_a][station_b]`.
///
/// `beta[[p, a, b]]` is true when a vehicle from station `a` reaches pickup `p`
/// before a vehicle of the same type from station `b`. Equal travel times go
/// to the lower station index, so exactly one of `beta[[p, a, b]]` and
/// `beta[[p, b, a]]` holds for `a != b`, and the diagonal is always false.
/// Both vehicle types travel at a constant multiple of the raw travel times,
/// so one table serves both.
pub fn station_precedence(travel_times: &Array2<f64>) -> Array3<bool> {
    let (num_stations, num_pickups) = travel_times.dim();
    Array3::from_shape_fn((num_pickups, num_stations, num_stations), |(p, a, b)| {
        let (ta, tb) = (travel_times[[a, p]], travel_times[[b, p]]);
        ta < tb || (ta == tb && a < b)
    })
}

/// Cross-type precedence ("R"), shaped `[pickup][primary_station][secondary_station]`.
///
/// `r[[p, a, b]]` is true when a primary vehicle from `a` reaches pickup `p`
/// no later than a secondary vehicle from `b`.
pub fn vehicle_type_precedence(
    primary_travel_times: &Array2<f64>,
    secondary_travel_times: &Array2<f64>,
) -> Result<Array3<bool>> {
    if primary_travel_times.dim() != secondary_travel_times.dim() {
        return Err(Error::shape(
            "secondary travel times",
            primary_travel_times.dim(),
            secondary_travel_times.dim(),
        ));
    }
    let (num_stations, num_pickups) = primary_travel_times.dim();
    Ok(Array3::from_shape_fn(
        (num_pickups, num_stations, num_stations),
        |(p, a, b)| primary_travel_times[[a, p]] <= secondary_travel_times[[b, p]],
    ))
}
