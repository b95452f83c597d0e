use crate::Coordinate;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters.
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

pub fn path_length_m(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_m(w[0], w[1])).sum()
}
