pub const EARTH_RADIUS_KM: f64 = 6372.8;

/// Great-circle distance in km between two (latitude, longitude) pairs given in degrees.
///
/// Rounding can push the haversine term a hair above 1 for nearly antipodal points, which
/// would make `asin` return NaN, so it is clamped.
pub fn haversine_distance(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let d_lat = (p2.0 - p1.0).to_radians();
    let d_lon = (p2.1 - p1.1).to_radians();
    let lat1 = p1.0.to_radians();
    let lat2 = p2.0.to_radians();

    let a = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
    let c = 2. * f64::asin(f64::sqrt(a.min(1.)));

    EARTH_RADIUS_KM * c
}
