//! Great-circle distance on a spherical Earth.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two points given in decimal degrees.
///
/// Symmetric, zero for identical points and finite for every finite input,
/// including antipodes where floating-point error can push the haversine term
/// fractionally above one.
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    // Differences of radians, not degrees: subtracting huge degree values overflows.
    let d_phi = phi2 - phi1;
    let d_lambda = lon2.to_radians() - lon1.to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}
