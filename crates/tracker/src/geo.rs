use model::Position;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two lat/lon points (degrees).
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Finite and within ±90 latitude / ±180 longitude.
pub fn is_valid_position(p: &Position) -> bool {
    p.latitude.is_finite() && p.longitude.is_finite() && p.latitude.abs() <= 90.0 && p.longitude.abs() <= 180.0
}

pub fn distance_m(a: &Position, b: &Position) -> f64 {
    haversine_m(a.latitude, a.longitude, b.latitude, b.longitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_valid_position_bounds() {
        let p = |latitude, longitude| Position { latitude, longitude, timestamp_ms: 0 };
        assert!(is_valid_position(&p(-90.0, 180.0)));
        assert!(!is_valid_position(&p(f64::NAN, 0.0)));
        assert!(!is_valid_position(&p(0.0, f64::INFINITY)));
        assert!(!is_valid_position(&p(90.5, 0.0)));
        assert!(!is_valid_position(&p(0.0, -181.0)));
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let expected = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        let d = haversine_m(10.0, 20.0, 11.0, 20.0);
        assert_relative_eq!(d, expected, max_relative = 0.001);
        assert!((d - 111_195.0).abs() < 1.0);
    }

    #[test]
    fn test_symmetric_and_zero() {
        let a = haversine_m(1.2098, -77.2765, 1.2150, -77.2800);
        let b = haversine_m(1.2150, -77.2800, 1.2098, -77.2765);
        assert_relative_eq!(a, b, epsilon = 1e-9);
        assert_eq!(haversine_m(45.0, 7.0, 45.0, 7.0), 0.0);
    }

    #[test]
    fn test_longitude_shrinks_with_latitude() {
        let equator = haversine_m(0.0, 0.0, 0.0, 1.0);
        let north = haversine_m(60.0, 0.0, 60.0, 1.0);
        assert_relative_eq!(north / equator, 0.5, max_relative = 0.001);
    }
}
