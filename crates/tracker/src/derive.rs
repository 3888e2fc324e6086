//! Pure derivations used by the accumulator. All guard their divisors and
//! return 0 for the boundary cases.

use model::ExperienceLevel;

/// km/h from a distance covered over a time delta in milliseconds.
pub fn speed_kmh(distance_m: f64, dt_ms: i64) -> f64 {
    if dt_ms <= 0 {
        return 0.0;
    }
    let hours = dt_ms as f64 / 1000.0 / 3600.0;
    (distance_m / 1000.0) / hours
}

pub fn average_speed_kmh(distance_m: f64, elapsed_s: u64) -> f64 {
    if elapsed_s == 0 {
        return 0.0;
    }
    (distance_m / 1000.0) / (elapsed_s as f64 / 3600.0)
}

pub fn steps_estimate(distance_m: f64, stride_length_m: f64) -> u32 {
    if stride_length_m <= 0.0 {
        return 0;
    }
    (distance_m / stride_length_m).floor() as u32
}

pub fn calories_kcal(distance_m: f64, body_weight_kg: f64, level: ExperienceLevel) -> u32 {
    ((distance_m / 1000.0) * body_weight_kg * level.calorie_multiplier()).floor() as u32
}
