/// `H:MM:SS` from one hour on, `M:SS` below.
pub fn format_elapsed(elapsed_s: u64) -> String {
    let hours = elapsed_s / 3600;
    let minutes = (elapsed_s % 3600) / 60;
    let seconds = elapsed_s % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Kilometers with two decimals, no unit.
pub fn format_distance_km(distance_m: f64) -> String {
    format!("{:.2}", distance_m / 1000.0)
}

/// Minutes per kilometer, 0 when nothing was covered.
pub fn pace_min_per_km(elapsed_s: u64, distance_m: f64) -> f64 {
    if distance_m <= 0.0 {
        return 0.0;
    }
    (elapsed_s as f64 / 60.0) / (distance_m / 1000.0)
}

/// Pace as `M:SS`, `0:00` when distance is 0.
pub fn format_pace(elapsed_s: u64, distance_m: f64) -> String {
    let pace = pace_min_per_km(elapsed_s, distance_m);
    let minutes = pace.floor();
    let seconds = ((pace - minutes) * 60.0).floor();
    format!("{}:{:02}", minutes as u64, seconds as u64)
}
