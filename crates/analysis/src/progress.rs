//! Running totals of planned routes against a daily distance goal.

use model::{DailyProgress, RouteData};

const KCAL_PER_KM: f64 = 50.0;

/// Adds a planned route; returns the calories credited for it.
pub fn add_route(p: &mut DailyProgress, distance_km: f64, duration_min: f64) -> u32 {
    let calories = (distance_km * KCAL_PER_KM).round().max(0.0) as u32;
    p.total_distance_m += distance_km * 1000.0;
    p.total_time_min += duration_min;
    p.total_calories += calories;
    calories
}

pub fn add_planned(p: &mut DailyProgress, route: &RouteData) -> u32 {
    add_route(p, route.distance_km, route.duration_min)
}

pub fn set_goal(p: &mut DailyProgress, goal_m: f64) {
    p.goal_m = goal_m;
}

/// Clears the totals, keeps the goal.
pub fn reset(p: &mut DailyProgress) {
    *p = DailyProgress { goal_m: p.goal_m, ..DailyProgress::default() };
}

pub fn percent(p: &DailyProgress) -> f64 {
    if p.goal_m <= 0.0 {
        return 0.0;
    }
    (p.total_distance_m / p.goal_m * 100.0).min(100.0)
}

pub fn remaining_m(p: &DailyProgress) -> f64 {
    (p.goal_m - p.total_distance_m).max(0.0)
}
