use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

mod achievements;
pub use achievements::*;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: i64,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    /// Scaling applied to the kcal-per-km-per-kg model.
    pub fn calorie_multiplier(self) -> f64 {
        match self {
            ExperienceLevel::Beginner => 0.80,
            ExperienceLevel::Intermediate => 0.85,
            ExperienceLevel::Advanced => 0.90,
        }
    }

    /// Metabolic equivalent assumed for a run at 10 km/h.
    pub fn met(self) -> f64 {
        match self {
            ExperienceLevel::Beginner => 8.0,
            ExperienceLevel::Intermediate => 9.8,
            ExperienceLevel::Advanced => 11.0,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DailyGoals {
    pub daily_steps: u32,
    pub daily_distance_m: f64,
    pub weekly_runs: u32,
}

impl Default for DailyGoals {
    fn default() -> Self {
        Self { daily_steps: 10_000, daily_distance_m: 3000.0, weekly_runs: 3 }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct UserProfile {
    pub name: String,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: u32,
    pub gender: Gender,
    pub experience_level: ExperienceLevel,
    pub unit_system: UnitSystem,
    #[serde(default)]
    pub goals: DailyGoals,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "Athlete".into(),
            weight_kg: 70.0,
            height_cm: 170.0,
            age: 25,
            gender: Gender::Other,
            experience_level: ExperienceLevel::Beginner,
            unit_system: UnitSystem::Metric,
            goals: DailyGoals::default(),
        }
    }
}

impl UserProfile {
    /// Basal metabolic rate (Mifflin-St Jeor), kcal/day.
    pub fn bmr(&self) -> f64 {
        let base = 10.0 * self.weight_kg + 6.25 * self.height_cm - 5.0 * self.age as f64;
        match self.gender {
            Gender::Male => base + 5.0,
            Gender::Female => base - 161.0,
            Gender::Other => base - 78.0,
        }
    }

    /// kcal burned per km at 10 km/h (0.1 h per km).
    pub fn calories_per_km(&self) -> f64 {
        self.experience_level.met() * self.weight_kg * 0.1
    }

    pub fn format_distance(&self, meters: f64) -> String {
        match self.unit_system {
            UnitSystem::Metric => {
                if meters >= 1000.0 {
                    format!("{:.2} km", meters / 1000.0)
                } else {
                    format!("{:.0} m", meters)
                }
            }
            UnitSystem::Imperial => {
                let miles = meters * 0.000_621_371;
                if miles >= 1.0 {
                    format!("{:.2} mi", miles)
                } else {
                    format!("{:.0} ft", meters * 3.28084)
                }
            }
        }
    }

    pub fn format_speed(&self, kmh: f64) -> String {
        match self.unit_system {
            UnitSystem::Metric => format!("{:.1} km/h", kmh),
            UnitSystem::Imperial => format!("{:.1} mph", kmh * 0.621_371),
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Run,
    Walk,
    Jog,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SessionKind::Run => "Run",
            SessionKind::Walk => "Walk",
            SessionKind::Jog => "Jog",
        })
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RouteTag {
    pub name: String,
    pub difficulty: String,
}

/// A finished session as kept in history.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SessionSummary {
    #[serde(with = "uuid::serde::simple")]
    pub id: Uuid,
    pub kind: SessionKind,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub duration_s: u64,
    pub distance_m: f64,
    pub calories: u32,
    pub avg_pace: String,
    pub steps: u32,
    pub steps_per_minute: f64,
    /// `[lat, lng]` pairs.
    #[serde(default)]
    pub positions: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteTag>,
}

/// Route returned by the routing service. Geometry is `[lng, lat]`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RouteData {
    pub distance_km: f64,
    pub duration_min: f64,
    #[serde(default)]
    pub geometry: Vec<[f64; 2]>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DailyProgress {
    pub total_distance_m: f64,
    pub total_time_min: f64,
    pub total_calories: u32,
    pub goal_m: f64,
}

impl Default for DailyProgress {
    fn default() -> Self {
        Self { total_distance_m: 0.0, total_time_min: 0.0, total_calories: 0, goal_m: 3000.0 }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalKind {
    Distance,
    Steps,
    Time,
    Calories,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalPeriod {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Goal {
    pub id: String,
    pub kind: GoalKind,
    pub target: f64,
    pub current: f64,
    pub period: GoalPeriod,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
}
