use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Distance,
    Time,
    Speed,
    Consistency,
    Special,
}

/// Static description of an achievement. `requirement` is in the unit
/// the achievement measures (meters, seconds, km/h, days, count, kcal).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AchievementDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: AchievementCategory,
    pub requirement: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: AchievementCategory,
    pub requirement: f64,
    pub unlocked: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub unlocked_at: Option<OffsetDateTime>,
    /// 0..=100
    pub progress: f64,
}

impl From<&AchievementDef> for Achievement {
    fn from(d: &AchievementDef) -> Self {
        Self {
            id: d.id.into(),
            title: d.title.into(),
            description: d.description.into(),
            category: d.category,
            requirement: d.requirement,
            unlocked: false,
            unlocked_at: None,
            progress: 0.0,
        }
    }
}

const fn def(
    id: &'static str,
    title: &'static str,
    description: &'static str,
    category: AchievementCategory,
    requirement: f64,
) -> AchievementDef {
    AchievementDef { id, title, description, category, requirement }
}

use AchievementCategory::*;

pub const ACHIEVEMENTS: &[AchievementDef] = &[
    def("first-run", "First Run", "Complete your first running session", Distance, 1.0),
    def("5km-runner", "5K Runner", "Cover 5 kilometers in a single session", Distance, 5000.0),
    def("10km-runner", "10K Runner", "Cover 10 kilometers in a single session", Distance, 10000.0),
    def("half-marathon", "Half Marathon", "Cover 21.1 kilometers in a single session", Distance, 21100.0),
    def("marathon", "Marathoner", "Cover 42.2 kilometers in a single session", Distance, 42200.0),
    def("100km-total", "Centurion", "Accumulate 100 kilometers in total", Distance, 100000.0),
    def("30min-run", "Half Hour", "Run for 30 consecutive minutes", Time, 1800.0),
    def("1hour-run", "The Hour", "Run for 1 consecutive hour", Time, 3600.0),
    def("10hours-total", "Dedication", "Accumulate 10 hours of running in total", Time, 36000.0),
    def("3-day-streak", "Getting Consistent", "Run 3 days in a row", Consistency, 3.0),
    def("7-day-streak", "Perfect Week", "Run 7 days in a row", Consistency, 7.0),
    def("30-day-streak", "Solid Habit", "Run 30 days in a row", Consistency, 30.0),
    def("100-sessions", "Veteran", "Complete 100 running sessions", Consistency, 100.0),
    def("speed-5kmh", "Trotter", "Reach a speed of 5 km/h", Speed, 5.0),
    def("speed-10kmh", "Runner", "Reach a speed of 10 km/h", Speed, 10.0),
    def("speed-15kmh", "Sprinter", "Reach a speed of 15 km/h", Speed, 15.0),
    def("speed-20kmh", "Lightning", "Reach a speed of 20 km/h", Speed, 20.0),
    def("early-bird", "Early Bird", "Run before 6:00 AM", Special, 1.0),
    def("night-runner", "Night Owl", "Run after 10:00 PM", Special, 1.0),
    def("rainy-day", "Unstoppable", "Run on a rainy day", Special, 1.0),
    def("1000-calories", "Burner", "Burn 1000 calories in one session", Special, 1000.0),
];

pub fn find_achievement(id: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|d| d.id == id)
}
