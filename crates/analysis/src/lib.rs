//! History analytics: totals, achievements, goals and daily progress.
//!
//! Everything here is a pure function of the session history and a
//! caller-supplied `now`, so calendar boundaries follow `now`'s offset.

pub mod achievements;
pub mod goals;
pub mod progress;
pub mod stats;

pub use achievements::{longest_streak, speed_from_pace, AchievementBook};
pub use goals::{default_goals, goal_percent, step_trend, StepTrend};
pub use stats::{average_pace, MonthlyStats, Totals, WeeklyStats};
