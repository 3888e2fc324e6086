//! Spoken-style progress announcements. Rendering them (speech, toast,
//! log line) is the caller's business; this decides *when* and *what*.

use std::fmt;

use crate::accumulator::SessionRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncerConfig {
    pub enabled: bool,
    /// Announce every N meters; 0 disables.
    pub distance_interval_m: f64,
    /// Announce stats every N minutes; 0 disables.
    pub interval_minutes: u64,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self { enabled: true, distance_interval_m: 1000.0, interval_minutes: 5 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Announcement {
    Start,
    Pause,
    Resume,
    Stop { distance_m: f64, elapsed_s: u64, calories: u32 },
    Distance { km: f64 },
    Stats { distance_m: f64, elapsed_s: u64, speed_kmh: f64, calories: u32 },
    GoalReached(String),
    AchievementUnlocked(String),
}

impl Announcement {
    pub fn stop(record: &SessionRecord) -> Self {
        Announcement::Stop {
            distance_m: record.distance_m,
            elapsed_s: record.elapsed_seconds,
            calories: record.calories_kcal,
        }
    }
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Announcement::Start => f.write_str("Starting session. Good luck!"),
            Announcement::Pause => f.write_str("Session paused"),
            Announcement::Resume => f.write_str("Resuming"),
            Announcement::Stop { distance_m, elapsed_s, calories } => write!(
                f,
                "Session completed. You covered {:.2} kilometers in {} minutes, burning {} calories. Great job!",
                distance_m / 1000.0,
                elapsed_s / 60,
                calories
            ),
            Announcement::Distance { km } => write!(f, "You've completed {} kilometers", km),
            Announcement::Stats { distance_m, elapsed_s, speed_kmh, calories } => write!(
                f,
                "You've covered {:.1} kilometers in {} minutes. Current speed: {:.1} kilometers per hour. Calories burned: {}",
                distance_m / 1000.0,
                elapsed_s / 60,
                speed_kmh,
                calories
            ),
            Announcement::GoalReached(goal) => write!(f, "Congratulations! You've reached your goal of {}", goal),
            Announcement::AchievementUnlocked(name) => write!(f, "New achievement unlocked! {}", name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Announcer {
    cfg: AnnouncerConfig,
    last_distance_m: f64,
    last_elapsed_s: u64,
}

impl Announcer {
    pub fn new(cfg: AnnouncerConfig) -> Self {
        Self { cfg, last_distance_m: 0.0, last_elapsed_s: 0 }
    }

    /// At most one periodic announcement for the current record. Distance
    /// milestones win over timed stats.
    pub fn check(&mut self, record: &SessionRecord) -> Option<Announcement> {
        if !self.cfg.enabled {
            return None;
        }

        let step = self.cfg.distance_interval_m;
        if step > 0.0 {
            let current = (record.distance_m / step).floor();
            let last = (self.last_distance_m / step).floor();
            if current > last {
                self.last_distance_m = record.distance_m;
                return Some(Announcement::Distance { km: current * step / 1000.0 });
            }
        }

        if self.cfg.interval_minutes > 0 {
            let period = self.cfg.interval_minutes * 60;
            if record.elapsed_seconds / period > self.last_elapsed_s / period {
                self.last_elapsed_s = record.elapsed_seconds;
                return Some(Announcement::Stats {
                    distance_m: record.distance_m,
                    elapsed_s: record.elapsed_seconds,
                    speed_kmh: record.current_speed_kmh,
                    calories: record.calories_kcal,
                });
            }
        }
        None
    }

    pub fn reset(&mut self) {
        self.last_distance_m = 0.0;
        self.last_elapsed_s = 0;
    }
}

impl Default for Announcer {
    fn default() -> Self {
        Self::new(AnnouncerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(distance_m: f64, elapsed_seconds: u64) -> SessionRecord {
        SessionRecord { distance_m, elapsed_seconds, current_speed_kmh: 9.5, calories_kcal: 80, ..Default::default() }
    }

    #[test]
    fn test_distance_milestones_once_each() {
        let mut a = Announcer::default();
        assert_eq!(a.check(&rec(900.0, 10)), None);
        assert_eq!(a.check(&rec(1005.0, 20)), Some(Announcement::Distance { km: 1.0 }));
        assert_eq!(a.check(&rec(1500.0, 30)), None);
        assert_eq!(a.check(&rec(2001.0, 40)), Some(Announcement::Distance { km: 2.0 }));
    }

    #[test]
    fn test_stats_every_interval() {
        let mut a = Announcer::new(AnnouncerConfig { distance_interval_m: 0.0, ..Default::default() });
        assert_eq!(a.check(&rec(500.0, 299)), None);
        let ann = a.check(&rec(500.0, 300)).unwrap();
        assert_eq!(
            ann.to_string(),
            "You've covered 0.5 kilometers in 5 minutes. Current speed: 9.5 kilometers per hour. Calories burned: 80"
        );
        assert_eq!(a.check(&rec(600.0, 450)), None);
        assert!(a.check(&rec(700.0, 600)).is_some());
    }

    #[test]
    fn test_distance_wins_and_disabled() {
        let mut a = Announcer::default();
        assert!(matches!(a.check(&rec(1000.0, 300)), Some(Announcement::Distance { .. })));
        assert!(matches!(a.check(&rec(1000.0, 300)), Some(Announcement::Stats { .. })));

        let mut off = Announcer::new(AnnouncerConfig { enabled: false, ..Default::default() });
        assert_eq!(off.check(&rec(5000.0, 3000)), None);

        a.reset();
        assert!(a.check(&rec(1000.0, 0)).is_some());
    }

    #[test]
    fn test_stop_message() {
        let ann = Announcement::stop(&rec(5234.0, 1530));
        assert_eq!(
            ann.to_string(),
            "Session completed. You covered 5.23 kilometers in 25 minutes, burning 80 calories. Great job!"
        );
        assert_eq!(Announcement::Distance { km: 3.0 }.to_string(), "You've completed 3 kilometers");
    }
}
