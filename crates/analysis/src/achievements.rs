use std::collections::BTreeSet;

use model::{Achievement, AchievementCategory, AchievementDef, SessionSummary, ACHIEVEMENTS};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, UtcOffset};

use crate::stats;

/// The user's achievement state, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementBook {
    entries: Vec<Achievement>,
}

impl Default for AchievementBook {
    fn default() -> Self {
        Self { entries: ACHIEVEMENTS.iter().map(Achievement::from).collect() }
    }
}

impl AchievementBook {
    pub fn entries(&self) -> &[Achievement] {
        &self.entries
    }

    /// Re-check every locked achievement against `sessions`. Updates
    /// progress and returns the ones unlocked by this call.
    pub fn evaluate(&mut self, sessions: &[SessionSummary], now: OffsetDateTime) -> Vec<Achievement> {
        self.sync_catalog();
        if sessions.is_empty() {
            return Vec::new();
        }

        let facts = Facts::gather(sessions, now.offset());
        let mut unlocked = Vec::new();
        for entry in self.entries.iter_mut().filter(|a| !a.unlocked) {
            let Some(current) = facts.measure(&entry.id) else { continue };
            if current >= entry.requirement {
                entry.unlocked = true;
                entry.unlocked_at = Some(now);
                entry.progress = 100.0;
                log::info!("achievement unlocked: {}", entry.id);
                unlocked.push(entry.clone());
            } else {
                entry.progress = progress(current, entry.requirement);
            }
        }
        unlocked
    }

    pub fn unlocked_count(&self) -> usize {
        self.entries.iter().filter(|a| a.unlocked).count()
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Whole-number share of unlocked achievements.
    pub fn percent_unlocked(&self) -> u32 {
        if self.entries.is_empty() {
            return 0;
        }
        (self.unlocked_count() as f64 / self.total() as f64 * 100.0).round() as u32
    }

    pub fn by_category(&self, category: AchievementCategory) -> Vec<&Achievement> {
        self.entries.iter().filter(|a| a.category == category).collect()
    }

    // Stored books may predate catalog additions; append what's missing and
    // keep titles in step with the catalog.
    fn sync_catalog(&mut self) {
        for def in ACHIEVEMENTS {
            match self.entries.iter_mut().find(|a| a.id == def.id) {
                Some(a) => refresh_text(a, def),
                None => self.entries.push(Achievement::from(def)),
            }
        }
    }
}

fn refresh_text(a: &mut Achievement, def: &AchievementDef) {
    a.title = def.title.into();
    a.description = def.description.into();
    a.category = def.category;
    a.requirement = def.requirement;
}

fn progress(current: f64, requirement: f64) -> f64 {
    if requirement <= 0.0 {
        return 0.0;
    }
    (current / requirement * 100.0).clamp(0.0, 100.0)
}

/// Speed in km/h implied by an `M:SS` pace. Malformed or zero pace is 0.
pub fn speed_from_pace(pace: &str) -> f64 {
    let mut parts = pace.trim().splitn(2, ':');
    let minutes: f64 = match parts.next().and_then(|m| m.parse().ok()) {
        Some(m) => m,
        None => return 0.0,
    };
    let seconds: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
    let pace_min = minutes + seconds / 60.0;
    if pace_min > 0.0 {
        60.0 / pace_min
    } else {
        0.0
    }
}

/// Longest run of consecutive calendar days with at least one session.
pub fn longest_streak(sessions: &[SessionSummary], offset: UtcOffset) -> u32 {
    let days: BTreeSet<Date> = sessions.iter().map(|s| s.date.to_offset(offset).date()).collect();
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<Date> = None;
    for d in days {
        run = match prev {
            Some(p) if p.next_day() == Some(d) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(d);
    }
    best
}

struct Facts {
    count: f64,
    max_distance: f64,
    total_distance: f64,
    max_duration: f64,
    total_duration: f64,
    max_speed: f64,
    max_calories: f64,
    streak: f64,
    early: f64,
    late: f64,
}

impl Facts {
    fn gather(sessions: &[SessionSummary], offset: UtcOffset) -> Self {
        let all = stats::totals(sessions);
        let max = |f: fn(&SessionSummary) -> f64| sessions.iter().map(f).fold(0.0_f64, f64::max);
        let hours = sessions.iter().map(|s| s.date.to_offset(offset).hour());
        let (early, late) = hours.fold((0.0, 0.0), |(e, l), h| {
            (if h < 6 { e + 1.0 } else { e }, if h >= 22 { l + 1.0 } else { l })
        });
        Self {
            count: all.sessions as f64,
            max_distance: max(|s| s.distance_m),
            total_distance: all.distance_m,
            max_duration: max(|s| s.duration_s as f64),
            total_duration: all.duration_s as f64,
            max_speed: max(|s| speed_from_pace(&s.avg_pace)),
            max_calories: max(|s| s.calories as f64),
            streak: longest_streak(sessions, offset) as f64,
            early,
            late,
        }
    }

    /// Value compared against the achievement's requirement. `None` for
    /// achievements with nothing to measure.
    fn measure(&self, id: &str) -> Option<f64> {
        let v = match id {
            "first-run" | "100-sessions" => self.count,
            "5km-runner" | "10km-runner" | "half-marathon" | "marathon" => self.max_distance,
            "100km-total" => self.total_distance,
            "30min-run" | "1hour-run" => self.max_duration,
            "10hours-total" => self.total_duration,
            "3-day-streak" | "7-day-streak" | "30-day-streak" => self.streak,
            "speed-5kmh" | "speed-10kmh" | "speed-15kmh" | "speed-20kmh" => self.max_speed,
            "1000-calories" => self.max_calories,
            "early-bird" => self.early,
            "night-runner" => self.late,
            _ => return None,
        };
        Some(v)
    }
}
