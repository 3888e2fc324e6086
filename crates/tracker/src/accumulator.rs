use model::{ExperienceLevel, Position, UserProfile};
use serde::{Deserialize, Serialize};

use crate::derive::{average_speed_kmh, calories_kcal, speed_kmh, steps_estimate};
use crate::error::TrackError;
use crate::format::{format_distance_km, format_elapsed, format_pace};
use crate::geo::{distance_m, is_valid_position};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub body_weight_kg: f64,
    pub experience: ExperienceLevel,
    /// Increments at or below this many meters are GPS noise.
    pub jitter_threshold_m: f64,
    pub stride_length_m: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            body_weight_kg: 70.0,
            experience: ExperienceLevel::Beginner,
            jitter_threshold_m: 2.0,
            stride_length_m: 0.70,
        }
    }
}

impl TrackerConfig {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            body_weight_kg: profile.weight_kg,
            experience: profile.experience_level,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Active,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    pub active: bool,
    pub paused: bool,
    pub started_at_ms: Option<i64>,
    pub elapsed_seconds: u64,
    pub distance_m: f64,
    pub positions: Vec<Position>,
    pub current_speed_kmh: f64,
    pub average_speed_kmh: f64,
    pub calories_kcal: u32,
    pub steps_estimate: u32,
}

impl SessionRecord {
    pub fn formatted_elapsed(&self) -> String {
        format_elapsed(self.elapsed_seconds)
    }

    pub fn formatted_distance(&self) -> String {
        format_distance_km(self.distance_m)
    }

    pub fn formatted_pace(&self) -> String {
        format_pace(self.elapsed_seconds, self.distance_m)
    }

    pub fn current_position(&self) -> Option<&Position> {
        self.positions.last()
    }

    /// `[lat, lng]` pairs for drawing the route.
    pub fn live_positions(&self) -> Vec<[f64; 2]> {
        self.positions.iter().map(|p| [p.latitude, p.longitude]).collect()
    }
}

/// What happened to a position sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// First sample of the session; starts the route, adds no distance.
    Anchored,
    Accepted { increment_m: f64 },
    /// Within the noise threshold of the previous sample.
    Jitter,
    /// Recorded for route continuity while paused.
    Held,
    /// No active session.
    Dropped,
    /// Coordinates not finite or out of range.
    Invalid,
}

/// Session state machine. Single owner; see [`crate::LiveSession`] for the
/// shared, stream-driven version.
#[derive(Debug, Clone)]
pub struct Accumulator {
    cfg: TrackerConfig,
    record: SessionRecord,
    last_known: Option<Position>,
    stopped: bool,
}

impl Accumulator {
    pub fn new(cfg: TrackerConfig) -> Self {
        Self { cfg, record: SessionRecord::default(), last_known: None, stopped: false }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.cfg
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn last_known_position(&self) -> Option<&Position> {
        self.last_known.as_ref()
    }

    pub fn state(&self) -> SessionState {
        match (self.record.active, self.record.paused, self.stopped) {
            (true, true, _) => SessionState::Paused,
            (true, false, _) => SessionState::Active,
            (false, _, true) => SessionState::Stopped,
            (false, _, false) => SessionState::Idle,
        }
    }

    /// Begin a new session. Calling it while active restarts from zero.
    pub fn start(&mut self, now_ms: i64) {
        if self.record.active {
            log::info!("restarting active session");
        }
        self.record = SessionRecord {
            active: true,
            started_at_ms: Some(now_ms),
            ..Default::default()
        };
        self.last_known = None;
        self.stopped = false;
    }

    pub fn pause(&mut self) -> Result<(), TrackError> {
        if !self.record.active {
            return Err(TrackError::NotActive);
        }
        self.record.paused = true;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), TrackError> {
        if !self.record.active {
            return Err(TrackError::NotActive);
        }
        self.record.paused = false;
        Ok(())
    }

    /// Finish the session and hand back the frozen record. `None` when no
    /// session was active.
    pub fn stop(&mut self) -> Option<SessionRecord> {
        if !self.record.active {
            return None;
        }
        self.record.active = false;
        self.record.paused = false;
        self.stopped = true;
        Some(self.record.clone())
    }

    pub fn on_position(&mut self, sample: Position) -> SampleOutcome {
        if !self.record.active {
            return SampleOutcome::Dropped;
        }
        if !is_valid_position(&sample) {
            log::debug!("ignoring invalid position {sample:?}");
            return SampleOutcome::Invalid;
        }
        let prev = match self.last_known {
            Some(p) => p,
            None => {
                self.record.positions.push(sample);
                self.last_known = Some(sample);
                return if self.record.paused { SampleOutcome::Held } else { SampleOutcome::Anchored };
            }
        };

        let d = distance_m(&prev, &sample);
        if d <= self.cfg.jitter_threshold_m {
            self.last_known = Some(sample);
            return SampleOutcome::Jitter;
        }

        self.record.positions.push(sample);
        self.last_known = Some(sample);
        if self.record.paused {
            return SampleOutcome::Held;
        }

        self.record.distance_m += d;
        self.record.current_speed_kmh = speed_kmh(d, sample.timestamp_ms - prev.timestamp_ms);
        self.refresh_derived();
        SampleOutcome::Accepted { increment_m: d }
    }

    /// One second of wall-clock time. Returns whether it counted.
    pub fn on_tick(&mut self) -> bool {
        if !self.record.active || self.record.paused {
            return false;
        }
        self.record.elapsed_seconds += 1;
        true
    }

    fn refresh_derived(&mut self) {
        let r = &mut self.record;
        r.average_speed_kmh = average_speed_kmh(r.distance_m, r.elapsed_seconds);
        r.steps_estimate = steps_estimate(r.distance_m, self.cfg.stride_length_m);
        r.calories_kcal = calories_kcal(r.distance_m, self.cfg.body_weight_kg, self.cfg.experience);
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
