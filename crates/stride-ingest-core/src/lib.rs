//! Core location model and traits used by Stride

use serde::{Serialize, Deserialize};
use std::time::Duration;

mod replay;
pub use replay::ReplaySource;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,
    pub timestamp_ms: i64,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self { latitude, longitude, accuracy_m: None, timestamp_ms }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }
}

/// Acquisition failures. Only `Unavailable` prevents a session from
/// starting; the others are transient and reported while tracking.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum LocationError {
    #[error("location unavailable: {0}")]
    Unavailable(String),
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
    #[error("no position within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationEvent {
    Fix(LocationSample),
    Error(LocationError),
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{0}")]
    Msg(String),
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Acquisition options a source honours.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationOptions {
    pub high_accuracy: bool,
    /// How old a cached fix may be and still be handed out (0..=60s).
    pub maximum_age: Duration,
    /// How long to wait for a fix before reporting a timeout (5..=20s).
    pub timeout: Duration,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self { high_accuracy: true, maximum_age: Duration::ZERO, timeout: Duration::from_secs(5) }
    }
}

impl LocationOptions {
    pub const MAX_AGE_LIMIT: Duration = Duration::from_secs(60);
    pub const MIN_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MAX_TIMEOUT: Duration = Duration::from_secs(20);

    pub fn clamped(self) -> Self {
        Self {
            high_accuracy: self.high_accuracy,
            maximum_age: self.maximum_age.min(Self::MAX_AGE_LIMIT),
            timeout: self.timeout.clamp(Self::MIN_TIMEOUT, Self::MAX_TIMEOUT),
        }
    }
}

pub type LocationTx = crossbeam_channel::Sender<LocationEvent>;
pub type LocationRx = crossbeam_channel::Receiver<LocationEvent>;

/// Trait for any live position provider
#[async_trait::async_trait]
pub trait LocationSource: Send + Sync {
    /// Whether the platform can supply positions at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Push events into `tx` until the source ends or the receiver is gone.
    async fn run(&self, tx: LocationTx) -> Result<(), IngestError>;
}

pub fn channel() -> (LocationTx, LocationRx) {
    crossbeam_channel::unbounded()
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_are_clamped() {
        let o = LocationOptions {
            high_accuracy: true,
            maximum_age: Duration::from_secs(300),
            timeout: Duration::from_secs(1),
        }
        .clamped();
        assert_eq!(o.maximum_age, Duration::from_secs(60));
        assert_eq!(o.timeout, Duration::from_secs(5));

        let o = LocationOptions { timeout: Duration::from_secs(90), ..Default::default() }.clamped();
        assert_eq!(o.timeout, Duration::from_secs(20));
        assert_eq!(o.maximum_age, Duration::ZERO);
    }

    #[test]
    fn test_now_ms_is_recent() {
        // 2020-01-01
        assert!(now_ms() > 1_577_836_800_000);
    }
}
