//! Live session tracking: turns a stream of positions and a one second
//! clock into running totals for a workout.

pub mod accumulator;
pub mod announce;
pub mod derive;
pub mod error;
pub mod finalize;
pub mod format;
pub mod geo;
pub mod live;

pub use accumulator::{Accumulator, SampleOutcome, SessionRecord, SessionState, TrackerConfig};
pub use announce::{Announcement, Announcer, AnnouncerConfig};
pub use error::TrackError;
pub use finalize::finalize;
pub use live::{LiveConfig, LiveSession};
