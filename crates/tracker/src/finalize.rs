use model::{SessionKind, SessionSummary};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accumulator::SessionRecord;

/// Turn a stopped record into the history entry handed to persistence.
pub fn finalize(record: &SessionRecord, kind: SessionKind) -> SessionSummary {
    let date = record
        .started_at_ms
        .and_then(|ms| OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000).ok())
        .unwrap_or_else(OffsetDateTime::now_utc);
    let minutes = record.elapsed_seconds as f64 / 60.0;
    let steps_per_minute = if minutes > 0.0 { record.steps_estimate as f64 / minutes } else { 0.0 };

    SessionSummary {
        id: Uuid::new_v4(),
        kind,
        date,
        duration_s: record.elapsed_seconds,
        distance_m: record.distance_m,
        calories: record.calories_kcal,
        avg_pace: record.formatted_pace(),
        steps: record.steps_estimate,
        steps_per_minute,
        positions: record.live_positions(),
        route: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Position;
    use time::macros::datetime;

    #[test]
    fn test_finalize_copies_totals() {
        let rec = SessionRecord {
            started_at_ms: Some(1_700_000_000_000),
            elapsed_seconds: 1500,
            distance_m: 5000.0,
            calories_kcal: 280,
            steps_estimate: 7142,
            positions: vec![Position { latitude: 1.0, longitude: 2.0, timestamp_ms: 0 }],
            ..Default::default()
        };
        let s = finalize(&rec, SessionKind::Run);
        assert_eq!(s.date, datetime!(2023-11-14 22:13:20 UTC));
        assert_eq!(s.duration_s, 1500);
        assert_eq!(s.avg_pace, "5:00");
        assert_eq!(s.calories, 280);
        assert!((s.steps_per_minute - 285.68).abs() < 1e-9);
        assert_eq!(s.positions, vec![[1.0, 2.0]]);
    }

    #[test]
    fn test_finalize_empty_session() {
        let s = finalize(&SessionRecord::default(), SessionKind::Walk);
        assert_eq!(s.steps_per_minute, 0.0);
        assert_eq!(s.avg_pace, "0:00");
        assert!(s.positions.is_empty());
    }
}
