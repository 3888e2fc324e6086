use model::SessionSummary;
use serde::Serialize;
use time::{Date, Duration, Month, OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub distance_m: f64,
    pub duration_s: u64,
    pub calories: u64,
    pub sessions: usize,
    pub steps: u64,
}

impl Totals {
    pub fn avg_pace(&self) -> String {
        average_pace(self.distance_m, self.duration_s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyStats {
    #[serde(flatten)]
    pub totals: Totals,
    pub avg_pace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStats {
    pub year: i32,
    /// 1..=12
    pub month: u8,
    #[serde(flatten)]
    pub totals: Totals,
}

pub fn totals<'a, I>(sessions: I) -> Totals
where
    I: IntoIterator<Item = &'a SessionSummary>,
{
    sessions.into_iter().fold(Totals::default(), |mut t, s| {
        t.distance_m += s.distance_m;
        t.duration_s += s.duration_s;
        t.calories += s.calories as u64;
        t.steps += s.steps as u64;
        t.sessions += 1;
        t
    })
}

/// `M:SS` per km; floors both parts. `0:00` for zero distance.
pub fn average_pace(distance_m: f64, duration_s: u64) -> String {
    if distance_m <= 0.0 {
        return "0:00".into();
    }
    let pace = duration_s as f64 / 60.0 / (distance_m / 1000.0);
    let minutes = pace.floor();
    let seconds = ((pace - minutes) * 60.0).floor();
    format!("{}:{:02}", minutes as u64, seconds as u64)
}

/// Sessions whose date lies in `[start, end]`.
pub fn in_range(sessions: &[SessionSummary], start: OffsetDateTime, end: OffsetDateTime) -> Vec<&SessionSummary> {
    sessions.iter().filter(|s| s.date >= start && s.date <= end).collect()
}

pub fn start_of_day(now: OffsetDateTime) -> OffsetDateTime {
    now.replace_time(time::Time::MIDNIGHT)
}

/// Sunday 00:00 of the week containing `now`.
pub fn start_of_week(now: OffsetDateTime) -> OffsetDateTime {
    let back = now.weekday().number_days_from_sunday() as i64;
    start_of_day(now) - Duration::days(back)
}

pub fn start_of_month(now: OffsetDateTime) -> OffsetDateTime {
    start_of_day(now).replace_day(1).unwrap_or_else(|_| start_of_day(now))
}

/// Sessions on the calendar day of `now`, in `now`'s offset.
pub fn today(sessions: &[SessionSummary], now: OffsetDateTime) -> Vec<&SessionSummary> {
    let start = start_of_day(now);
    let end = start + Duration::days(1);
    sessions.iter().filter(|s| s.date >= start && s.date < end).collect()
}

pub fn this_week(sessions: &[SessionSummary], now: OffsetDateTime) -> WeeklyStats {
    let week = in_range(sessions, start_of_week(now), now);
    let totals = totals(week);
    let avg_pace = if totals.sessions > 0 { totals.avg_pace() } else { "0:00".into() };
    WeeklyStats { totals, avg_pace }
}

/// Twelve entries, January first. Month boundaries are taken in `offset`.
pub fn yearly(sessions: &[SessionSummary], year: i32, offset: UtcOffset) -> Vec<MonthlyStats> {
    let mut out = Vec::with_capacity(12);
    let mut month = Month::January;
    for _ in 0..12 {
        let totals = match month_bounds(year, month, offset) {
            Some((start, end)) => totals(sessions.iter().filter(|s| s.date >= start && s.date < end)),
            None => Totals::default(),
        };
        out.push(MonthlyStats { year, month: month as u8, totals });
        month = month.next();
    }
    out
}

fn month_bounds(year: i32, month: Month, offset: UtcOffset) -> Option<(OffsetDateTime, OffsetDateTime)> {
    let first = Date::from_calendar_date(year, month, 1).ok()?;
    let next = match month {
        Month::December => Date::from_calendar_date(year + 1, Month::January, 1).ok()?,
        m => Date::from_calendar_date(year, m.next(), 1).ok()?,
    };
    Some((first.midnight().assume_offset(offset), next.midnight().assume_offset(offset)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use model::SessionKind;
    use time::macros::datetime;
    use uuid::Uuid;

    pub(crate) fn session(date: OffsetDateTime, distance_m: f64, duration_s: u64) -> SessionSummary {
        SessionSummary {
            id: Uuid::new_v4(),
            kind: SessionKind::Run,
            date,
            duration_s,
            distance_m,
            calories: (distance_m / 1000.0 * 56.0).round() as u32,
            avg_pace: average_pace(distance_m, duration_s),
            steps: (distance_m / 0.7) as u32,
            steps_per_minute: 0.0,
            positions: vec![],
            route: None,
        }
    }

    #[test]
    fn test_average_pace() {
        assert_eq!(average_pace(5000.0, 1500), "5:00");
        assert_eq!(average_pace(5000.0, 1650), "5:30");
        assert_eq!(average_pace(0.0, 600), "0:00");
    }

    #[test]
    fn test_totals_and_range() {
        let s = vec![
            session(datetime!(2024-03-04 08:00 UTC), 5000.0, 1500),
            session(datetime!(2024-03-02 08:00 UTC), 3000.0, 1200),
            session(datetime!(2024-02-20 08:00 UTC), 1000.0, 400),
        ];
        let all = totals(&s);
        assert_eq!(all.sessions, 3);
        assert_eq!(all.duration_s, 3100);
        assert!((all.distance_m - 9000.0).abs() < 1e-9);
        assert_eq!(all.steps, 7142 + 4285 + 1428);

        let march = in_range(&s, datetime!(2024-03-01 00:00 UTC), datetime!(2024-03-04 08:00 UTC));
        assert_eq!(march.len(), 2);
    }

    #[test]
    fn test_today_and_week() {
        // 2024-03-06 is a Wednesday; the week starts Sunday 03-03
        let now = datetime!(2024-03-06 18:00 UTC);
        let s = vec![
            session(datetime!(2024-03-06 07:00 UTC), 5000.0, 1500),
            session(datetime!(2024-03-03 00:00 UTC), 5000.0, 1800),
            session(datetime!(2024-03-02 23:59 UTC), 5000.0, 1500),
            session(datetime!(2024-03-07 07:00 UTC), 5000.0, 1500),
        ];
        assert_eq!(today(&s, now).len(), 1);
        assert_eq!(start_of_week(now), datetime!(2024-03-03 00:00 UTC));

        let week = this_week(&s, now);
        assert_eq!(week.totals.sessions, 2);
        assert_eq!(week.avg_pace, "5:30");

        let empty = this_week(&[], now);
        assert_eq!(empty.avg_pace, "0:00");
    }

    #[test]
    fn test_yearly_has_twelve_months() {
        let s = vec![
            session(datetime!(2024-01-31 23:30 UTC), 1000.0, 300),
            session(datetime!(2024-02-01 00:00 UTC), 2000.0, 600),
            session(datetime!(2024-12-31 23:59 UTC), 3000.0, 900),
            session(datetime!(2025-01-01 00:00 UTC), 4000.0, 900),
        ];
        let y = yearly(&s, 2024, UtcOffset::UTC);
        assert_eq!(y.len(), 12);
        assert_eq!(y[0].month, 1);
        assert_eq!(y[0].totals.sessions, 1);
        assert_eq!(y[1].totals.sessions, 1);
        assert_eq!(y[11].totals.sessions, 1);
        assert_eq!(y.iter().map(|m| m.totals.sessions).sum::<usize>(), 3);
    }
}
