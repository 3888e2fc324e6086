use model::{Goal, GoalKind, GoalPeriod, SessionSummary};
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::stats::{self, start_of_day, start_of_month, start_of_week};

pub fn period_start(period: GoalPeriod, now: OffsetDateTime) -> OffsetDateTime {
    match period {
        GoalPeriod::Daily => start_of_day(now),
        GoalPeriod::Weekly => start_of_week(now),
        GoalPeriod::Monthly => start_of_month(now),
    }
}

/// Value of `kind` accumulated over `[period start, now]`. Time is in
/// minutes, distance in meters.
pub fn current_value(kind: GoalKind, period: GoalPeriod, sessions: &[SessionSummary], now: OffsetDateTime) -> f64 {
    let t = stats::totals(stats::in_range(sessions, period_start(period, now), now));
    match kind {
        GoalKind::Distance => t.distance_m,
        GoalKind::Steps => t.steps as f64,
        GoalKind::Time => t.duration_s as f64 / 60.0,
        GoalKind::Calories => t.calories as f64,
    }
}

/// Percent of `target` reached, capped at 100.
pub fn goal_percent(current: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    (current / target * 100.0).clamp(0.0, 100.0)
}

pub fn refresh(goal: &mut Goal, sessions: &[SessionSummary], now: OffsetDateTime) {
    goal.current = current_value(goal.kind, goal.period, sessions, now);
}

pub fn refresh_all(goals: &mut [Goal], sessions: &[SessionSummary], now: OffsetDateTime) {
    for g in goals {
        refresh(g, sessions, now);
    }
}

pub fn is_complete(goal: &Goal) -> bool {
    goal.target > 0.0 && goal.current >= goal.target
}

pub fn default_goals(now: OffsetDateTime) -> Vec<Goal> {
    let start = start_of_day(now);
    let goal = |id: &str, kind, target| Goal {
        id: id.into(),
        kind,
        target,
        current: 0.0,
        period: GoalPeriod::Daily,
        start_date: start,
    };
    vec![
        goal("steps", GoalKind::Steps, 10_000.0),
        goal("distance", GoalKind::Distance, 5000.0),
        goal("calories", GoalKind::Calories, 500.0),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepTrend {
    pub today: u64,
    pub yesterday: u64,
    pub diff: i64,
    /// Whole percent change versus yesterday; 0 when yesterday had none.
    pub percent: i64,
}

pub fn step_trend(sessions: &[SessionSummary], now: OffsetDateTime) -> StepTrend {
    let today_start = start_of_day(now);
    let yesterday_start = today_start - Duration::days(1);
    let sum = |from: OffsetDateTime, to: OffsetDateTime| -> u64 {
        sessions.iter().filter(|s| s.date >= from && s.date < to).map(|s| s.steps as u64).sum()
    };
    let today = sum(today_start, today_start + Duration::days(1));
    let yesterday = sum(yesterday_start, today_start);
    let diff = today as i64 - yesterday as i64;
    let percent = if yesterday > 0 { (diff as f64 / yesterday as f64 * 100.0).round() as i64 } else { 0 };
    StepTrend { today, yesterday, diff, percent }
}
