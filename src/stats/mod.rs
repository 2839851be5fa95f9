// src/stats/mod.rs — Productivity aggregates over completed session records

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::store::store::{PomodoroRow, TaskCounts};

/// The week window reaches back this many days before today (inclusive).
pub const WEEK_LOOKBACK_DAYS: i64 = 7;
/// Number of per-day buckets in the breakdown, ending today.
pub const DAILY_BUCKETS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub today_pomodoros: u32,
    pub week_pomodoros: u32,
    pub total_focus_hours: u32,
    pub total_focus_minutes: u32,
    pub daily_stats: Vec<DayCount>,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub pending_tasks: u32,
}

/// First day the store needs to return records for.
pub fn window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(WEEK_LOOKBACK_DAYS.max(DAILY_BUCKETS - 1))
}

/// Summarize completed records. Incomplete rows are ignored even if passed in.
pub fn summarize(records: &[PomodoroRow], tasks: TaskCounts, today: NaiveDate) -> StatsSummary {
    let week_start = today - Duration::days(WEEK_LOOKBACK_DAYS);
    let done = || records.iter().filter(|r| r.completed);

    let today_pomodoros = done()
        .filter(|r| r.started_at.date_naive() == today)
        .count() as u32;

    let (week_pomodoros, focus_minutes) = done()
        .filter(|r| {
            let day = r.started_at.date_naive();
            day >= week_start && day <= today
        })
        .fold((0u32, 0u32), |(n, mins), r| (n + 1, mins + r.duration));

    StatsSummary {
        today_pomodoros,
        week_pomodoros,
        total_focus_hours: focus_minutes / 60,
        total_focus_minutes: focus_minutes % 60,
        daily_stats: daily_counts(records, today, "%a"),
        total_tasks: tasks.total,
        completed_tasks: tasks.completed,
        pending_tasks: tasks.total.saturating_sub(tasks.completed),
    }
}

/// Completed sessions per day for the last seven days, oldest first.
pub fn daily_counts(records: &[PomodoroRow], today: NaiveDate, label_format: &str) -> Vec<DayCount> {
    (0..DAILY_BUCKETS)
        .rev()
        .map(|back| {
            let day = today - Duration::days(back);
            let count = records
                .iter()
                .filter(|r| r.completed && r.started_at.date_naive() == day)
                .count() as u32;
            DayCount {
                date: day.format(label_format).to_string(),
                count,
            }
        })
        .collect()
}
