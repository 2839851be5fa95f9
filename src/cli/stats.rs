// src/cli/stats.rs — `pomotask stats`

use chrono::Utc;

use crate::infra::config::Config;
use crate::stats::{self, StatsSummary};
use crate::store;

/// Print the statistics summary for one user from the local database.
pub async fn run_stats(config: &Config, user: &str) -> anyhow::Result<()> {
    let store = store::open(&config.database.resolved_path())?;
    let account = store
        .find_user_by_username(user)?
        .ok_or_else(|| anyhow::anyhow!("No such user: {user}"))?;

    let today = Utc::now().date_naive();
    let records = store.completed_pomodoros_since(account.id, stats::window_start(today))?;
    let tasks = store.task_counts(account.id)?;
    let summary = stats::summarize(&records, tasks, today);

    print!("{}", format_summary(&summary));
    Ok(())
}

pub fn format_summary(s: &StatsSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Today:      {} pomodoros\n", s.today_pomodoros));
    out.push_str(&format!(
        "This week:  {} pomodoros, {}h {}m focused\n",
        s.week_pomodoros, s.total_focus_hours, s.total_focus_minutes
    ));
    out.push_str(&format!(
        "Tasks:      {} total, {} completed, {} pending\n",
        s.total_tasks, s.completed_tasks, s.pending_tasks
    ));
    out.push('\n');
    let peak = s.daily_stats.iter().map(|d| d.count).max().unwrap_or(0).max(1);
    for day in &s.daily_stats {
        let bar = "#".repeat((day.count * 20 / peak) as usize);
        out.push_str(&format!("  {:<4} {:>3} {bar}\n", day.date, day.count));
    }
    out
}
