// src/timer/render.rs — Pure state -> display functions

use serde::Serialize;

use super::machine::{Phase, Timer};

pub const IDLE_TITLE: &str = "Pomodoro Timer";

/// Everything a front end needs to draw the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerView {
    pub phase: Phase,
    pub clock: String,
    pub title: String,
    pub start_label: &'static str,
    pub start_enabled: bool,
    pub pause_enabled: bool,
    pub selectors_enabled: bool,
    pub selected_minutes: u32,
    pub durations: Vec<u32>,
    pub task_ref: Option<i64>,
}

/// `MM:SS`, zero padded. Sessions never exceed 99 minutes so there is no
/// hour component.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Window/page title: mirrors the countdown only while running.
pub fn window_title(timer: &Timer) -> String {
    match timer.phase() {
        Phase::Running => format!("{} - Pomodoro", format_clock(timer.remaining_secs())),
        _ => IDLE_TITLE.to_string(),
    }
}

pub fn view(timer: &Timer) -> TimerView {
    let phase = timer.phase();
    TimerView {
        phase,
        clock: format_clock(timer.remaining_secs()),
        title: window_title(timer),
        start_label: if phase == Phase::Paused {
            "Resume"
        } else {
            "Start"
        },
        start_enabled: matches!(phase, Phase::Idle | Phase::Paused),
        pause_enabled: phase == Phase::Running,
        selectors_enabled: !timer.selectors_locked(),
        selected_minutes: timer.selected_minutes(),
        durations: timer.allowed_durations().to_vec(),
        task_ref: timer.task_ref(),
    }
}
