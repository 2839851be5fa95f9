// src/timer/machine.rs — Pomodoro countdown state machine
//
// Pure transition logic. Scheduling (the one-second clock) and network
// responses arrive as `Input`s; side effects leave as `Effect`s for the
// controller to execute.

use serde::Serialize;

use crate::infra::errors::PomoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Events delivered to the timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    SelectDuration(u32),
    SelectTask(Option<i64>),
    Start,
    Pause,
    Reset,
    Tick,
    /// Completed -> Idle after the expiry cues have been issued.
    Settle,
    BeginSucceeded { run: u64, session_id: i64 },
    BeginFailed { run: u64, reason: String },
}

/// Side effects requested by a transition, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartClock,
    StopClock,
    LockSelectors,
    UnlockSelectors,
    BeginSession {
        run: u64,
        duration_minutes: u32,
        task_ref: Option<i64>,
    },
    CompleteSession {
        session_id: i64,
    },
    PlayChime,
    Notify {
        title: String,
        body: String,
    },
    Refresh,
}

#[derive(Debug, Clone)]
pub struct Timer {
    phase: Phase,
    allowed: Vec<u32>,
    selected_minutes: u32,
    remaining_secs: u32,
    task_ref: Option<i64>,
    session_id: Option<i64>,
    /// Generation of the current run; 0 while Idle.
    run: u64,
    last_run: u64,
}

impl Timer {
    pub fn new(allowed: Vec<u32>, default_minutes: u32) -> Result<Self, PomoError> {
        if !allowed.contains(&default_minutes) {
            return Err(PomoError::UnsupportedDuration {
                minutes: default_minutes,
                allowed,
            });
        }
        Ok(Self {
            phase: Phase::Idle,
            allowed,
            selected_minutes: default_minutes,
            remaining_secs: default_minutes * 60,
            task_ref: None,
            session_id: None,
            run: 0,
            last_run: 0,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn selected_minutes(&self) -> u32 {
        self.selected_minutes
    }

    pub fn allowed_durations(&self) -> &[u32] {
        &self.allowed
    }

    pub fn task_ref(&self) -> Option<i64> {
        self.task_ref
    }

    pub fn session_id(&self) -> Option<i64> {
        self.session_id
    }

    pub fn run(&self) -> u64 {
        self.run
    }

    pub fn selectors_locked(&self) -> bool {
        matches!(self.phase, Phase::Running | Phase::Paused)
    }

    /// Apply one input. Errors leave the timer untouched.
    pub fn apply(&mut self, input: Input) -> Result<Vec<Effect>, PomoError> {
        match input {
            Input::SelectDuration(minutes) => self.select_duration(minutes),
            Input::SelectTask(task) => {
                self.ensure_unlocked()?;
                self.task_ref = task;
                Ok(Vec::new())
            }
            Input::Start => self.start(),
            Input::Pause => {
                if self.phase != Phase::Running {
                    return Err(PomoError::InvalidTransition {
                        from: self.phase,
                        action: "pause",
                    });
                }
                self.phase = Phase::Paused;
                Ok(vec![Effect::StopClock])
            }
            Input::Reset => Ok(self.reset()),
            Input::Tick => Ok(self.tick()),
            Input::Settle => {
                if self.phase != Phase::Completed {
                    return Ok(Vec::new());
                }
                self.clear_run();
                Ok(vec![Effect::UnlockSelectors, Effect::Refresh])
            }
            Input::BeginSucceeded { run, session_id } => {
                if self.is_live_run(run) {
                    self.session_id = Some(session_id);
                } else {
                    tracing::debug!(run, session_id, "ignoring begin result for a finished run");
                }
                Ok(Vec::new())
            }
            Input::BeginFailed { run, reason } => {
                if self.is_live_run(run) {
                    tracing::warn!(
                        "session record could not be created, this run will not be recorded: {reason}"
                    );
                }
                Ok(Vec::new())
            }
        }
    }

    fn select_duration(&mut self, minutes: u32) -> Result<Vec<Effect>, PomoError> {
        self.ensure_unlocked()?;
        if !self.allowed.contains(&minutes) {
            return Err(PomoError::UnsupportedDuration {
                minutes,
                allowed: self.allowed.clone(),
            });
        }
        self.selected_minutes = minutes;
        self.remaining_secs = minutes * 60;
        Ok(Vec::new())
    }

    fn start(&mut self) -> Result<Vec<Effect>, PomoError> {
        match self.phase {
            Phase::Paused => {
                self.phase = Phase::Running;
                Ok(vec![Effect::StartClock])
            }
            Phase::Idle => {
                self.last_run += 1;
                self.run = self.last_run;
                self.phase = Phase::Running;
                self.session_id = None;
                Ok(vec![
                    Effect::LockSelectors,
                    Effect::BeginSession {
                        run: self.run,
                        duration_minutes: self.selected_minutes,
                        task_ref: self.task_ref,
                    },
                    Effect::StartClock,
                ])
            }
            from => Err(PomoError::InvalidTransition {
                from,
                action: "start",
            }),
        }
    }

    fn tick(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Running {
            return Vec::new();
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return Vec::new();
        }

        self.phase = Phase::Completed;
        let mut effects = vec![
            Effect::StopClock,
            Effect::PlayChime,
            Effect::Notify {
                title: "Pomodoro Complete!".into(),
                body: format!(
                    "Great work! You finished a {} minute session.",
                    self.selected_minutes
                ),
            },
        ];
        if let Some(session_id) = self.session_id {
            effects.push(Effect::CompleteSession { session_id });
        }
        effects
    }

    fn reset(&mut self) -> Vec<Effect> {
        let was_counting = self.phase != Phase::Idle;
        self.clear_run();
        if was_counting {
            vec![Effect::StopClock, Effect::UnlockSelectors]
        } else {
            vec![Effect::UnlockSelectors]
        }
    }

    fn clear_run(&mut self) {
        self.phase = Phase::Idle;
        self.remaining_secs = self.selected_minutes * 60;
        self.session_id = None;
        self.run = 0;
    }

    fn is_live_run(&self, run: u64) -> bool {
        run != 0 && run == self.run && matches!(self.phase, Phase::Running | Phase::Paused)
    }

    fn ensure_unlocked(&self) -> Result<(), PomoError> {
        if self.selectors_locked() {
            return Err(PomoError::SelectorsLocked { phase: self.phase });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn timer() -> Timer {
        Timer::new(vec![25, 50], 25).unwrap()
    }

    fn begin_run(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::BeginSession { run, .. } => Some(*run),
                _ => None,
            })
            .expect("start should request a session record")
    }

    #[test]
    fn test_new_rejects_default_outside_allowed() {
        assert!(matches!(
            Timer::new(vec![25, 50], 30),
            Err(PomoError::UnsupportedDuration { minutes: 30, .. })
        ));
    }

    #[test]
    fn test_idle_loads_full_duration() {
        let t = timer();
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(t.remaining_secs(), 1500);
        assert!(!t.selectors_locked());
    }

    #[test]
    fn test_full_run_takes_exactly_d_times_60_ticks() {
        for d in [25u32, 50] {
            let mut t = timer();
            t.apply(Input::SelectDuration(d)).unwrap();
            t.apply(Input::Start).unwrap();
            for i in 1..(d * 60) {
                t.apply(Input::Tick).unwrap();
                assert_eq!(t.remaining_secs(), d * 60 - i);
                assert_eq!(t.phase(), Phase::Running);
            }
            t.apply(Input::Tick).unwrap();
            assert_eq!(t.remaining_secs(), 0);
            assert_eq!(t.phase(), Phase::Completed);
        }
    }

    #[test]
    fn test_start_effects() {
        let mut t = timer();
        t.apply(Input::SelectTask(Some(7))).unwrap();
        let effects = t.apply(Input::Start).unwrap();
        assert_eq!(
            effects,
            vec![
                Effect::LockSelectors,
                Effect::BeginSession {
                    run: 1,
                    duration_minutes: 25,
                    task_ref: Some(7)
                },
                Effect::StartClock,
            ]
        );
        assert!(t.selectors_locked());
    }

    #[test]
    fn test_pause_resume_preserves_remaining() {
        let mut t = timer();
        t.apply(Input::Start).unwrap();
        for _ in 0..100 {
            t.apply(Input::Tick).unwrap();
        }
        assert_eq!(t.apply(Input::Pause).unwrap(), vec![Effect::StopClock]);
        assert_eq!(t.remaining_secs(), 1400);

        // Clock does not advance while paused.
        t.apply(Input::Tick).unwrap();
        assert_eq!(t.remaining_secs(), 1400);

        // Resume continues the same run without a new record.
        assert_eq!(t.apply(Input::Start).unwrap(), vec![Effect::StartClock]);
        assert_eq!(t.phase(), Phase::Running);
        assert_eq!(t.remaining_secs(), 1400);
        assert_eq!(t.run(), 1);
    }

    #[test]
    fn test_reset_from_every_phase() {
        // Idle
        let mut t = timer();
        t.apply(Input::SelectDuration(50)).unwrap();
        t.apply(Input::Reset).unwrap();
        assert_eq!(t.remaining_secs(), 3000);
        assert_eq!(t.session_id(), None);

        // Running, with a session id
        let mut t = timer();
        let run = begin_run(&t.apply(Input::Start).unwrap());
        t.apply(Input::BeginSucceeded { run, session_id: 9 }).unwrap();
        t.apply(Input::Tick).unwrap();
        let effects = t.apply(Input::Reset).unwrap();
        assert_eq!(effects, vec![Effect::StopClock, Effect::UnlockSelectors]);
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(t.remaining_secs(), 1500);
        assert_eq!(t.session_id(), None);

        // Paused
        let mut t = timer();
        t.apply(Input::Start).unwrap();
        t.apply(Input::Tick).unwrap();
        t.apply(Input::Pause).unwrap();
        t.apply(Input::Reset).unwrap();
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(t.remaining_secs(), 1500);

        // Completed
        let mut t = timer();
        t.apply(Input::Start).unwrap();
        for _ in 0..1500 {
            t.apply(Input::Tick).unwrap();
        }
        assert_eq!(t.phase(), Phase::Completed);
        t.apply(Input::Reset).unwrap();
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(t.remaining_secs(), 1500);
    }

    #[test]
    fn test_reset_never_completes_or_chimes() {
        let mut t = timer();
        let run = begin_run(&t.apply(Input::Start).unwrap());
        t.apply(Input::BeginSucceeded { run, session_id: 3 }).unwrap();
        let effects = t.apply(Input::Reset).unwrap();
        assert!(!effects.iter().any(|e| matches!(
            e,
            Effect::CompleteSession { .. } | Effect::PlayChime | Effect::Notify { .. }
        )));
    }

    #[test]
    fn test_expiry_completes_with_session_id() {
        let mut t = timer();
        let run = begin_run(&t.apply(Input::Start).unwrap());
        t.apply(Input::BeginSucceeded { run, session_id: 42 }).unwrap();
        for _ in 0..1499 {
            assert!(t.apply(Input::Tick).unwrap().is_empty());
        }
        let effects = t.apply(Input::Tick).unwrap();
        assert_eq!(effects[0], Effect::StopClock);
        assert_eq!(effects[1], Effect::PlayChime);
        assert!(matches!(effects[2], Effect::Notify { .. }));
        assert_eq!(effects[3], Effect::CompleteSession { session_id: 42 });

        let settle = t.apply(Input::Settle).unwrap();
        assert_eq!(settle, vec![Effect::UnlockSelectors, Effect::Refresh]);
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(t.remaining_secs(), 1500);
        assert_eq!(t.session_id(), None);
    }

    #[test]
    fn test_expiry_without_session_id_skips_complete() {
        let mut t = timer();
        let run = begin_run(&t.apply(Input::Start).unwrap());
        t.apply(Input::BeginFailed {
            run,
            reason: "connection refused".into(),
        })
        .unwrap();
        let mut all = Vec::new();
        for _ in 0..1500 {
            all.extend(t.apply(Input::Tick).unwrap());
        }
        assert_eq!(t.phase(), Phase::Completed);
        assert!(all.contains(&Effect::PlayChime));
        assert!(!all
            .iter()
            .any(|e| matches!(e, Effect::CompleteSession { .. })));
    }

    #[test]
    fn test_stale_begin_result_is_ignored() {
        let mut t = timer();
        let first = begin_run(&t.apply(Input::Start).unwrap());
        t.apply(Input::Reset).unwrap();
        let second = begin_run(&t.apply(Input::Start).unwrap());
        assert_ne!(first, second);

        t.apply(Input::BeginSucceeded {
            run: first,
            session_id: 1,
        })
        .unwrap();
        assert_eq!(t.session_id(), None);

        t.apply(Input::BeginSucceeded {
            run: second,
            session_id: 2,
        })
        .unwrap();
        assert_eq!(t.session_id(), Some(2));
    }

    #[test]
    fn test_begin_result_after_reset_is_ignored() {
        let mut t = timer();
        let run = begin_run(&t.apply(Input::Start).unwrap());
        t.apply(Input::Reset).unwrap();
        t.apply(Input::BeginSucceeded { run, session_id: 5 }).unwrap();
        assert_eq!(t.session_id(), None);
    }

    #[test]
    fn test_begin_result_while_paused_is_kept() {
        let mut t = timer();
        let run = begin_run(&t.apply(Input::Start).unwrap());
        t.apply(Input::Pause).unwrap();
        t.apply(Input::BeginSucceeded { run, session_id: 8 }).unwrap();
        assert_eq!(t.session_id(), Some(8));
    }

    #[test]
    fn test_selectors_locked_while_running_or_paused() {
        let mut t = timer();
        t.apply(Input::Start).unwrap();
        assert!(matches!(
            t.apply(Input::SelectDuration(50)),
            Err(PomoError::SelectorsLocked {
                phase: Phase::Running
            })
        ));
        t.apply(Input::Pause).unwrap();
        assert!(matches!(
            t.apply(Input::SelectTask(Some(1))),
            Err(PomoError::SelectorsLocked {
                phase: Phase::Paused
            })
        ));
        assert_eq!(t.selected_minutes(), 25);
    }

    #[test]
    fn test_select_duration_updates_remaining_when_idle() {
        let mut t = timer();
        t.apply(Input::SelectDuration(50)).unwrap();
        assert_eq!(t.remaining_secs(), 3000);
        assert!(matches!(
            t.apply(Input::SelectDuration(45)),
            Err(PomoError::UnsupportedDuration { minutes: 45, .. })
        ));
        assert_eq!(t.remaining_secs(), 3000);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut t = timer();
        assert!(matches!(
            t.apply(Input::Pause),
            Err(PomoError::InvalidTransition {
                from: Phase::Idle,
                action: "pause"
            })
        ));
        t.apply(Input::Start).unwrap();
        assert!(matches!(
            t.apply(Input::Start),
            Err(PomoError::InvalidTransition {
                from: Phase::Running,
                action: "start"
            })
        ));
    }

    #[test]
    fn test_tick_outside_running_is_ignored() {
        let mut t = timer();
        assert!(t.apply(Input::Tick).unwrap().is_empty());
        assert_eq!(t.remaining_secs(), 1500);
    }

    #[test]
    fn test_settle_outside_completed_is_noop() {
        let mut t = timer();
        t.apply(Input::Start).unwrap();
        assert!(t.apply(Input::Settle).unwrap().is_empty());
        assert_eq!(t.phase(), Phase::Running);
    }

    #[test]
    fn test_runs_get_fresh_generations() {
        let mut t = timer();
        t.apply(Input::Start).unwrap();
        for _ in 0..1500 {
            t.apply(Input::Tick).unwrap();
        }
        t.apply(Input::Settle).unwrap();
        assert_eq!(t.run(), 0);
        let run = begin_run(&t.apply(Input::Start).unwrap());
        assert_eq!(run, 2);
    }
}
