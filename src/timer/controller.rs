// src/timer/controller.rs — Cooperative event loop driving one Timer

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::cues::Cues;
use super::lifecycle::SessionLifecycle;
use super::machine::{Effect, Input, Phase, Timer};
use super::render::{self, TimerView};
use crate::infra::errors::PomoError;

const ONE_SECOND: Duration = Duration::from_secs(1);

/// What a front end can ask of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Input(Input),
    Quit,
}

/// Result of a spawned lifecycle call.
#[derive(Debug)]
enum Outcome {
    /// Begin result, applied to the timer.
    Input(Input),
    /// A complete call finished, successfully or not.
    CompleteSettled { session_id: i64 },
}

/// Owns the single countdown for a page/terminal.
///
/// Network calls are spawned and never awaited by the tick path; their
/// results come back through `results`. A refresh requested while a
/// complete call is outstanding is held until that call settles, so the
/// reloaded aggregates include the finished run.
pub struct TimerController {
    timer: Timer,
    lifecycle: Arc<dyn SessionLifecycle>,
    cues: Arc<dyn Cues>,
    clock: Option<Interval>,
    results_tx: mpsc::UnboundedSender<Outcome>,
    results_rx: mpsc::UnboundedReceiver<Outcome>,
    in_flight: JoinSet<()>,
    views: watch::Sender<TimerView>,
    refreshes: watch::Sender<u64>,
    completes_pending: usize,
    refresh_held: bool,
    completed_runs: u64,
}

impl TimerController {
    pub fn new(timer: Timer, lifecycle: Arc<dyn SessionLifecycle>, cues: Arc<dyn Cues>) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (views, _) = watch::channel(render::view(&timer));
        let (refreshes, _) = watch::channel(0);
        Self {
            timer,
            lifecycle,
            cues,
            clock: None,
            results_tx,
            results_rx,
            in_flight: JoinSet::new(),
            views,
            refreshes,
            completes_pending: 0,
            refresh_held: false,
            completed_runs: 0,
        }
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Latest rendered view, updated after every input.
    pub fn views(&self) -> watch::Receiver<TimerView> {
        self.views.subscribe()
    }

    /// Bumped each time a finished run asks the UI to reload aggregates.
    pub fn refreshes(&self) -> watch::Receiver<u64> {
        self.refreshes.subscribe()
    }

    pub fn completed_runs(&self) -> u64 {
        self.completed_runs
    }

    /// Apply an input and carry out the effects it produces.
    pub fn dispatch(&mut self, input: Input) -> Result<(), PomoError> {
        let effects = self.timer.apply(input)?;
        self.execute_all(effects);

        if self.timer.phase() == Phase::Completed {
            self.completed_runs += 1;
            let effects = self.timer.apply(Input::Settle)?;
            self.execute_all(effects);
        }

        self.views.send_replace(render::view(&self.timer));
        Ok(())
    }

    /// Wait for one lifecycle result and apply it. Returns false if none can arrive.
    pub async fn pump(&mut self) -> bool {
        tokio::select! {
            Some(outcome) = self.results_rx.recv() => {
                self.settle(outcome);
                true
            }
            else => false,
        }
    }

    /// Let every in-flight begin/complete call finish and apply the results.
    pub async fn drain(&mut self) {
        while self.in_flight.join_next().await.is_some() {}
        while let Ok(outcome) = self.results_rx.try_recv() {
            self.settle(outcome);
        }
    }

    /// Run until `Quit` or the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::Input(input)) => self.dispatch_logged(input),
                    Some(Command::Quit) | None => break,
                },
                Some(outcome) = self.results_rx.recv() => self.settle(outcome),
                _ = next_tick(&mut self.clock) => self.dispatch_logged(Input::Tick),
                Some(_) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {}
            }
        }
        self.clock = None;
        self.drain().await;
    }

    fn settle(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Input(input) => self.dispatch_logged(input),
            Outcome::CompleteSettled { session_id } => {
                tracing::debug!(session_id, "complete call settled");
                self.completes_pending = self.completes_pending.saturating_sub(1);
                if self.completes_pending == 0 && self.refresh_held {
                    self.refresh_held = false;
                    self.publish_refresh();
                }
            }
        }
    }

    fn publish_refresh(&self) {
        self.refreshes.send_modify(|n| *n += 1);
    }

    fn dispatch_logged(&mut self, input: Input) {
        if let Err(e) = self.dispatch(input) {
            tracing::info!("{e}");
        }
    }

    fn execute_all(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::StartClock => {
                let mut clock = interval_at(Instant::now() + ONE_SECOND, ONE_SECOND);
                clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.clock = Some(clock);
            }
            Effect::StopClock => self.clock = None,
            // Selector state is part of the rendered view.
            Effect::LockSelectors | Effect::UnlockSelectors => {}
            Effect::BeginSession {
                run,
                duration_minutes,
                task_ref,
            } => {
                let lifecycle = Arc::clone(&self.lifecycle);
                let results = self.results_tx.clone();
                self.in_flight.spawn(async move {
                    let input = match lifecycle.begin(duration_minutes, task_ref).await {
                        Ok(session_id) => {
                            tracing::info!(session_id, duration_minutes, "session record created");
                            Input::BeginSucceeded { run, session_id }
                        }
                        Err(e) if e.is_transport() => {
                            tracing::warn!("begin failed, continuing without a record: {e}");
                            Input::BeginFailed {
                                run,
                                reason: e.to_string(),
                            }
                        }
                        Err(e) => {
                            tracing::error!("begin failed unexpectedly, continuing without a record: {e}");
                            Input::BeginFailed {
                                run,
                                reason: e.to_string(),
                            }
                        }
                    };
                    let _ = results.send(Outcome::Input(input));
                });
            }
            Effect::CompleteSession { session_id } => {
                let lifecycle = Arc::clone(&self.lifecycle);
                let results = self.results_tx.clone();
                self.completes_pending += 1;
                self.in_flight.spawn(async move {
                    match lifecycle.complete(session_id).await {
                        Ok(()) => tracing::info!(session_id, "session record completed"),
                        Err(e) if e.is_transport() => {
                            tracing::warn!(session_id, "complete failed: {e}")
                        }
                        Err(e) => tracing::error!(session_id, "complete failed unexpectedly: {e}"),
                    }
                    let _ = results.send(Outcome::CompleteSettled { session_id });
                });
            }
            Effect::PlayChime => {
                if let Err(e) = self.cues.chime() {
                    tracing::warn!("chime failed: {e}");
                }
            }
            Effect::Notify { title, body } => {
                if self.cues.notifications_permitted() {
                    if let Err(e) = self.cues.notify(&title, &body) {
                        tracing::warn!("notification failed: {e}");
                    }
                }
            }
            Effect::Refresh => {
                if self.completes_pending > 0 {
                    self.refresh_held = true;
                } else {
                    self.publish_refresh();
                }
            }
        }
    }
}

async fn next_tick(clock: &mut Option<Interval>) {
    match clock {
        Some(clock) => {
            clock.tick().await;
        }
        None => std::future::pending().await,
    }
}
