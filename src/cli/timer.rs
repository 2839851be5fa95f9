// src/cli/timer.rs — `pomotask timer`: terminal front end for the controller

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType, SetTitle};
use crossterm::{cursor::MoveToColumn, queue};
use tokio::sync::{mpsc, watch};

use crate::infra::config::Config;
use crate::timer::cues::TerminalCues;
use crate::timer::lifecycle::HttpSessionClient;
use crate::timer::render::{TimerView, IDLE_TITLE};
use crate::timer::{Command, Input, Timer, TimerController};

const KEY_POLL: Duration = Duration::from_millis(200);

pub struct TimerArgs<'a> {
    pub user: &'a str,
    pub duration: Option<u32>,
    pub task: Option<i64>,
    pub server: Option<&'a str>,
}

pub async fn run_timer(config: &Config, args: TimerArgs<'_>) -> anyhow::Result<()> {
    let base = args.server.unwrap_or(&config.client.server_url);
    let password = super::read_password(&format!("Password for {}:", args.user))?;
    let client = Arc::new(HttpSessionClient::login(base, args.user, &password).await?);

    let mut timer = Timer::new(config.timer.durations.clone(), config.timer.default_duration)?;
    if let Some(minutes) = args.duration {
        timer.apply(Input::SelectDuration(minutes))?;
    }
    if let Some(id) = args.task {
        let tasks = client.pending_tasks().await?;
        let Some(task) = tasks.iter().find(|t| t.id == id) else {
            anyhow::bail!("Task {id} is not one of your pending tasks");
        };
        println!("Working on: {}", task.title);
        timer.apply(Input::SelectTask(Some(id)))?;
    }

    let cues = Arc::new(TerminalCues::new(config.timer.notifications));
    let controller = TimerController::new(timer, client.clone(), cues);
    let views = controller.views();
    let refreshes = controller.refreshes();

    let (tx, rx) = mpsc::channel(16);
    let controller_task = tokio::spawn(controller.run(rx));

    let stop = Arc::new(AtomicBool::new(false));
    let keys = {
        let stop = stop.clone();
        std::thread::spawn(move || read_keys(tx, stop))
    };

    println!("[s] start/resume  [p] pause  [r] reset  [q] quit");
    enable_raw_mode()?;
    let result = draw_loop(views, refreshes, &client).await;
    stop.store(true, Ordering::Relaxed);
    disable_raw_mode()?;

    let mut out = io::stdout();
    queue!(out, SetTitle(IDLE_TITLE))?;
    writeln!(out)?;
    out.flush()?;

    controller_task.await?;
    if keys.join().is_err() {
        tracing::warn!("key reader thread panicked");
    }
    result
}

/// Redraw on every view change; reload aggregates when a run finishes.
async fn draw_loop(
    mut views: watch::Receiver<TimerView>,
    mut refreshes: watch::Receiver<u64>,
    client: &HttpSessionClient,
) -> anyhow::Result<()> {
    draw(&views.borrow_and_update())?;
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let view = views.borrow_and_update().clone();
                draw(&view)?;
            }
            Ok(()) = refreshes.changed() => {
                match client.stats().await {
                    Ok(s) => print!(
                        "\r\nCompleted today: {}  this week: {}\r\n",
                        s.today_pomodoros, s.week_pomodoros
                    ),
                    Err(e) => tracing::warn!("could not refresh stats: {e}"),
                }
                draw(&views.borrow().clone())?;
            }
        }
    }
}

fn draw(view: &TimerView) -> io::Result<()> {
    let mut out = io::stdout();
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        SetTitle(&view.title)
    )?;
    write!(out, "{}", status_line(view))?;
    out.flush()
}

pub fn status_line(view: &TimerView) -> String {
    let mut hints = Vec::new();
    if view.start_enabled {
        hints.push(format!("[s] {}", view.start_label));
    }
    if view.pause_enabled {
        hints.push("[p] Pause".to_string());
    }
    let minutes = if view.selectors_enabled {
        view.durations
            .iter()
            .map(|d| {
                if *d == view.selected_minutes {
                    format!("[{d}]")
                } else {
                    d.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    } else {
        view.selected_minutes.to_string()
    };
    let task = view
        .task_ref
        .map(|id| format!("  task #{id}"))
        .unwrap_or_default();
    format!(
        "{}  {:?}  ({minutes} min){task}  {}",
        view.clock,
        view.phase,
        hints.join(" ")
    )
}

pub fn key_command(code: KeyCode, modifiers: KeyModifiers) -> Option<Command> {
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char('s') | KeyCode::Char(' ') => Some(Command::Input(Input::Start)),
        KeyCode::Char('p') => Some(Command::Input(Input::Pause)),
        KeyCode::Char('r') => Some(Command::Input(Input::Reset)),
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        _ => None,
    }
}

/// Blocking key reader; runs on its own thread until quit or `stop`.
fn read_keys(tx: mpsc::Sender<Command>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        match event::poll(KEY_POLL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                tracing::warn!("terminal input failed: {e}");
                let _ = tx.blocking_send(Command::Quit);
                return;
            }
        }
        let Ok(Event::Key(key)) = event::read() else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if let Some(cmd) = key_command(key.code, key.modifiers) {
            let quit = cmd == Command::Quit;
            if tx.blocking_send(cmd).is_err() || quit {
                return;
            }
        }
    }
}
