// src/timer/mod.rs — Client-side Pomodoro timer
//
// `machine` is the pure transition function, `render` turns state into
// display strings, `lifecycle` brackets a run with server calls, and
// `controller` wires them to a one-second clock.

pub mod controller;
pub mod cues;
pub mod lifecycle;
pub mod machine;
pub mod render;

pub use controller::{Command, TimerController};
pub use machine::{Effect, Input, Phase, Timer};
