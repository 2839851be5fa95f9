// src/timer/cues.rs — Completion chime and notifications

use std::io::Write;

/// One note of the completion chime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration_ms: u64,
}

/// C5, E5, G5 rising arpeggio; synthesized, no audio asset needed.
pub const CHIME: [Tone; 3] = [
    Tone {
        frequency_hz: 523.25,
        duration_ms: 150,
    },
    Tone {
        frequency_hz: 659.25,
        duration_ms: 150,
    },
    Tone {
        frequency_hz: 783.99,
        duration_ms: 300,
    },
];

/// Audible and visual cues played when a run completes.
pub trait Cues: Send + Sync {
    fn chime(&self) -> anyhow::Result<()>;

    fn notifications_permitted(&self) -> bool;

    fn notify(&self, title: &str, body: &str) -> anyhow::Result<()>;
}

/// Terminal cues: one bell per chime tone, notification printed to stderr.
pub struct TerminalCues {
    notifications: bool,
}

impl TerminalCues {
    pub fn new(notifications: bool) -> Self {
        Self { notifications }
    }
}

impl Cues for TerminalCues {
    fn chime(&self) -> anyhow::Result<()> {
        let mut out = std::io::stderr().lock();
        for tone in CHIME {
            tracing::trace!(hz = tone.frequency_hz, ms = tone.duration_ms, "chime tone");
            out.write_all(b"\x07")?;
        }
        out.flush()?;
        Ok(())
    }

    fn notifications_permitted(&self) -> bool {
        self.notifications
    }

    fn notify(&self, title: &str, body: &str) -> anyhow::Result<()> {
        let mut out = std::io::stderr().lock();
        write!(out, "\r\n[{title}] {body}\r\n")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chime_is_rising_three_tone() {
        assert_eq!(CHIME.len(), 3);
        assert!(CHIME
            .windows(2)
            .all(|w| w[0].frequency_hz < w[1].frequency_hz));
        let total: u64 = CHIME.iter().map(|t| t.duration_ms).sum();
        assert_eq!(total, 600);
    }

    #[test]
    fn test_terminal_permission_flag() {
        assert!(TerminalCues::new(true).notifications_permitted());
        assert!(!TerminalCues::new(false).notifications_permitted());
    }
}
