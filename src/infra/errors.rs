// src/infra/errors.rs — Error types for pomotask

use thiserror::Error;

use crate::timer::machine::Phase;

#[derive(Error, Debug)]
pub enum PomoError {
    // Timer errors (caller mistakes, never retried)
    #[error("Cannot {action} while {from:?}")]
    InvalidTransition { from: Phase, action: &'static str },

    #[error("Duration {minutes} min is not one of the allowed values {allowed:?}")]
    UnsupportedDuration { minutes: u32, allowed: Vec<u32> },

    #[error("Selectors are locked while a session is {phase:?}")]
    SelectorsLocked { phase: Phase },

    // Lifecycle client errors (logged, non-fatal)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status} for {call}: {body}")]
    UnexpectedStatus {
        call: &'static str,
        status: u16,
        body: String,
    },

    #[error("No anti-forgery token found on the dashboard page")]
    MissingCsrfToken,

    // Request errors
    #[error("{0}")]
    Validation(String),

    #[error("{what} not found")]
    NotFound { what: &'static str },

    // Infra
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PomoError {
    /// True for failures of the begin/complete calls that the timer
    /// tolerates by degrading to local-only tracking.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PomoError::Http(_) | PomoError::UnexpectedStatus { .. } | PomoError::MissingCsrfToken
        )
    }
}
