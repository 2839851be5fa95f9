// src/lib.rs — Library root for pomotask

pub mod api;
pub mod auth;
pub mod cli;
pub mod infra;
pub mod stats;
pub mod store;
pub mod timer;
