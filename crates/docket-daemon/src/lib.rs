//! Docket daemon library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations

pub mod cli;
pub mod commands;

pub use cli::{AdminCommands, Cli, Commands};
pub use commands::{
    handle_admin, init_tracing, load_settings, run_ingest, run_reindex, run_search, show_status,
    start_daemon, stop_daemon, StartOptions,
};
