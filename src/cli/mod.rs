//! CLI module for flashsafe
//!
//! Drives either engine over a flash image file:
//! - format, status, info: both engines
//! - blob-write, blob-read: blob engine
//! - log-append, log-dump: log engine

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
