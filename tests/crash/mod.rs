//! Crash testing framework for flashsafe
//!
//! - Subprocess management with crash injection via env var
//! - Temp image and config setup
//! - Post-crash validation through the CLI's JSON responses

pub mod harness;
pub mod scenarios;
pub mod utils;

pub use harness::*;
pub use utils::*;
