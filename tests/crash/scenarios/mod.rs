//! Crash scenarios, one module per engine

mod blob;
mod format;
mod log;
