//! flashsafe - fail-safe storage on raw flash pages
//!
//! Two engines share one page format:
//! - [`blob::Blob`]: one blob, replaced atomically
//! - [`log::Log`]: a bounded ring of records
//!
//! Media access goes through a [`io::FlashDriver`] supplied by the caller.

pub mod blob;
pub mod cli;
pub mod config;
pub mod crash_point;
pub mod io;
pub mod log;
pub mod observability;
pub mod page;

pub use blob::{Blob, BlobError, BlobInfo};
pub use config::{FlashConfig, StorageSettings};
pub use io::{Callbacks, FileFlash, FlashDriver, MemoryFlash};
pub use log::{Log, LogError, LogInfo};
pub use page::Health;
