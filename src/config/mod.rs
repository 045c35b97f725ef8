//! Settings and configuration
//!
//! `StorageSettings` is what an engine is initialized with. `FlashConfig`
//! is the JSON file the CLI reads; it resolves to `StorageSettings` plus
//! the image path and driver options.

mod errors;
mod file;
mod settings;

pub use errors::{ConfigError, ConfigResult};
pub use file::{EngineKind, FlashConfig};
pub use settings::{StorageSettings, DEFAULT_FORMAT_VERSION, DEFAULT_RETRY_COUNT};
