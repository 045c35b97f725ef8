//! Log engine
//!
//! A bounded ring of records with an optional cursor cache pair and
//! optional mirrored slots.

mod cache;
mod core;
mod engine;
mod errors;
pub mod layout;
mod ring;

pub use self::core::{LogCore, SlotContent};
pub use cache::{LogCache, CACHE_LEN};
pub use engine::{Log, LogInfo};
pub use errors::{LogError, LogResult};
pub use layout::LogLayout;
pub use ring::Ring;
