//! Reliable I/O layer
//!
//! Wraps the externally supplied page driver with retries, optional
//! write-verify and range checks. Two drivers ship with the crate: an
//! in-memory one with fault injection and a file-backed image.

mod driver;
mod errors;
mod file;
mod memory;
mod reliable;

pub use driver::{crc32_with_seed, Callbacks, FlashDriver};
pub use errors::{IoError, IoResult};
pub use file::FileFlash;
pub use memory::{MemoryFlash, ERASED_BYTE};
pub use reliable::{retry, ReliableIo, StorageArea};
