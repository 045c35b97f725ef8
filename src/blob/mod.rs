//! Blob engine
//!
//! Stores one variably sized object across the data pages of an area with
//! a streaming, atomically committed write transaction. See
//! [`engine`] for the commit protocol and [`layout`] for page placement.

mod core;
mod descriptor;
mod engine;
mod errors;
pub mod layout;

pub use self::core::{BlobCore, SetVerdict};
pub use descriptor::{CommittedBlob, Descriptor, DESCRIPTOR_LEN};
pub use engine::{Blob, BlobInfo};
pub use errors::{BlobError, BlobResult};
pub use layout::{BlobLayout, PageRole, PageSet};
