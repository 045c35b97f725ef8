//! Page codec and validator
//!
//! A page is a data region followed by a fixed trailer (see
//! [`metadata`]). A page is valid when its magic matches and its CRC checks
//! out. Engines keep critical pages in original/backup pairs and use
//! [`PageStore::reconcile_pair`] to bring a pair back into agreement after a
//! power loss.

mod codec;
mod errors;
mod health;
pub mod metadata;
mod store;

pub use codec::{check_page, compute_crc, set_crc_and_encode};
pub use errors::{PageError, PageResult};
pub use health::Health;
pub use metadata::{
    data_region, data_region_len, data_region_mut, page_type, sequence_is_newer, sub_type,
    PageMetadata, CRC_BASE_SEED, METADATA_SIZE, PAGE_MAGIC,
};
pub use store::PageStore;
