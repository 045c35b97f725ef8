//! Page CRC computation and sealing

use super::errors::PageResult;
use super::metadata::{PageMetadata, CRC_BASE_SEED, CRC_SIZE};
use crate::io::ReliableIo;

/// CRC over the whole page except the trailing CRC field.
pub fn compute_crc(io: &mut ReliableIo, page: &[u8], retry_count: u32) -> PageResult<u32> {
    let covered = page.len().saturating_sub(CRC_SIZE);
    Ok(io.calc_crc32_retry(&page[..covered], CRC_BASE_SEED, retry_count)?)
}

/// Encode `meta` into `page` with a freshly computed CRC.
///
/// Returns the trailer as written, CRC included.
pub fn set_crc_and_encode(
    io: &mut ReliableIo,
    page: &mut [u8],
    meta: &PageMetadata,
    retry_count: u32,
) -> PageResult<PageMetadata> {
    let mut sealed = PageMetadata { crc: 0, ..*meta };
    sealed.encode(page)?;
    sealed.crc = compute_crc(io, page, retry_count)?;

    let crc_at = page.len() - CRC_SIZE;
    page[crc_at..].copy_from_slice(&sealed.crc.to_le_bytes());
    Ok(sealed)
}

/// Check magic and CRC of a detached buffer.
pub fn check_page(
    io: &mut ReliableIo,
    page: &[u8],
    retry_count: u32,
) -> PageResult<Result<PageMetadata, &'static str>> {
    let meta = PageMetadata::decode(page)?;
    if !meta.has_magic() {
        return Ok(Err("magic mismatch"));
    }
    if compute_crc(io, page, retry_count)? != meta.crc {
        return Ok(Err("crc mismatch"));
    }
    Ok(Ok(meta))
}
