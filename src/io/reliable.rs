//! Retrying page I/O over an injected driver
//!
//! Every erase, write and read is attempted up to `retry` times. A write
//! attempt only counts when the driver accepted it and, with write-verify
//! enabled, the page reads back byte-identical.

use std::sync::Arc;

use super::driver::Callbacks;
use super::errors::{IoError, IoResult};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// The physical region an engine works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageArea {
    /// Opaque identifier passed through to the driver
    pub area_id: u32,
    /// Page size in bytes
    pub page_size: usize,
    /// Number of pages in the area
    pub total_pages: u32,
}

/// Run `op` until it succeeds or `attempts` runs out.
///
/// `op` receives the 1-based attempt number. Returns the attempt that
/// succeeded, or `None` when every attempt failed.
pub fn retry<F>(attempts: u32, mut op: F) -> Option<u32>
where
    F: FnMut(u32) -> bool,
{
    (1..=attempts).find(|&attempt| op(attempt))
}

/// Reliable I/O over one storage area
pub struct ReliableIo {
    area: StorageArea,
    callbacks: Callbacks,
    metrics: Arc<MetricsRegistry>,
}

impl ReliableIo {
    pub fn new(area: StorageArea, callbacks: Callbacks) -> Self {
        Self {
            area,
            callbacks,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// The area this instance talks to
    pub fn area(&self) -> &StorageArea {
        &self.area
    }

    /// Whether writes are verified by reading them back
    pub fn write_verify(&self) -> bool {
        self.callbacks.write_verify()
    }

    /// Counters shared with the owning engine
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Erase one page.
    ///
    /// # Errors
    ///
    /// - `BadParam` if `page` is out of range or `retry == 0`
    /// - `EraseCallback` if every attempt failed
    pub fn erase_page(&mut self, page: u32, retry_count: u32) -> IoResult<()> {
        self.check_request(page, retry_count)?;

        let StorageArea {
            area_id, page_size, ..
        } = self.area;
        let driver = self.callbacks.driver_mut();
        let metrics = &self.metrics;

        let outcome = retry(retry_count, |attempt| {
            let ok = driver.erase(area_id, page, page_size);
            note_attempt(metrics, "erase", page, attempt, retry_count, ok);
            ok
        });

        match outcome {
            Some(_) => {
                self.metrics.increment_pages_erased();
                Ok(())
            }
            None => Err(self.exhausted(
                "erase",
                IoError::EraseCallback {
                    page,
                    attempts: retry_count,
                },
            )),
        }
    }

    /// Write one full page, verifying it when write-verify is enabled.
    ///
    /// `verify_buf` receives the read-back and must be page sized when
    /// write-verify is on; it is untouched otherwise.
    ///
    /// # Errors
    ///
    /// - `BadParam` if `page` is out of range, `retry == 0`, or a buffer is
    ///   not page sized
    /// - `WriteCallback` if no attempt both wrote and verified
    pub fn write_page(
        &mut self,
        page: u32,
        data: &[u8],
        verify_buf: &mut [u8],
        retry_count: u32,
    ) -> IoResult<()> {
        self.check_request(page, retry_count)?;
        self.check_len("write buffer", data.len())?;
        let verify = self.callbacks.write_verify();
        if verify {
            self.check_len("verify buffer", verify_buf.len())?;
        }

        let area_id = self.area.area_id;
        let driver = self.callbacks.driver_mut();
        let metrics = &self.metrics;

        let outcome = retry(retry_count, |attempt| {
            let ok = driver.write(area_id, page, data)
                && (!verify || (driver.read(area_id, page, verify_buf) && verify_buf == data));
            note_attempt(metrics, "write", page, attempt, retry_count, ok);
            ok
        });

        match outcome {
            Some(_) => {
                self.metrics.increment_pages_written();
                Ok(())
            }
            None => Err(self.exhausted(
                "write",
                IoError::WriteCallback {
                    page,
                    attempts: retry_count,
                },
            )),
        }
    }

    /// Read one full page into `buf`.
    ///
    /// # Errors
    ///
    /// - `BadParam` if `page` is out of range, `retry == 0`, or `buf` is
    ///   not page sized
    /// - `ReadCallback` if every attempt failed
    pub fn read_page(&mut self, page: u32, buf: &mut [u8], retry_count: u32) -> IoResult<()> {
        self.check_request(page, retry_count)?;
        self.check_len("read buffer", buf.len())?;

        let area_id = self.area.area_id;
        let driver = self.callbacks.driver_mut();
        let metrics = &self.metrics;

        let outcome = retry(retry_count, |attempt| {
            let ok = driver.read(area_id, page, buf);
            note_attempt(metrics, "read", page, attempt, retry_count, ok);
            ok
        });

        match outcome {
            Some(_) => {
                self.metrics.increment_pages_read();
                Ok(())
            }
            None => Err(self.exhausted(
                "read",
                IoError::ReadCallback {
                    page,
                    attempts: retry_count,
                },
            )),
        }
    }

    /// One invocation of the CRC callback, no retry.
    pub fn calc_crc32(&mut self, data: &[u8], seed: u32) -> IoResult<u32> {
        self.callbacks
            .driver_mut()
            .crc32(seed, data)
            .ok_or(IoError::CrcCallback)
    }

    /// CRC callback wrapped in the retry combinator.
    pub fn calc_crc32_retry(&mut self, data: &[u8], seed: u32, retry_count: u32) -> IoResult<u32> {
        if retry_count == 0 {
            return Err(IoError::BadParam("retry count must be at least 1".into()));
        }

        let driver = self.callbacks.driver_mut();
        let mut value = None;
        retry(retry_count, |_| {
            value = driver.crc32(seed, data);
            value.is_some()
        });

        value.ok_or_else(|| self.exhausted("crc", IoError::CrcCallback))
    }

    fn check_request(&self, page: u32, retry_count: u32) -> IoResult<()> {
        if page >= self.area.total_pages {
            return Err(IoError::BadParam(format!(
                "page index {} out of range (area has {} pages)",
                page, self.area.total_pages
            )));
        }
        if retry_count == 0 {
            return Err(IoError::BadParam("retry count must be at least 1".into()));
        }
        Ok(())
    }

    fn check_len(&self, what: &str, len: usize) -> IoResult<()> {
        if len != self.area.page_size {
            return Err(IoError::BadParam(format!(
                "{} is {} bytes, page size is {}",
                what, len, self.area.page_size
            )));
        }
        Ok(())
    }

    fn exhausted(&self, op: &str, err: IoError) -> IoError {
        self.metrics.increment_io_failures();
        log_event_with_fields(
            Event::IoExhausted,
            &[("op", op), ("error", &err.to_string())],
        );
        err
    }
}

fn note_attempt(
    metrics: &MetricsRegistry,
    op: &str,
    page: u32,
    attempt: u32,
    budget: u32,
    ok: bool,
) {
    if ok || attempt >= budget {
        return;
    }
    metrics.increment_io_retries();
    log_event_with_fields(
        Event::IoRetry,
        &[
            ("op", op),
            ("page", &page.to_string()),
            ("attempt", &attempt.to_string()),
        ],
    );
}
