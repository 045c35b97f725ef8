//! Flash image backed by a regular file
//!
//! The image is `total_pages * page_size` bytes. Page writes use the same
//! bit-clearing rule as real NOR flash, so an image produced here behaves
//! like the media it stands in for. Every write is synced before the driver
//! reports success.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::driver::FlashDriver;
use super::memory::ERASED_BYTE;

/// File-backed flash driver
#[derive(Debug)]
pub struct FileFlash {
    path: PathBuf,
    file: File,
    page_size: usize,
    total_pages: u32,
}

impl FileFlash {
    /// Open an existing image or create an erased one.
    ///
    /// A shorter existing file is extended with erased bytes.
    pub fn open_or_create(
        path: impl AsRef<Path>,
        total_pages: u32,
        page_size: usize,
    ) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let wanted = total_pages as u64 * page_size as u64;
        let current = file.metadata()?.len();
        if current < wanted {
            file.seek(SeekFrom::Start(current))?;
            let fill = vec![ERASED_BYTE; (wanted - current) as usize];
            file.write_all(&fill)?;
            file.sync_all()?;
        }

        Ok(Self {
            path,
            file,
            page_size,
            total_pages,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn offset(&self, page: u32) -> Option<u64> {
        (page < self.total_pages).then(|| page as u64 * self.page_size as u64)
    }

    fn read_at(&mut self, page: u32, buf: &mut [u8]) -> io::Result<()> {
        let offset = self
            .offset(page)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "page out of range"))?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }

    fn write_at(&mut self, page: u32, data: &[u8]) -> io::Result<()> {
        let offset = self
            .offset(page)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "page out of range"))?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.sync_data()
    }
}

impl FlashDriver for FileFlash {
    fn erase(&mut self, _area_id: u32, page: u32, size: usize) -> bool {
        if size != self.page_size {
            return false;
        }
        self.write_at(page, &vec![ERASED_BYTE; size]).is_ok()
    }

    fn write(&mut self, _area_id: u32, page: u32, data: &[u8]) -> bool {
        if data.len() != self.page_size {
            return false;
        }
        let mut current = vec![0u8; self.page_size];
        if self.read_at(page, &mut current).is_err() {
            return false;
        }
        for (cell, byte) in current.iter_mut().zip(data) {
            *cell &= *byte;
        }
        self.write_at(page, &current).is_ok()
    }

    fn read(&mut self, _area_id: u32, page: u32, buf: &mut [u8]) -> bool {
        buf.len() == self.page_size && self.read_at(page, buf).is_ok()
    }
}
