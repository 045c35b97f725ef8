//! Page-level blob operations
//!
//! `BlobCore` knows the layout and how to check, repair, write and read the
//! pages of a blob. It holds no transaction state; that lives in
//! [`Blob`](super::Blob).

use std::sync::Arc;

use super::descriptor::{CommittedBlob, Descriptor, DESCRIPTOR_LEN};
use super::errors::{BlobError, BlobResult};
use super::layout::{BlobLayout, PageRole, PageSet};
use crate::config::StorageSettings;
use crate::crash_point::{maybe_crash, points};
use crate::io::{Callbacks, ReliableIo};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::page::{
    data_region, data_region_mut, page_type, sub_type, Health, PageMetadata, PageStore,
    CRC_BASE_SEED,
};

/// Result of checking one descriptor/data set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetVerdict {
    Consistent(CommittedBlob),
    Inconsistent(String),
    /// Descriptor written by a newer format version
    NewerVersion(u32),
}

pub struct BlobCore {
    store: PageStore,
    settings: StorageSettings,
    layout: BlobLayout,
    /// `[0]` stages outgoing data pages, `[1]` is for reads and descriptors
    scratch: [Vec<u8>; 2],
}

impl BlobCore {
    pub fn new(settings: StorageSettings, callbacks: Callbacks) -> BlobResult<Self> {
        settings
            .validate()
            .map_err(|e| BlobError::BadParam(e.to_string()))?;
        if settings.flash_cache {
            return Err(BlobError::BadParam(
                "flash_cache is not supported by the blob engine".into(),
            ));
        }

        let layout = BlobLayout::new(&settings);
        if layout.region() < DESCRIPTOR_LEN {
            return Err(BlobError::BadParam(format!(
                "page data region of {} bytes cannot hold a {}-byte descriptor",
                layout.region(),
                DESCRIPTOR_LEN
            )));
        }

        let io = ReliableIo::new(settings.area(), callbacks);
        Ok(Self {
            store: PageStore::new(io, settings.retry_count),
            settings,
            layout,
            scratch: [vec![0u8; settings.page_len], vec![0u8; settings.page_len]],
        })
    }

    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    pub fn layout(&self) -> &BlobLayout {
        &self.layout
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        self.store.metrics()
    }

    fn data_meta(&self) -> PageMetadata {
        PageMetadata::new(page_type::BLOB, sub_type::DATA, self.settings.format_version)
    }

    /// Write every page of the area: empty descriptors, empty data pages.
    pub fn format_pages(&mut self) -> BlobResult<()> {
        let total = self.settings.total_pages;
        let empty = CommittedBlob {
            descriptor: Descriptor::empty(),
            sequence_number: 0,
        };

        for page in 0..total {
            if page == total / 2 {
                maybe_crash(points::FORMAT_HALFWAY);
            }
            match self.layout.role(page) {
                PageRole::Descriptor => self.write_descriptor_page(page, &empty)?,
                role => {
                    let index = match role {
                        PageRole::Data { index } => index,
                        _ => 0,
                    };
                    let meta = self.data_meta().with_element_count(index);
                    let buf = &mut self.scratch[0];
                    buf.fill(0);
                    self.store.write_validated_page(page, buf, &meta)?;
                }
            }
        }
        Ok(())
    }

    /// Check the descriptor of `set` and every data page it names.
    pub fn verify_set(&mut self, set: PageSet) -> BlobResult<SetVerdict> {
        let page = self.layout.descriptor(set);
        let meta = match self.store.read_and_validate_page(page, &mut self.scratch[1]) {
            Ok(meta) => meta,
            Err(err) if err.is_not_valid() => return Ok(SetVerdict::Inconsistent(err.to_string())),
            Err(err) => return Err(err.into()),
        };

        if !meta.is_kind(page_type::BLOB, sub_type::DESCRIPTOR) {
            return Ok(SetVerdict::Inconsistent(format!(
                "page {} is not a blob descriptor",
                page
            )));
        }
        if meta.page_version > self.settings.format_version {
            return Ok(SetVerdict::NewerVersion(meta.page_version));
        }

        let committed = CommittedBlob {
            descriptor: Descriptor::decode(data_region(&self.scratch[1])),
            sequence_number: meta.sequence_number,
        };
        Ok(match self.check_extent(set, &committed)? {
            None => SetVerdict::Consistent(committed),
            Some(reason) => SetVerdict::Inconsistent(reason),
        })
    }

    /// Re-read the data pages `committed` names in `set` and check them
    /// against it. Returns the first problem found.
    pub fn check_extent(
        &mut self,
        set: PageSet,
        committed: &CommittedBlob,
    ) -> BlobResult<Option<String>> {
        let descriptor = committed.descriptor;
        if descriptor.bank > 1 {
            return Ok(Some(format!("bank {} out of range", descriptor.bank)));
        }
        if descriptor.page_count != self.layout.pages_for(descriptor.length)
            || descriptor.page_count > self.layout.bank_pages()
        {
            return Ok(Some(format!(
                "length {} does not fit {} data pages",
                descriptor.length, descriptor.page_count
            )));
        }

        let region = self.layout.region();
        let mut remaining = descriptor.length as usize;
        let mut crc = CRC_BASE_SEED;
        for index in 0..descriptor.page_count {
            let page = self.layout.data_page(set, descriptor.bank, index);
            let meta = match self.store.read_and_validate_page(page, &mut self.scratch[1]) {
                Ok(meta) => meta,
                Err(err) if err.is_not_valid() => return Ok(Some(err.to_string())),
                Err(err) => return Err(err.into()),
            };

            let filled = remaining.min(region);
            if !meta.is_kind(page_type::BLOB, sub_type::DATA)
                || meta.sequence_number != committed.sequence_number
                || meta.present_element_count != index
                || meta.byte_filled as usize != filled
            {
                return Ok(Some(format!(
                    "data page {} does not belong to sequence {}",
                    page, committed.sequence_number
                )));
            }
            crc = self
                .store
                .chain_crc(&data_region(&self.scratch[1])[..filled], crc)?;
            remaining -= filled;
        }

        if crc != descriptor.crc {
            return Ok(Some(format!(
                "payload crc {:#010x} does not match descriptor crc {:#010x}",
                crc, descriptor.crc
            )));
        }
        Ok(None)
    }

    /// Reconcile the descriptor pair and, with full backup, every mirrored
    /// data page of the committed extent. `source` holds the blob to keep.
    pub fn reconcile_extent(
        &mut self,
        source: PageSet,
        committed: &CommittedBlob,
    ) -> BlobResult<Health> {
        let other = source.other();
        let [orig_buf, backup_buf] = &mut self.scratch;

        let mut health = self.store.reconcile_pair(
            self.layout.descriptor(source),
            self.layout.descriptor(other),
            orig_buf,
            backup_buf,
        )?;

        if self.layout.full_backup() {
            let descriptor = committed.descriptor;
            for index in 0..descriptor.page_count {
                let pair_health = self.store.reconcile_pair(
                    self.layout.data_page(source, descriptor.bank, index),
                    self.layout.data_page(other, descriptor.bank, index),
                    orig_buf,
                    backup_buf,
                )?;
                health = health.merge(pair_health);
            }
        }
        Ok(health)
    }

    /// CRC of `data` continuing from `seed`
    pub fn chain_crc(&mut self, data: &[u8], seed: u32) -> BlobResult<u32> {
        Ok(self.store.chain_crc(data, seed)?)
    }

    /// Data region of the staging page
    pub fn staging_mut(&mut self) -> &mut [u8] {
        data_region_mut(&mut self.scratch[0])
    }

    /// Seal the staging page and write it as primary data page `index` of
    /// `bank`. Bytes past `filled` are zeroed.
    pub fn write_data_page(
        &mut self,
        bank: u32,
        index: u32,
        sequence_number: u32,
        filled: usize,
    ) -> BlobResult<()> {
        let region = self.layout.region();
        if filled > region {
            return Err(BlobError::BadParam(format!(
                "{} bytes filled exceeds page region {}",
                filled, region
            )));
        }
        let meta = self
            .data_meta()
            .with_byte_filled(filled as u32)
            .with_element_count(index)
            .with_sequence(sequence_number);
        let page = self.layout.data_page(PageSet::Primary, bank, index);

        let buf = &mut self.scratch[0];
        data_region_mut(buf)[filled..].fill(0);
        self.store.write_validated_page(page, buf, &meta)?;
        Ok(())
    }

    pub fn write_descriptor(&mut self, set: PageSet, committed: &CommittedBlob) -> BlobResult<()> {
        self.write_descriptor_page(self.layout.descriptor(set), committed)
    }

    fn write_descriptor_page(&mut self, page: u32, committed: &CommittedBlob) -> BlobResult<()> {
        let meta = PageMetadata::new(
            page_type::BLOB,
            sub_type::DESCRIPTOR,
            self.settings.format_version,
        )
        .with_byte_filled(DESCRIPTOR_LEN as u32)
        .with_sequence(committed.sequence_number);

        let buf = &mut self.scratch[1];
        buf.fill(0);
        committed.descriptor.encode_into(data_region_mut(buf));
        self.store.write_validated_page(page, buf, &meta)?;
        Ok(())
    }

    /// Copy the primary data pages of `committed` onto the backup set.
    pub fn clone_extent(&mut self, committed: &CommittedBlob) -> BlobResult<()> {
        let descriptor = committed.descriptor;
        for index in 0..descriptor.page_count {
            let src = self.layout.data_page(PageSet::Primary, descriptor.bank, index);
            let dst = self.layout.data_page(PageSet::Backup, descriptor.bank, index);
            self.store.clone_page(src, dst, &mut self.scratch[1])?;
        }
        Ok(())
    }

    /// Copy `out.len()` bytes starting at `offset` of the committed blob.
    pub fn read_range(
        &mut self,
        committed: &CommittedBlob,
        offset: usize,
        out: &mut [u8],
    ) -> BlobResult<()> {
        let region = self.layout.region();
        let mut position = offset;
        let mut done = 0;

        while done < out.len() {
            let index = (position / region) as u32;
            let within = position % region;
            let take = (region - within).min(out.len() - done);

            self.load_data_page(committed, index)?;
            out[done..done + take]
                .copy_from_slice(&data_region(&self.scratch[1])[within..within + take]);

            position += take;
            done += take;
        }
        Ok(())
    }

    /// Read data page `index` into `scratch[1]`, falling back to the backup
    /// set when the primary copy fails validation.
    fn load_data_page(&mut self, committed: &CommittedBlob, index: u32) -> BlobResult<()> {
        let bank = committed.descriptor.bank;
        let primary = self.layout.data_page(PageSet::Primary, bank, index);

        let meta = match self.store.read_and_validate_page(primary, &mut self.scratch[1]) {
            Ok(meta) => meta,
            Err(err) if err.is_not_valid() && self.layout.full_backup() => {
                let backup = self.layout.data_page(PageSet::Backup, bank, index);
                log_event_with_fields(
                    Event::BlobReadFallback,
                    &[
                        ("page", &primary.to_string()),
                        ("backup", &backup.to_string()),
                    ],
                );
                self.store
                    .read_and_validate_page(backup, &mut self.scratch[1])?
            }
            Err(err) => return Err(err.into()),
        };

        if meta.sequence_number != committed.sequence_number
            || meta.present_element_count != index
        {
            return Err(BlobError::CorruptContext(format!(
                "data page {} carries sequence {} (element {}), committed blob is sequence {}",
                primary, meta.sequence_number, meta.present_element_count, committed.sequence_number
            )));
        }
        Ok(())
    }
}
