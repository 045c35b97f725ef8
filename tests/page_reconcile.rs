//! Page pair reconciliation tests
//!
//! Drives `PageStore::reconcile_pair` through every row of its decision
//! table on in-memory media, checking both the outcome and the media left
//! behind.

use flashsafe::io::{Callbacks, MemoryFlash, ReliableIo, StorageArea};
use flashsafe::page::{
    data_region, data_region_mut, page_type, sub_type, Health, PageMetadata, PageStore,
};

const PAGE: usize = 64;
const ORIG: u32 = 0;
const BACKUP: u32 = 1;

fn store(flash: &MemoryFlash) -> PageStore {
    let area = StorageArea {
        area_id: 7,
        page_size: PAGE,
        total_pages: flash.total_pages(),
    };
    PageStore::new(ReliableIo::new(area, Callbacks::new(flash.clone())), 3)
}

fn write(store: &mut PageStore, page: u32, text: &[u8], sequence: u32) {
    let mut buf = vec![0u8; PAGE];
    data_region_mut(&mut buf)[..text.len()].copy_from_slice(text);
    let meta = PageMetadata::new(page_type::LOG, sub_type::RECORD, 1)
        .with_byte_filled(text.len() as u32)
        .with_sequence(sequence);
    store.write_validated_page(page, &mut buf, &meta).unwrap();
}

fn buffers() -> (Vec<u8>, Vec<u8>) {
    (vec![0u8; PAGE], vec![0u8; PAGE])
}

#[test]
fn test_equal_pages_are_left_alone() {
    let flash = MemoryFlash::new(2, PAGE);
    let mut store = store(&flash);
    write(&mut store, ORIG, b"same", 1);
    write(&mut store, BACKUP, b"same", 1);
    let writes = flash.write_count();

    let (mut orig, mut backup) = buffers();
    let health = store
        .reconcile_pair(ORIG, BACKUP, &mut orig, &mut backup)
        .unwrap();
    assert_eq!(health, Health::Ok);
    assert_eq!(flash.write_count(), writes);
}

#[test]
fn test_differing_valid_pages_take_the_original() {
    let flash = MemoryFlash::new(2, PAGE);
    let mut store = store(&flash);
    write(&mut store, ORIG, b"new", 2);
    write(&mut store, BACKUP, b"old", 1);

    let (mut orig, mut backup) = buffers();
    let health = store
        .reconcile_pair(ORIG, BACKUP, &mut orig, &mut backup)
        .unwrap();
    assert_eq!(health, Health::BackupRecovered);
    assert_eq!(flash.page(BACKUP), flash.page(ORIG));
    assert_eq!(&data_region(&orig)[..3], b"new");
}

#[test]
fn test_damaged_original_is_restored_from_backup() {
    let flash = MemoryFlash::new(2, PAGE);
    let mut store = store(&flash);
    write(&mut store, ORIG, b"payload", 4);
    write(&mut store, BACKUP, b"payload", 4);
    flash.flip_bit(ORIG, 2, 0);

    let (mut orig, mut backup) = buffers();
    let health = store
        .reconcile_pair(ORIG, BACKUP, &mut orig, &mut backup)
        .unwrap();
    assert_eq!(health, Health::BackupRecovered);
    assert_eq!(flash.page(ORIG), flash.page(BACKUP));
    assert_eq!(&data_region(&orig)[..7], b"payload");
    assert_eq!(store.metrics().snapshot().pairs_recovered, 1);
}

#[test]
fn test_erased_backup_is_rewritten() {
    let flash = MemoryFlash::new(2, PAGE);
    let mut store = store(&flash);
    write(&mut store, ORIG, b"only copy", 9);

    let (mut orig, mut backup) = buffers();
    let health = store
        .reconcile_pair(ORIG, BACKUP, &mut orig, &mut backup)
        .unwrap();
    assert_eq!(health, Health::BackupRecovered);
    let meta = store.read_and_validate_page(BACKUP, &mut backup).unwrap();
    assert_eq!(meta.sequence_number, 9);
}

#[test]
fn test_both_invalid_is_an_error_and_untouched() {
    let flash = MemoryFlash::new(2, PAGE);
    let mut store = store(&flash);
    write(&mut store, ORIG, b"x", 1);
    write(&mut store, BACKUP, b"x", 1);
    flash.corrupt_byte(ORIG, 0);
    flash.wipe_page(BACKUP);
    let before = (flash.page(ORIG), flash.page(BACKUP));

    let (mut orig, mut backup) = buffers();
    let err = store
        .reconcile_pair(ORIG, BACKUP, &mut orig, &mut backup)
        .unwrap_err();
    assert!(err.is_not_valid());
    assert_eq!((flash.page(ORIG), flash.page(BACKUP)), before);
    assert_eq!(store.metrics().snapshot().pairs_corrupt, 1);
}

#[test]
fn test_torn_write_is_detected() {
    let flash = MemoryFlash::new(2, PAGE);
    let mut store = store(&flash);
    write(&mut store, BACKUP, b"intact", 3);
    flash.tear_next_writes(1);
    write(&mut store, ORIG, b"intact", 3);

    let mut buf = vec![0u8; PAGE];
    assert!(store
        .read_and_validate_page(ORIG, &mut buf)
        .unwrap_err()
        .is_not_valid());

    let (mut orig, mut backup) = buffers();
    assert_eq!(
        store
            .reconcile_pair(ORIG, BACKUP, &mut orig, &mut backup)
            .unwrap(),
        Health::BackupRecovered
    );
    assert!(store.read_and_validate_page(ORIG, &mut buf).is_ok());
}
