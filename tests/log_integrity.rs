//! Log engine integrity tests
//!
//! Covers:
//! - wraparound keeps the newest records in order
//! - reopening with and without the cursor cache
//! - roll-forward over records the cache missed
//! - power loss at every page write of an append

use flashsafe::log::LogError;
use flashsafe::{Callbacks, Health, Log, MemoryFlash, StorageSettings};

const PAGE: usize = 64;

// =============================================================================
// Test Utilities
// =============================================================================

#[derive(Clone, Copy, Debug)]
struct Shape {
    total: u32,
    full_backup: bool,
    flash_cache: bool,
}

const SHAPES: [Shape; 4] = [
    Shape {
        total: 4,
        full_backup: false,
        flash_cache: false,
    },
    Shape {
        total: 6,
        full_backup: false,
        flash_cache: true,
    },
    Shape {
        total: 8,
        full_backup: true,
        flash_cache: false,
    },
    Shape {
        total: 10,
        full_backup: true,
        flash_cache: true,
    },
];

fn open(flash: &MemoryFlash, shape: Shape) -> Log {
    let settings = StorageSettings::new(0, shape.total, PAGE)
        .with_full_backup(shape.full_backup)
        .with_flash_cache(shape.flash_cache);
    Log::init(settings, Callbacks::new(flash.clone())).unwrap()
}

fn formatted(shape: Shape) -> MemoryFlash {
    let flash = MemoryFlash::new(shape.total, PAGE);
    open(&flash, shape).format().unwrap();
    flash
}

fn record(sequence: u32) -> Vec<u8> {
    format!("record-{}", sequence).into_bytes()
}

/// Every record with its sequence number, oldest first
fn dump(log: &mut Log) -> Vec<(u32, Vec<u8>)> {
    let info = log.get_info().unwrap();
    let first = info.next_sequence.wrapping_sub(info.count);
    let mut out = [0u8; PAGE];
    (0..info.count)
        .map(|position| {
            let len = log.read(position, &mut out).unwrap();
            (first.wrapping_add(position), out[..len].to_vec())
        })
        .collect()
}

// =============================================================================
// Ordering and wraparound
// =============================================================================

#[test]
fn test_every_shape_has_four_slots() {
    for shape in SHAPES {
        let flash = formatted(shape);
        let mut log = open(&flash, shape);
        assert_eq!(log.get_storage_status().unwrap(), Health::Ok);
        assert_eq!(log.get_info().unwrap().capacity, 4, "{:?}", shape);
    }
}

#[test]
fn test_wraparound_keeps_newest() {
    for shape in SHAPES {
        let flash = formatted(shape);
        let mut log = open(&flash, shape);
        log.get_storage_status().unwrap();

        for sequence in 1..=10 {
            assert_eq!(log.append(&record(sequence)).unwrap(), sequence);
        }

        let records = dump(&mut log);
        let expected: Vec<_> = (7..=10).map(|s| (s, record(s))).collect();
        assert_eq!(records, expected, "{:?}", shape);

        let mut out = [0u8; PAGE];
        let len = log.read_latest(&mut out).unwrap();
        assert_eq!(&out[..len], record(10).as_slice());
    }
}

#[test]
fn test_reopen_recovers_same_cursor() {
    for shape in SHAPES {
        let flash = formatted(shape);
        let before = {
            let mut log = open(&flash, shape);
            log.get_storage_status().unwrap();
            for sequence in 1..=6 {
                log.append(&record(sequence)).unwrap();
            }
            log.get_info().unwrap()
        };

        let mut log = open(&flash, shape);
        assert_eq!(log.get_storage_status().unwrap(), Health::Ok);
        assert_eq!(log.get_info().unwrap(), before, "{:?}", shape);
        assert_eq!(log.append(&record(7)).unwrap(), 7);
    }
}

#[test]
fn test_partially_filled_log_after_reopen() {
    for shape in SHAPES {
        let flash = formatted(shape);
        {
            let mut log = open(&flash, shape);
            log.get_storage_status().unwrap();
            log.append(&record(1)).unwrap();
            log.append(&record(2)).unwrap();
        }
        let mut log = open(&flash, shape);
        log.get_storage_status().unwrap();
        assert_eq!(
            dump(&mut log),
            vec![(1, record(1)), (2, record(2))],
            "{:?}",
            shape
        );
    }
}

#[test]
fn test_unformatted_media_requires_format() {
    for shape in SHAPES {
        let flash = MemoryFlash::new(shape.total, PAGE);
        let mut log = open(&flash, shape);
        assert!(matches!(
            log.get_storage_status(),
            Err(LogError::BadParam { .. })
        ));
    }
}

// =============================================================================
// Cursor cache
// =============================================================================

#[test]
fn test_stale_cache_rolls_forward() {
    let shape = SHAPES[1];
    let flash = formatted(shape);
    let stale_cache = {
        let mut log = open(&flash, shape);
        log.get_storage_status().unwrap();
        log.append(&record(1)).unwrap();
        (flash.page(0), flash.page(1))
    };
    {
        let mut log = open(&flash, shape);
        log.get_storage_status().unwrap();
        log.append(&record(2)).unwrap();
        log.append(&record(3)).unwrap();
    }
    flash.set_page(0, &stale_cache.0);
    flash.set_page(1, &stale_cache.1);

    let mut log = open(&flash, shape);
    assert_eq!(log.get_storage_status().unwrap(), Health::BackupRecovered);
    assert_eq!(
        dump(&mut log),
        (1..=3).map(|s| (s, record(s))).collect::<Vec<_>>()
    );

    let mut again = open(&flash, shape);
    assert_eq!(again.get_storage_status().unwrap(), Health::Ok);
}

#[test]
fn test_lost_cache_is_rebuilt_by_scan() {
    let shape = SHAPES[1];
    let flash = formatted(shape);
    {
        let mut log = open(&flash, shape);
        log.get_storage_status().unwrap();
        for sequence in 1..=5 {
            log.append(&record(sequence)).unwrap();
        }
    }
    flash.wipe_page(0);
    flash.wipe_page(1);

    let mut log = open(&flash, shape);
    assert_eq!(log.get_storage_status().unwrap(), Health::BackupRecovered);
    assert_eq!(
        dump(&mut log),
        (2..=5).map(|s| (s, record(s))).collect::<Vec<_>>()
    );
}

#[test]
fn test_damaged_slot_falls_back_to_mirror() {
    let shape = SHAPES[2];
    let flash = formatted(shape);
    {
        let mut log = open(&flash, shape);
        log.get_storage_status().unwrap();
        log.append(&record(1)).unwrap();
    }
    flash.corrupt_byte(0, 3);

    let mut log = open(&flash, shape);
    assert_eq!(log.get_storage_status().unwrap(), Health::BackupRecovered);
    assert_eq!(dump(&mut log), vec![(1, record(1))]);
    assert_eq!(log.metrics().pairs_recovered, 1);
}

// =============================================================================
// Power loss
// =============================================================================

/// Cut power after every possible number of page writes during one append.
/// The recovered log must be a contiguous run of sequence numbers ending at
/// the last committed record or the interrupted one, with matching contents.
#[test]
fn test_power_loss_during_append() {
    for shape in SHAPES {
        for budget in 0..8 {
            let flash = formatted(shape);
            let mut log = open(&flash, shape);
            log.get_storage_status().unwrap();
            for sequence in 1..=5 {
                log.append(&record(sequence)).unwrap();
            }

            flash.power_loss_after_writes(budget);
            let appended = log.append(&record(6)).is_ok();
            flash.restore_power();

            let mut reopened = open(&flash, shape);
            reopened.get_storage_status().unwrap();
            let records = dump(&mut reopened);
            let last = records.last().map(|(s, _)| *s).unwrap_or(0);

            if appended {
                assert_eq!(last, 6, "{:?} budget {}", shape, budget);
            } else {
                assert!(last == 5 || last == 6, "{:?} budget {}", shape, budget);
            }
            assert!(records.len() >= 3, "{:?} budget {}", shape, budget);
            for (offset, (sequence, bytes)) in records.iter().enumerate() {
                assert_eq!(*sequence, last + 1 - (records.len() - offset) as u32);
                assert_eq!(bytes, &record(*sequence));
            }

            assert_eq!(reopened.append(&record(last + 1)).unwrap(), last + 1);
        }
    }
}
