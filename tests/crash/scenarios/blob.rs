//! Blob crash scenarios
//!
//! - Crash before the primary descriptor: the old blob survives
//! - Crash after the primary descriptor: the new blob survives and the
//!   backup set is repaired by the next status check

use std::fs;

use crate::crash::harness::{report_failure, run_flashsafe, run_with_crash_point};
use crate::crash::utils::{payload, TestImage};
use flashsafe::crash_point::points;

fn prepare(full_backup: bool, old: &[u8]) -> TestImage {
    let image = TestImage::blob(full_backup);
    run_flashsafe(image.config(), "format", &[]).data();
    let input = image.write_file("old.bin", old);
    run_flashsafe(
        image.config(),
        "blob-write",
        &["--input", input.to_str().unwrap()],
    )
    .data();
    image
}

fn read_back(image: &TestImage) -> Vec<u8> {
    let output = image.path("out.bin");
    run_flashsafe(
        image.config(),
        "blob-read",
        &["--output", output.to_str().unwrap()],
    )
    .data();
    fs::read(output).unwrap()
}

fn crash_during_write(crash_point: &str, full_backup: bool) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let old = payload(150, 1);
    let new = payload(200, 2);
    let image = prepare(full_backup, &old);

    let input = image.write_file("new.bin", &new);
    let run = run_with_crash_point(
        crash_point,
        image.config(),
        "blob-write",
        &["--input", input.to_str().unwrap(), "--chunk", "33"],
    );
    if !run.crashed() {
        report_failure(crash_point, "blob-write", "process abort", &run);
        panic!("crash point {} did not fire", crash_point);
    }

    (old, new, read_back(&image))
}

#[test]
fn test_crash_after_data_pages_keeps_old_blob() {
    for full_backup in [false, true] {
        let (old, _, contents) = crash_during_write(points::BLOB_AFTER_DATA_PAGES, full_backup);
        assert_eq!(contents, old);
    }
}

#[test]
fn test_crash_after_primary_descriptor_keeps_new_blob() {
    for full_backup in [false, true] {
        let (_, new, contents) =
            crash_during_write(points::BLOB_AFTER_PRIMARY_DESCRIPTOR, full_backup);
        assert_eq!(contents, new);
    }
}

#[test]
fn test_crash_before_backup_descriptor_keeps_new_blob() {
    for full_backup in [false, true] {
        let (_, new, contents) = crash_during_write(points::BLOB_AFTER_BACKUP_DATA, full_backup);
        assert_eq!(contents, new);
    }
}

#[test]
fn test_status_after_crash_reports_recovery_once() {
    let old = payload(20, 5);
    let image = prepare(true, &old);
    let input = image.write_file("new.bin", b"replacement");
    let run = run_with_crash_point(
        points::BLOB_AFTER_PRIMARY_DESCRIPTOR,
        image.config(),
        "blob-write",
        &["--input", input.to_str().unwrap()],
    );
    assert!(run.crashed());

    let first = run_flashsafe(image.config(), "status", &[]).data();
    assert_eq!(first["health"], "backup_recovered");
    assert_eq!(first["info"]["size"], 11);
    assert_eq!(first["info"]["sequence_number"], 2);

    let second = run_flashsafe(image.config(), "status", &[]).data();
    assert_eq!(second["health"], "ok");
}

#[test]
fn test_oversized_blob_is_rejected() {
    let image = prepare(true, b"small");
    let info = run_flashsafe(image.config(), "info", &[]).data();
    let capacity = info["capacity"].as_u64().unwrap() as usize;

    let input = image.write_file("big.bin", &payload(capacity + 1, 3));
    let run = run_flashsafe(
        image.config(),
        "blob-write",
        &["--input", input.to_str().unwrap()],
    );
    assert!(!run.status.success());
    assert_eq!(run.error_code().as_deref(), Some("FLASH_BLOB_BAD_PARAM"));
    assert_eq!(read_back(&image), b"small");
}

#[test]
fn test_read_offset_past_end_is_rejected() {
    let image = prepare(false, b"small");
    let output = image.path("tail.bin");

    let run = run_flashsafe(
        image.config(),
        "blob-read",
        &["--output", output.to_str().unwrap(), "--offset", "6"],
    );
    assert!(!run.status.success());
    assert_eq!(run.error_code().as_deref(), Some("FLASH_BLOB_BAD_PARAM"));
    assert!(!output.exists());

    let data = run_flashsafe(
        image.config(),
        "blob-read",
        &["--output", output.to_str().unwrap(), "--offset", "5"],
    )
    .data();
    assert_eq!(data["read"], 0);
    assert_eq!(fs::read(&output).unwrap(), b"");
}
