//! Log crash scenarios
//!
//! - Crash after the record write: the record is found on restart
//! - Crash between the two cache copies: the pair is repaired

use crate::crash::harness::{report_failure, run_flashsafe, run_with_crash_point};
use crate::crash::utils::TestImage;
use flashsafe::crash_point::points;

fn prepare(full_backup: bool, flash_cache: bool, records: &[&str]) -> TestImage {
    let image = TestImage::log(full_backup, flash_cache);
    run_flashsafe(image.config(), "format", &[]).data();
    for record in records {
        run_flashsafe(image.config(), "log-append", &["--data", record]).data();
    }
    image
}

fn dump(image: &TestImage) -> Vec<String> {
    let data = run_flashsafe(image.config(), "log-dump", &[]).data();
    data["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["data"].as_str().unwrap().to_string())
        .collect()
}

fn crash_append(crash_point: &str, image: &TestImage, record: &str) {
    let run = run_with_crash_point(crash_point, image.config(), "log-append", &["--data", record]);
    if !run.crashed() {
        report_failure(crash_point, "log-append", "process abort", &run);
        panic!("crash point {} did not fire", crash_point);
    }
}

#[test]
fn test_crash_after_record_write_rolls_forward() {
    for (full_backup, flash_cache) in [(false, false), (false, true), (true, true)] {
        let image = prepare(full_backup, flash_cache, &["one", "two"]);
        crash_append(points::LOG_AFTER_RECORD_WRITE, &image, "three");
        assert_eq!(dump(&image), ["one", "two", "three"]);

        run_flashsafe(image.config(), "log-append", &["--data", "four"]).data();
        assert_eq!(dump(&image), ["one", "two", "three", "four"]);
    }
}

#[test]
fn test_crash_between_cache_copies() {
    let image = prepare(false, true, &["a"]);
    crash_append(points::LOG_AFTER_CACHE_ORIGINAL, &image, "b");

    let status = run_flashsafe(image.config(), "status", &[]).data();
    assert_eq!(status["health"], "backup_recovered");
    assert_eq!(status["info"]["count"], 2);
    assert_eq!(status["info"]["next_sequence"], 3);
    assert_eq!(dump(&image), ["a", "b"]);
}

#[test]
fn test_crash_after_wraparound_keeps_newest() {
    let image = prepare(true, true, &["r1", "r2", "r3", "r4", "r5"]);
    crash_append(points::LOG_AFTER_RECORD_WRITE, &image, "r6");
    assert_eq!(dump(&image), ["r3", "r4", "r5", "r6"]);
}

#[test]
fn test_blob_command_on_log_image_is_refused() {
    let image = prepare(false, true, &[]);
    let output = image.path("out.bin");
    let run = run_flashsafe(
        image.config(),
        "blob-read",
        &["--output", output.to_str().unwrap()],
    );
    assert!(!run.status.success());
    assert_eq!(run.error_code().as_deref(), Some("FLASH_CLI_WRONG_ENGINE"));
}
