//! Format crash scenarios
//!
//! A format interrupted halfway is finished by running format again.

use crate::crash::harness::{run_flashsafe, run_with_crash_point};
use crate::crash::utils::TestImage;
use flashsafe::crash_point::points;

#[test]
fn test_interrupted_format_is_repeatable() {
    for image in [TestImage::blob(true), TestImage::log(false, true)] {
        let run = run_with_crash_point(points::FORMAT_HALFWAY, image.config(), "format", &[]);
        assert!(run.crashed());
        assert!(image.image().exists());

        run_flashsafe(image.config(), "format", &[]).data();
        let status = run_flashsafe(image.config(), "status", &[]).data();
        assert_eq!(status["health"], "ok");
    }
}

#[test]
fn test_unformatted_image_reports_error() {
    let image = TestImage::blob(false);
    let run = run_flashsafe(image.config(), "status", &[]);
    assert!(!run.status.success());
    assert_eq!(run.error_code().as_deref(), Some("FLASH_BLOB_NOT_VALID"));
}
