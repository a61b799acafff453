//! Capture metrics recorded through the `metrics` facade
//!
//! Nothing is exported from here; whichever recorder the host process
//! installs receives these. With no recorder they are no-ops.

use crate::{ErrorKind, SanitizeReport};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Duration;

pub const RENDERS_TOTAL: &str = "site_capture_renders_total";
pub const RENDER_DURATION_SECONDS: &str = "site_capture_render_duration_seconds";
pub const CAPTURED_BYTES_TOTAL: &str = "site_capture_captured_bytes_total";
pub const SANITIZED_ELEMENTS_TOTAL: &str = "site_capture_sanitized_elements_total";
pub const SANITIZER_FAILURES_TOTAL: &str = "site_capture_sanitizer_failures_total";

/// Register descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(RENDERS_TOTAL, "Render requests by outcome");
    describe_histogram!(
        RENDER_DURATION_SECONDS,
        Unit::Seconds,
        "End-to-end processing time per render request"
    );
    describe_counter!(CAPTURED_BYTES_TOTAL, Unit::Bytes, "PNG bytes produced");
    describe_counter!(SANITIZED_ELEMENTS_TOTAL, "Clutter elements removed before capture");
    describe_counter!(SANITIZER_FAILURES_TOTAL, "Non-fatal sanitizer failures");
}

pub fn record_render(outcome: Result<usize, ErrorKind>, elapsed: Duration) {
    let label = match outcome {
        Ok(bytes) => {
            counter!(CAPTURED_BYTES_TOTAL, bytes as u64);
            "success"
        }
        Err(kind) => kind.as_str(),
    };

    counter!(RENDERS_TOTAL, 1, "outcome" => label);
    histogram!(RENDER_DURATION_SECONDS, elapsed.as_secs_f64(), "outcome" => label);
}

pub fn record_sanitize(report: &SanitizeReport) {
    counter!(SANITIZED_ELEMENTS_TOTAL, report.removed as u64);
    if !report.failures.is_empty() {
        counter!(SANITIZER_FAILURES_TOTAL, report.failures.len() as u64);
    }
}
