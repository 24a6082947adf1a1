// src/test_utils.rs

//! This module contains utilities for testing.

/// A constant defining the tolerance within which floating-point values
/// are considered close enough to be equal.
pub const TEST_TOLERANCE: f64 = 1e-6;

/// Checks if two floating point numbers are close enough to be considered
/// equal.
///
/// # Arguments
/// * `target` - The target value.
/// * `value` - The value to compare against the target.
///
/// # Returns
/// `true` if the absolute difference between `target` and `value` is less than
/// `TEST_TOLERANCE`, otherwise `false`.
pub fn value_close(target: f64, value: f64) -> bool {
    (target - value).abs() < TEST_TOLERANCE
}

/// Checks if two floating point numbers are not close enough to be
/// considered equal.
pub fn value_not_close(target: f64, value: f64) -> bool {
    TEST_TOLERANCE <= (target - value).abs()
}

/// Checks if two values agree within an explicit tolerance.
pub fn value_within(target: f64, value: f64, tolerance: f64) -> bool {
    (target - value).abs() <= tolerance
}

/// Checks if each of the components in a (p, i, d) triple is close enough to
/// be considered equal.
pub fn triple_close(target: (f64, f64, f64), value: (f64, f64, f64)) -> bool {
    value_close(target.0, value.0)
        && value_close(target.1, value.1)
        && value_close(target.2, value.2)
}

thread_local! {
    static CAPTURED: std::cell::RefCell<Vec<String>> = std::cell::RefCell::new(Vec::new());
}

/// Logger that keeps each message on the thread that emitted it, so
/// parallel tests only see their own lines.
struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!("{}", record.args());
        CAPTURED.with(|captured| captured.borrow_mut().push(line));
    }

    fn flush(&self) {}
}

static CAPTURE_LOGGER: CaptureLogger = CaptureLogger;

/// Installs the capturing logger (once per process) and clears this
/// thread's buffer.
pub fn capture_logs() {
    let _ = log::set_logger(&CAPTURE_LOGGER);
    log::set_max_level(log::LevelFilter::Trace);
    CAPTURED.with(|captured| captured.borrow_mut().clear());
}

/// Drains the messages logged on this thread since the last call.
pub fn take_logs() -> Vec<String> {
    CAPTURED.with(|captured| captured.borrow_mut().drain(..).collect())
}
