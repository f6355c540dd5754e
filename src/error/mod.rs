// Error types for the audio-reactive capture front end
//
// This module defines the error type for capture and analysis setup,
// providing structured error handling with numeric codes that can be
// reported through the pipeline's status query.

mod capture;

pub use capture::{log_capture_error, CaptureError, CaptureErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent reporting from status
/// queries and the CLI.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
