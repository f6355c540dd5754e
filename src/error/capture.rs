// Capture and analysis setup error types

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Capture error code constants
///
/// Single source of truth for the numeric codes reported by
/// [`CaptureError::code`] and surfaced through the pipeline status.
///
/// Error code range: 2001-2012
pub struct CaptureErrorCodes {}

impl CaptureErrorCodes {
    /// Channel selector is outside the range supported by the source
    pub const INVALID_CHANNEL: i32 = 2001;

    /// Sample rate must be greater than zero
    pub const INVALID_SAMPLE_RATE: i32 = 2002;

    /// Frame size must be a non-zero power of two
    pub const INVALID_FRAME_SIZE: i32 = 2003;

    /// Window table length differs from the frame length
    pub const WINDOW_LENGTH_MISMATCH: i32 = 2004;

    /// Band count is zero or larger than the usable spectrum
    pub const INVALID_BAND_COUNT: i32 = 2005;

    /// Decibel range is empty or inverted
    pub const INVALID_DECIBEL_RANGE: i32 = 2006;

    /// Failed to open the acquisition stream
    pub const STREAM_OPEN_FAILED: i32 = 2007;

    /// Acquisition hardware reported an error
    pub const HARDWARE_ERROR: i32 = 2008;

    /// Operation requires an initialized pipeline
    pub const NOT_INITIALIZED: i32 = 2009;

    /// WAV input could not be read
    pub const WAV_READ: i32 = 2010;

    /// Smoothing coefficient is outside (0, 1]
    pub const INVALID_SMOOTHING: i32 = 2011;

    /// Full-scale divisor is not a finite positive number
    pub const INVALID_FULL_SCALE: i32 = 2012;
}

/// Log a capture error with structured context
///
/// Logs the numeric code, component and message so that status failures
/// can be correlated with the control loop that observed them.
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_capture_error(err: &CaptureError, context: &str) {
    error!(
        "Capture error in {}: code={}, component=CaptureManager, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Capture and configuration errors
///
/// Configuration variants are detected at initialization and keep the
/// pipeline from reporting itself initialized. Stream variants come from
/// the acquisition source.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// Channel selector is not available on the source
    InvalidChannel { channel: u8 },

    /// Sample rate is zero
    InvalidSampleRate { rate: u32 },

    /// Frame size is zero or not a power of two
    InvalidFrameSize { size: usize },

    /// Window table and frame lengths differ
    WindowLengthMismatch { frame: usize, window: usize },

    /// Band count is zero or exceeds half the frame size
    InvalidBandCount { bands: usize, max: usize },

    /// min_db must be strictly below max_db and both finite
    InvalidDecibelRange { min_db: f32, max_db: f32 },

    /// Failed to open the acquisition stream
    StreamOpenFailed { reason: String },

    /// Hardware error occurred
    HardwareError { details: String },

    /// Pipeline was used before a successful initialization
    NotInitialized,

    /// WAV input could not be opened or decoded
    WavRead { reason: String },

    /// Smoothing coefficient must lie in (0, 1]
    InvalidSmoothing { smoothing: f32 },

    /// Full-scale divisor must be finite and positive
    InvalidFullScale { full_scale: f32 },
}

impl ErrorCode for CaptureError {
    fn code(&self) -> i32 {
        match self {
            CaptureError::InvalidChannel { .. } => CaptureErrorCodes::INVALID_CHANNEL,
            CaptureError::InvalidSampleRate { .. } => CaptureErrorCodes::INVALID_SAMPLE_RATE,
            CaptureError::InvalidFrameSize { .. } => CaptureErrorCodes::INVALID_FRAME_SIZE,
            CaptureError::WindowLengthMismatch { .. } => {
                CaptureErrorCodes::WINDOW_LENGTH_MISMATCH
            }
            CaptureError::InvalidBandCount { .. } => CaptureErrorCodes::INVALID_BAND_COUNT,
            CaptureError::InvalidDecibelRange { .. } => CaptureErrorCodes::INVALID_DECIBEL_RANGE,
            CaptureError::StreamOpenFailed { .. } => CaptureErrorCodes::STREAM_OPEN_FAILED,
            CaptureError::HardwareError { .. } => CaptureErrorCodes::HARDWARE_ERROR,
            CaptureError::NotInitialized => CaptureErrorCodes::NOT_INITIALIZED,
            CaptureError::WavRead { .. } => CaptureErrorCodes::WAV_READ,
            CaptureError::InvalidSmoothing { .. } => CaptureErrorCodes::INVALID_SMOOTHING,
            CaptureError::InvalidFullScale { .. } => CaptureErrorCodes::INVALID_FULL_SCALE,
        }
    }

    fn message(&self) -> String {
        match self {
            CaptureError::InvalidChannel { channel } => {
                format!("Input channel {} is not available", channel)
            }
            CaptureError::InvalidSampleRate { rate } => {
                format!("Sample rate must be greater than 0 (got {})", rate)
            }
            CaptureError::InvalidFrameSize { size } => {
                format!("Frame size must be a non-zero power of two (got {})", size)
            }
            CaptureError::WindowLengthMismatch { frame, window } => {
                format!(
                    "Window table has {} coefficients but frames hold {} samples",
                    window, frame
                )
            }
            CaptureError::InvalidBandCount { bands, max } => {
                format!("Band count must be in 1..={} (got {})", max, bands)
            }
            CaptureError::InvalidDecibelRange { min_db, max_db } => {
                format!(
                    "Decibel range must satisfy min < max (got {} .. {})",
                    min_db, max_db
                )
            }
            CaptureError::StreamOpenFailed { reason } => {
                format!("Failed to open capture stream: {}", reason)
            }
            CaptureError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            CaptureError::NotInitialized => {
                "Pipeline not initialized. Check status() for the setup error.".to_string()
            }
            CaptureError::WavRead { reason } => {
                format!("Failed to read WAV input: {}", reason)
            }
            CaptureError::InvalidSmoothing { smoothing } => {
                format!("Smoothing must be in (0, 1] (got {})", smoothing)
            }
            CaptureError::InvalidFullScale { full_scale } => {
                format!("Full scale must be a positive number (got {})", full_scale)
            }
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CaptureError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CaptureError {}
