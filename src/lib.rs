// Audio Reactive Core - signal acquisition and spectral analysis
// Double-buffered capture feeding a poll-driven FFT band pipeline

// Module declarations
pub mod analysis;
pub mod capture;
pub mod config;
pub mod error;
pub mod wav;

// Re-exports for convenience
pub use analysis::{
    EnvelopeFollower, PipelineSnapshot, PipelineState, PipelineStats, PipelineStatus,
    ReactiveInput, SpectralPipeline,
};
pub use capture::{AcquisitionSource, AnalogReader, CaptureManager, TimeSource};
pub use config::{AppConfig, GainMode};
pub use error::{CaptureError, ErrorCode};
