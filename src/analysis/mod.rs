// Analysis module - spectral pipeline for audio-reactive output
//
// This module turns claimed capture frames into per-band intensities and a
// beat intensity. It is poll driven: the caller invokes `update()` from its
// own loop and reads the results back through getters.
//
// Architecture:
// - CaptureManager: double-buffered acquisition, newest frame wins
// - Pipeline: window -> FFT magnitudes -> band aggregation -> smoothing
// - Envelope detector runs inside the band pass on the raw waveform
// - EnvelopeFollower: FFT-free alternative for a single analog input

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::capture::{AcquisitionSource, CaptureManager, ExchangeStats};
use crate::config::{AppConfig, GainMode};
use crate::error::{log_capture_error, CaptureError, ErrorCode};

pub mod bands;
pub mod envelope;
pub mod filters;
pub mod follower;
pub mod frame;
pub mod smoothing;
pub mod transform;
pub mod window;

#[cfg(test)]
mod tests;

use bands::BandAggregator;
use envelope::EnvelopeDetector;
use frame::build_complex_frame;
use smoothing::BandSmoother;
use transform::SpectralTransform;
use window::WindowTable;

pub use follower::EnvelopeFollower;

/// Anything that produces a [0, 1] reactive level when polled
pub trait ReactiveInput {
    /// Advance the input and return its current level
    fn update(&mut self) -> f32;
}

/// Lifecycle state reported by [`SpectralPipeline::status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Initialization failed; see `last_error`
    Uninitialized,
    /// Capture running, `update()` processes frames
    Running,
    /// `stop()` was called or the source stopped on its own
    Stopped,
}

/// Pipeline health summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub state: PipelineState,
    pub sample_rate: u32,
    pub gain_mode: GainMode,
    pub frame_size: usize,
    pub band_count: usize,
    /// Numeric code of the last error, if any
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

/// Processing counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Frames run through the analysis chain
    pub frames_processed: u64,
    /// Polls that found no completed frame
    pub idle_polls: u64,
    /// Double-buffer counters, accumulated across sample-rate changes
    pub capture: ExchangeStats,
}

/// Serializable view of the latest analysis results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    /// Number of frames processed when the snapshot was taken
    pub frame_index: u64,
    pub sample_rate: u32,
    pub beat_intensity: f32,
    /// Raw (unclamped) band intensities
    pub bands: Vec<f32>,
    /// Smoothed band intensities in [0, 1]
    pub smoothed_bands: Vec<f32>,
}

/// Per-frame DSP state: buffers, window, transform and filter bank
struct FrameAnalyzer {
    window: WindowTable,
    transform: SpectralTransform,
    aggregator: BandAggregator,
    smoother: BandSmoother,
    envelope: EnvelopeDetector,
    full_scale: f32,
    raw: Vec<f32>,
    complex: Vec<Complex<f32>>,
    spectrum: Vec<f32>,
    bands: Vec<f32>,
    smoothed: Vec<f32>,
}

impl FrameAnalyzer {
    fn new(config: &AppConfig) -> Result<Self, CaptureError> {
        config.validate()?;
        Self::with_window(config, WindowTable::hann(config.capture.frame_size))
    }

    fn with_window(config: &AppConfig, window: WindowTable) -> Result<Self, CaptureError> {
        let frame_size = config.capture.frame_size;
        if window.len() != frame_size {
            return Err(CaptureError::WindowLengthMismatch {
                frame: frame_size,
                window: window.len(),
            });
        }

        let transform = SpectralTransform::new(frame_size);
        let band_count = config.analysis.band_count;

        Ok(Self {
            window,
            aggregator: BandAggregator::new(
                band_count,
                config.analysis.min_db,
                config.analysis.max_db,
            ),
            smoother: BandSmoother::new(band_count, config.analysis.smoothing),
            envelope: EnvelopeDetector::new(),
            full_scale: config.capture.full_scale,
            raw: vec![0.0; frame_size],
            complex: vec![Complex::new(0.0, 0.0); frame_size],
            spectrum: vec![0.0; transform.spectrum_len()],
            bands: vec![0.0; band_count],
            smoothed: vec![0.0; band_count],
            transform,
        })
    }

    /// Run the analysis chain over `self.raw`
    fn process(&mut self) {
        build_complex_frame(&self.raw, &self.window, &mut self.complex);
        self.transform.magnitudes(&mut self.complex, &mut self.spectrum);

        self.envelope.begin_pass();
        for band in 0..self.bands.len() {
            let intensity = self.aggregator.band_intensity(&self.spectrum, band);
            self.bands[band] = intensity;
            self.smoothed[band] = self.smoother.step(band, intensity);
            self.envelope.observe(band, &self.raw, self.full_scale);
        }
        self.envelope.finish_pass();
    }
}

/// Poll-driven spectral analysis pipeline
///
/// Owns the capture manager and all consumer-side state. Filter state
/// survives sample-rate changes and is only reset by building a new pipeline.
pub struct SpectralPipeline {
    config: AppConfig,
    capture: Option<CaptureManager>,
    analyzer: Option<FrameAnalyzer>,
    last_error: Option<CaptureError>,
    frames_processed: u64,
    idle_polls: u64,
}

impl SpectralPipeline {
    /// Build the pipeline and start capture
    ///
    /// Never fails: a configuration or source error leaves the pipeline
    /// uninitialized with the error available through [`Self::status`] and
    /// [`Self::last_error`].
    pub fn initialize(config: AppConfig, source: Box<dyn AcquisitionSource>) -> Self {
        match Self::try_initialize(config.clone(), source) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                log_capture_error(&err, "SpectralPipeline::initialize");
                Self {
                    config,
                    capture: None,
                    analyzer: None,
                    last_error: Some(err),
                    frames_processed: 0,
                    idle_polls: 0,
                }
            }
        }
    }

    /// Like [`Self::initialize`] but returns the error instead of storing it
    pub fn try_initialize(
        config: AppConfig,
        source: Box<dyn AcquisitionSource>,
    ) -> Result<Self, CaptureError> {
        let analyzer = FrameAnalyzer::new(&config)?;
        let capture = CaptureManager::initialize(source, &config.capture)?;

        tracing::info!(
            "[SpectralPipeline] Initialized: {} Hz, {} samples/frame, {} bands, {}-{} dB",
            config.capture.sample_rate,
            config.capture.frame_size,
            config.analysis.band_count,
            config.analysis.min_db,
            config.analysis.max_db
        );

        Ok(Self {
            config,
            capture: Some(capture),
            analyzer: Some(analyzer),
            last_error: None,
            frames_processed: 0,
            idle_polls: 0,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.capture.is_some() && self.analyzer.is_some()
    }

    /// Current capture rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.config.capture.sample_rate
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Samples of the most recently claimed frame
    pub fn raw_samples(&self) -> &[f32] {
        self.analyzer
            .as_ref()
            .map(|a| a.raw.as_slice())
            .unwrap_or(&[])
    }

    /// Raw band intensities; values may lie outside [0, 1]
    pub fn band_profile(&self) -> &[f32] {
        self.analyzer
            .as_ref()
            .map(|a| a.bands.as_slice())
            .unwrap_or(&[])
    }

    /// Smoothed band intensities in [0, 1]
    pub fn smoothed_band_profile(&self) -> &[f32] {
        self.analyzer
            .as_ref()
            .map(|a| a.smoothed.as_slice())
            .unwrap_or(&[])
    }

    /// Latest beat intensity in [0, 1]
    pub fn beat_intensity(&self) -> f32 {
        self.analyzer
            .as_ref()
            .map_or(0.0, |a| a.envelope.intensity())
    }

    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }

    /// Process the newest completed frame, if any
    ///
    /// Returns `true` when a frame was processed. Without a new frame nothing
    /// changes, so repeated calls are idempotent.
    pub fn update(&mut self) -> bool {
        let (Some(capture), Some(analyzer)) = (self.capture.as_mut(), self.analyzer.as_mut())
        else {
            return false;
        };

        if !capture.claim_frame(&mut analyzer.raw) {
            self.idle_polls += 1;
            return false;
        }

        analyzer.process();
        self.frames_processed += 1;
        self.log_progress();
        true
    }

    /// Run one raw frame through the analysis chain without the capture path
    ///
    /// # Errors
    /// `NotInitialized` if initialization failed, `InvalidFrameSize` if
    /// `raw` does not hold exactly one frame.
    pub fn process_frame(&mut self, raw: &[f32]) -> Result<(), CaptureError> {
        let analyzer = self.analyzer.as_mut().ok_or(CaptureError::NotInitialized)?;
        if raw.len() != analyzer.raw.len() {
            return Err(CaptureError::InvalidFrameSize { size: raw.len() });
        }

        analyzer.raw.copy_from_slice(raw);
        analyzer.process();
        self.frames_processed += 1;
        self.log_progress();
        Ok(())
    }

    /// Restart capture at a new rate, keeping all filter state
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), CaptureError> {
        let capture = self.capture.as_mut().ok_or(CaptureError::NotInitialized)?;
        if let Err(err) = capture.set_sample_rate(sample_rate) {
            log_capture_error(&err, "SpectralPipeline::set_sample_rate");
            self.last_error = Some(err.clone());
            return Err(err);
        }

        self.config.capture.sample_rate = sample_rate;
        tracing::info!("[SpectralPipeline] Sample rate set to {} Hz", sample_rate);
        Ok(())
    }

    pub fn set_gain_mode(&mut self, mode: GainMode) -> Result<(), CaptureError> {
        let capture = self.capture.as_mut().ok_or(CaptureError::NotInitialized)?;
        if let Err(err) = capture.set_gain_mode(mode) {
            log_capture_error(&err, "SpectralPipeline::set_gain_mode");
            self.last_error = Some(err.clone());
            return Err(err);
        }

        self.config.capture.gain_mode = mode;
        tracing::info!("[SpectralPipeline] Gain mode set to {:?}", mode);
        Ok(())
    }

    /// Stop capture; results stay readable. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(capture) = self.capture.as_mut() {
            if capture.is_running() {
                tracing::info!(
                    "[SpectralPipeline] Stopping after {} frames",
                    self.frames_processed
                );
            }
            capture.stop();
        }
    }

    pub fn status(&self) -> PipelineStatus {
        let state = match (&self.capture, &self.analyzer) {
            (Some(capture), Some(_)) if capture.is_running() => PipelineState::Running,
            (Some(_), Some(_)) => PipelineState::Stopped,
            _ => PipelineState::Uninitialized,
        };

        PipelineStatus {
            state,
            sample_rate: self.config.capture.sample_rate,
            gain_mode: self.config.capture.gain_mode,
            frame_size: self.config.capture.frame_size,
            band_count: self.config.analysis.band_count,
            error_code: self.last_error.as_ref().map(|e| e.code()),
            error_message: self.last_error.as_ref().map(|e| e.message()),
        }
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            frames_processed: self.frames_processed,
            idle_polls: self.idle_polls,
            capture: self
                .capture
                .as_ref()
                .map(CaptureManager::stats)
                .unwrap_or_default(),
        }
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            frame_index: self.frames_processed,
            sample_rate: self.config.capture.sample_rate,
            beat_intensity: self.beat_intensity(),
            bands: self.band_profile().to_vec(),
            smoothed_bands: self.smoothed_band_profile().to_vec(),
        }
    }

    fn log_progress(&self) {
        let every = self.config.analysis.log_every_n_frames;
        if every > 0 && self.frames_processed % every == 0 {
            let stats = self.stats();
            tracing::debug!(
                "[SpectralPipeline] frames={} idle_polls={} overwritten={} beat={:.3}",
                stats.frames_processed,
                stats.idle_polls,
                stats.capture.frames_overwritten,
                self.beat_intensity()
            );
        }
    }
}

impl ReactiveInput for SpectralPipeline {
    /// Poll for a frame and return the beat intensity
    fn update(&mut self) -> f32 {
        SpectralPipeline::update(self);
        self.beat_intensity()
    }
}
