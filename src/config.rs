//! Configuration management for the capture front end
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling tuning of the decibel range, smoothing and capture rate without
//! recompilation. Defaults match the microphone firmware this front end was
//! tuned against: 8 kHz capture, 256-sample frames, 128 output bands and a
//! 50-120 dB level window.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::CaptureError;

/// Highest channel selector accepted by configuration validation.
pub const MAX_CHANNEL: u8 = 31;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub envelope: EnvelopeFollowerConfig,
}

/// Microphone amplifier gain selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainMode {
    /// Amplifier at its default (40 dB) gain
    #[default]
    Standard,
    /// Amplifier boosted to 50 dB
    High,
}

impl GainMode {
    /// Linear multiplier applied by software-gain sources.
    ///
    /// `High` is +10 dB relative to `Standard`.
    pub fn linear_gain(self) -> f32 {
        match self {
            GainMode::Standard => 1.0,
            GainMode::High => 10f32.powf(10.0 / 20.0),
        }
    }
}

/// Acquisition parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Input channel selector (pin on embedded targets, interleaved channel on desktop)
    pub channel: u8,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Samples per frame (power of two)
    pub frame_size: usize,
    /// Initial amplifier gain
    pub gain_mode: GainMode,
    /// Full-scale value of a raw sample, used to normalize the envelope input
    pub full_scale: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            sample_rate: 8_000,
            frame_size: 256,
            gain_mode: GainMode::Standard,
            full_scale: 4096.0,
        }
    }
}

/// Spectral analysis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of output bands (must not exceed frame_size / 2)
    pub band_count: usize,
    /// Level mapped to 0.0
    pub min_db: f32,
    /// Level mapped to 1.0
    pub max_db: f32,
    /// Per-band smoothing coefficient (weight of the newest value, 0-1]
    pub smoothing: f32,
    /// Log pipeline statistics every N processed frames (0 disables)
    pub log_every_n_frames: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            band_count: 128,
            min_db: 50.0,
            max_db: 120.0,
            smoothing: 0.3,
            log_every_n_frames: 500,
        }
    }
}

/// Tuning of the lightweight envelope follower
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeFollowerConfig {
    /// Gain of the running average applied to |rate of change|
    pub rate_gain: f32,
    /// Memory of the rate running average, in samples
    pub rate_memory: usize,
    /// Memory of the noise-floor minimum tracker, in samples
    pub floor_memory: usize,
    /// Fixed offset subtracted after the noise floor
    pub floor_offset: f32,
    /// Upper clamp applied after floor subtraction
    pub ceiling: f32,
    /// Divisor applied before the output average
    pub output_divisor: f32,
    /// Gain of the output running average
    pub output_gain: f32,
    /// Memory of the output running average, in samples
    pub output_memory: usize,
}

impl Default for EnvelopeFollowerConfig {
    fn default() -> Self {
        Self {
            rate_gain: 0.075,
            rate_memory: 40,
            floor_memory: 100,
            floor_offset: 250.0,
            ceiling: 4000.0,
            output_divisor: 100.0,
            output_gain: 0.1,
            output_memory: 10,
        }
    }
}

impl CaptureConfig {
    /// Check the acquisition parameters that must hold before capture starts
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.channel > MAX_CHANNEL {
            return Err(CaptureError::InvalidChannel {
                channel: self.channel,
            });
        }
        if self.sample_rate == 0 {
            return Err(CaptureError::InvalidSampleRate {
                rate: self.sample_rate,
            });
        }
        if self.frame_size < 2 || !self.frame_size.is_power_of_two() {
            return Err(CaptureError::InvalidFrameSize {
                size: self.frame_size,
            });
        }
        if !self.full_scale.is_finite() || self.full_scale <= 0.0 {
            return Err(CaptureError::InvalidFullScale {
                full_scale: self.full_scale,
            });
        }
        Ok(())
    }
}

impl AnalysisConfig {
    /// Check analysis parameters against the frame size they will run on
    pub fn validate(&self, frame_size: usize) -> Result<(), CaptureError> {
        let max = frame_size / 2;
        if self.band_count == 0 || self.band_count > max {
            return Err(CaptureError::InvalidBandCount {
                bands: self.band_count,
                max,
            });
        }
        if !self.min_db.is_finite() || !self.max_db.is_finite() || self.min_db >= self.max_db {
            return Err(CaptureError::InvalidDecibelRange {
                min_db: self.min_db,
                max_db: self.max_db,
            });
        }
        // Zero would freeze every smoothed band at its initial state
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(CaptureError::InvalidSmoothing {
                smoothing: self.smoothing,
            });
        }
        Ok(())
    }
}

impl AppConfig {
    /// Validate every section; the first failure is returned
    pub fn validate(&self) -> Result<(), CaptureError> {
        self.capture.validate()?;
        self.analysis.validate(self.capture.frame_size)
    }

    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// the JSON is invalid (a warning is logged in both cases).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.capture.sample_rate, 8_000);
        assert_eq!(config.capture.frame_size, 256);
        assert_eq!(config.analysis.band_count, 128);
        assert_eq!(config.analysis.min_db, 50.0);
        assert_eq!(config.analysis.max_db, 120.0);
        assert_eq!(config.envelope.rate_memory, 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = AppConfig::default();
        config.capture.gain_mode = GainMode::High;
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.capture.gain_mode, GainMode::High);
        assert_eq!(parsed.analysis.smoothing, config.analysis.smoothing);
        assert_eq!(parsed.envelope.floor_offset, config.envelope.floor_offset);
    }

    #[test]
    fn test_partial_json_uses_section_defaults() {
        let json = r#"{ "capture": { "channel": 2, "sample_rate": 48000, "frame_size": 512, "gain_mode": "standard", "full_scale": 1.0 } }"#;
        let parsed: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.capture.sample_rate, 48_000);
        assert_eq!(parsed.analysis.band_count, 128);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/audio_reactive.json");
        assert_eq!(config.capture.sample_rate, 8_000);
    }

    #[test]
    fn test_rejects_zero_sample_rate() {
        let mut config = AppConfig::default();
        config.capture.sample_rate = 0;
        assert_eq!(
            config.validate(),
            Err(CaptureError::InvalidSampleRate { rate: 0 })
        );
    }

    #[test]
    fn test_rejects_non_power_of_two_frame() {
        let mut config = AppConfig::default();
        config.capture.frame_size = 300;
        assert_eq!(
            config.validate(),
            Err(CaptureError::InvalidFrameSize { size: 300 })
        );
    }

    #[test]
    fn test_rejects_invalid_channel() {
        let mut config = AppConfig::default();
        config.capture.channel = MAX_CHANNEL + 1;
        assert!(matches!(
            config.validate(),
            Err(CaptureError::InvalidChannel { .. })
        ));
    }

    #[test]
    fn test_rejects_too_many_bands() {
        let mut config = AppConfig::default();
        config.analysis.band_count = 129;
        assert_eq!(
            config.validate(),
            Err(CaptureError::InvalidBandCount {
                bands: 129,
                max: 128
            })
        );
    }

    #[test]
    fn test_rejects_inverted_decibel_range() {
        let mut config = AppConfig::default();
        config.analysis.min_db = 120.0;
        config.analysis.max_db = 50.0;
        assert!(matches!(
            config.validate(),
            Err(CaptureError::InvalidDecibelRange { .. })
        ));
    }

    #[test]
    fn test_rejects_smoothing_outside_unit_interval() {
        for smoothing in [0.0, -0.3, 1.5, f32::NAN] {
            let mut config = AppConfig::default();
            config.analysis.smoothing = smoothing;
            assert!(
                matches!(
                    config.validate(),
                    Err(CaptureError::InvalidSmoothing { .. })
                ),
                "smoothing {} accepted",
                smoothing
            );
        }

        let mut config = AppConfig::default();
        config.analysis.smoothing = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unusable_full_scale() {
        for full_scale in [0.0, -4096.0, f32::NAN, f32::INFINITY] {
            let mut config = AppConfig::default();
            config.capture.full_scale = full_scale;
            assert!(
                matches!(
                    config.validate(),
                    Err(CaptureError::InvalidFullScale { .. })
                ),
                "full_scale {} accepted",
                full_scale
            );
        }
    }

    #[test]
    fn test_high_gain_is_ten_db() {
        let ratio = GainMode::High.linear_gain() / GainMode::Standard.linear_gain();
        assert!((20.0 * ratio.log10() - 10.0).abs() < 1e-4);
    }
}
