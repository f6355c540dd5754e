use super::*;
use crate::capture::{InjectedSource, InjectionHandle};
use crate::config::CaptureConfig;

fn small_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.capture.frame_size = 64;
    config.analysis.band_count = 32;
    config
}

fn pipeline(config: AppConfig) -> (SpectralPipeline, InjectionHandle) {
    let (source, handle) = InjectedSource::new();
    (SpectralPipeline::initialize(config, Box::new(source)), handle)
}

fn sine(len: usize, bin: usize, amplitude: f32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            amplitude * (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / len as f32).sin()
        })
        .collect()
}

#[test]
fn test_initialize_with_defaults() {
    let (pipeline, handle) = pipeline(AppConfig::default());
    assert!(pipeline.is_initialized());
    assert_eq!(pipeline.sample_rate(), 8_000);
    assert_eq!(pipeline.band_profile().len(), 128);
    assert_eq!(pipeline.smoothed_band_profile().len(), 128);
    assert_eq!(pipeline.raw_samples().len(), 256);
    assert_eq!(pipeline.status().state, PipelineState::Running);
    assert_eq!(handle.frame_size(), Some(256));
}

#[test]
fn test_invalid_config_leaves_pipeline_uninitialized() {
    let mut config = AppConfig::default();
    config.capture.sample_rate = 0;
    let (mut pipeline, handle) = pipeline(config);

    assert!(!pipeline.is_initialized());
    assert!(!handle.is_running());
    assert_eq!(
        pipeline.last_error(),
        Some(&CaptureError::InvalidSampleRate { rate: 0 })
    );

    let status = pipeline.status();
    assert_eq!(status.state, PipelineState::Uninitialized);
    assert_eq!(status.error_code, Some(2002));

    // Polling an uninitialized pipeline is harmless
    assert!(!pipeline.update());
    assert_eq!(pipeline.beat_intensity(), 0.0);
    assert!(pipeline.band_profile().is_empty());
    assert_eq!(pipeline.set_sample_rate(8_000), Err(CaptureError::NotInitialized));
}

#[test]
fn test_zero_smoothing_is_rejected() {
    let mut config = small_config();
    config.analysis.smoothing = 0.0;
    let (mut pipeline, handle) = pipeline(config);

    assert!(!pipeline.is_initialized());
    assert!(!handle.is_running());
    assert_eq!(pipeline.status().error_code, Some(2011));

    handle.push_samples(&sine(64, 9, 4096.0));
    assert!(!pipeline.update());
    assert!(pipeline.smoothed_band_profile().is_empty());
}

#[test]
fn test_zero_full_scale_is_rejected() {
    let mut config = small_config();
    config.capture.full_scale = 0.0;
    let (pipeline, _handle) = pipeline(config);

    assert!(!pipeline.is_initialized());
    assert_eq!(
        pipeline.last_error(),
        Some(&CaptureError::InvalidFullScale { full_scale: 0.0 })
    );
}

#[test]
fn test_try_initialize_reports_error() {
    let mut config = small_config();
    config.analysis.band_count = 64;
    let (source, _handle) = InjectedSource::new();
    let result = SpectralPipeline::try_initialize(config, Box::new(source));
    assert!(matches!(
        result,
        Err(CaptureError::InvalidBandCount { bands: 64, max: 32 })
    ));
}

#[test]
fn test_window_length_must_match_frame() {
    let config = small_config();
    let result = FrameAnalyzer::with_window(&config, WindowTable::hann(128));
    assert!(matches!(
        result,
        Err(CaptureError::WindowLengthMismatch {
            frame: 64,
            window: 128
        })
    ));
}

#[test]
fn test_update_without_frame_is_idempotent() {
    let (mut pipeline, handle) = pipeline(small_config());
    handle.push_samples(&sine(64, 5, 1000.0));
    assert!(pipeline.update());

    let before = pipeline.snapshot();
    for _ in 0..5 {
        assert!(!pipeline.update());
    }
    assert_eq!(pipeline.snapshot(), before);
    assert_eq!(pipeline.stats().idle_polls, 5);
    assert_eq!(pipeline.stats().frames_processed, 1);
}

#[test]
fn test_raw_samples_follow_claimed_frame() {
    let (mut pipeline, handle) = pipeline(small_config());
    let frame: Vec<f32> = (0..64).map(|i| i as f32).collect();
    handle.push_samples(&frame);
    pipeline.update();
    assert_eq!(pipeline.raw_samples(), frame.as_slice());
}

#[test]
fn test_newest_frame_wins() {
    let (mut pipeline, handle) = pipeline(small_config());
    handle.push_samples(&[1.0; 64]);
    handle.push_samples(&[2.0; 64]);
    assert!(pipeline.update());
    assert!(pipeline.raw_samples().iter().all(|&s| s == 2.0));
    assert_eq!(pipeline.stats().capture.frames_overwritten, 1);
}

#[test]
fn test_silence_gives_finite_negative_bands() {
    let (mut pipeline, handle) = pipeline(small_config());
    handle.push_samples(&[0.0; 64]);
    assert!(pipeline.update());

    assert!(pipeline.band_profile().iter().all(|b| b.is_finite()));
    assert!(pipeline.band_profile().iter().all(|&b| b < 0.0));
    assert!(pipeline.smoothed_band_profile().iter().all(|&b| b == 0.0));
    assert_eq!(pipeline.beat_intensity(), 0.0);
}

#[test]
fn test_process_frame_matches_capture_path() {
    let frame = sine(64, 9, 2000.0);

    let (mut captured, handle) = pipeline(small_config());
    handle.push_samples(&frame);
    captured.update();

    let (mut direct, _handle) = pipeline(small_config());
    direct.process_frame(&frame).unwrap();

    assert_eq!(captured.snapshot(), direct.snapshot());
}

#[test]
fn test_process_frame_rejects_wrong_length() {
    let (mut pipeline, _handle) = pipeline(small_config());
    assert_eq!(
        pipeline.process_frame(&[0.0; 10]),
        Err(CaptureError::InvalidFrameSize { size: 10 })
    );
}

#[test]
fn test_set_sample_rate_keeps_filter_state() {
    let (mut pipeline, handle) = pipeline(small_config());
    let frame = sine(64, 9, 2000.0);
    handle.push_samples(&frame);
    pipeline.update();
    let smoothed = pipeline.smoothed_band_profile().to_vec();

    pipeline.set_sample_rate(16_000).unwrap();
    assert_eq!(pipeline.sample_rate(), 16_000);
    assert_eq!(handle.sample_rate(), 16_000);
    assert_eq!(pipeline.smoothed_band_profile(), smoothed.as_slice());
    assert_eq!(pipeline.status().state, PipelineState::Running);
}

#[test]
fn test_gain_mode_reaches_source() {
    let (mut pipeline, handle) = pipeline(small_config());
    pipeline.set_gain_mode(GainMode::High).unwrap();
    assert_eq!(handle.gain_mode(), GainMode::High);
    assert_eq!(pipeline.status().gain_mode, GainMode::High);
}

#[test]
fn test_stop_keeps_results_readable() {
    let (mut pipeline, handle) = pipeline(small_config());
    handle.push_samples(&sine(64, 4, 1500.0));
    pipeline.update();
    let snapshot = pipeline.snapshot();

    pipeline.stop();
    pipeline.stop();
    assert_eq!(pipeline.status().state, PipelineState::Stopped);
    assert_eq!(handle.push_samples(&[0.0; 64]), 0);
    assert!(!pipeline.update());
    assert_eq!(pipeline.snapshot(), snapshot);
}

#[test]
fn test_reactive_input_returns_beat_intensity() {
    let (mut pipeline, handle) = pipeline(small_config());
    handle.push_samples(&[0.0; 64]);
    let level = ReactiveInput::update(&mut pipeline);
    assert_eq!(level, pipeline.beat_intensity());
}

#[test]
fn test_snapshot_serializes() {
    let (mut pipeline, handle) = pipeline(small_config());
    handle.push_samples(&sine(64, 3, 1000.0));
    pipeline.update();

    let json = serde_json::to_string(&pipeline.snapshot()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["frame_index"], 1);
    assert_eq!(value["bands"].as_array().map(Vec::len), Some(32));
}

#[test]
fn test_capture_config_channel_checked_by_source() {
    let mut config = small_config();
    config.capture = CaptureConfig {
        channel: 3,
        ..config.capture
    };
    let (source, _handle) = InjectedSource::with_channels(2);
    let pipeline = SpectralPipeline::initialize(config, Box::new(source));
    assert!(!pipeline.is_initialized());
    assert_eq!(
        pipeline.last_error(),
        Some(&CaptureError::InvalidChannel { channel: 3 })
    );
}
