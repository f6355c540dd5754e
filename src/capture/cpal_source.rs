//! CPAL-based acquisition source for desktop platforms (Linux, macOS, Windows)
//!
//! Opens the default input device at the requested sample rate and feeds one
//! channel of the interleaved input into the frame exchange. The cpal callback
//! thread plays the role of the periodic sampling trigger.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::config::GainMode;
use crate::error::CaptureError;

use super::double_buffer::FrameProducer;
use super::source::AcquisitionSource;

/// Default input device capture
pub struct CpalSource {
    /// Active input stream; dropping it stops the callback
    stream: Option<cpal::Stream>,
    /// Software gain as f32 bits, read by the callback
    gain_bits: Arc<AtomicU32>,
    /// Multiplier mapping cpal's [-1, 1] samples to raw units
    full_scale: f32,
}

impl CpalSource {
    /// Create a source that scales samples to `full_scale` raw units
    pub fn new(full_scale: f32) -> Self {
        Self {
            stream: None,
            gain_bits: Arc::new(AtomicU32::new(1.0f32.to_bits())),
            full_scale,
        }
    }

    fn build_stream(
        &self,
        channel: u8,
        sample_rate: u32,
        mut producer: FrameProducer,
    ) -> Result<cpal::Stream, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| CaptureError::StreamOpenFailed {
                reason: "No default input device found".to_string(),
            })?;

        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::StreamOpenFailed {
                reason: format!("Failed to get default input config: {:?}", e),
            })?;

        let channels_count = usize::from(config.channels());
        if usize::from(channel) >= channels_count {
            return Err(CaptureError::InvalidChannel { channel });
        }

        let stream_config = cpal::StreamConfig {
            channels: config.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let gain_bits = Arc::clone(&self.gain_bits);
        let full_scale = self.full_scale;
        let channel = usize::from(channel);

        let err_fn = |err| log::error!("[Capture] Input stream error: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Real-time callback: no allocations, locks or logging
                    let scale = f32::from_bits(gain_bits.load(Ordering::Relaxed)) * full_scale;
                    for frame in data.chunks(channels_count) {
                        let sample = frame.get(channel).copied().unwrap_or(0.0);
                        producer.push_sample(sample * scale);
                    }
                },
                err_fn,
                None,
            ),
            _ => {
                return Err(CaptureError::StreamOpenFailed {
                    reason: "Only F32 sample format is currently supported for input".to_string(),
                })
            }
        }
        .map_err(|e| CaptureError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

        Ok(stream)
    }
}

impl AcquisitionSource for CpalSource {
    fn name(&self) -> &str {
        "cpal"
    }

    fn start(
        &mut self,
        channel: u8,
        sample_rate: u32,
        producer: FrameProducer,
    ) -> Result<(), CaptureError> {
        self.stop();

        let stream = self.build_stream(channel, sample_rate, producer)?;
        stream.play().map_err(|e| CaptureError::HardwareError {
            details: format!("Input start failed: {}", e),
        })?;

        log::info!(
            "[Capture] cpal input started: channel={}, sample_rate={} Hz",
            channel,
            sample_rate
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::info!("[Capture] cpal input stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    fn set_gain_mode(&mut self, mode: GainMode) -> Result<(), CaptureError> {
        self.gain_bits
            .store(mode.linear_gain().to_bits(), Ordering::Relaxed);
        Ok(())
    }
}
