//! Externally driven acquisition source.
//!
//! The producer end is parked in a shared slot while the source is running,
//! and samples are pushed through an [`InjectionHandle`]. Offline WAV analysis
//! and the test suite use this to feed exact frames into the pipeline.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::GainMode;
use crate::error::CaptureError;

use super::double_buffer::FrameProducer;
use super::source::AcquisitionSource;

#[derive(Default)]
struct InjectionState {
    producer: Mutex<Option<FrameProducer>>,
    running: AtomicBool,
    sample_rate: AtomicU32,
    channel: AtomicU32,
    high_gain: AtomicBool,
}

/// Cloneable handle used to push samples into a running [`InjectedSource`]
#[derive(Clone)]
pub struct InjectionHandle {
    state: Arc<InjectionState>,
}

impl InjectionHandle {
    fn producer(&self) -> MutexGuard<'_, Option<FrameProducer>> {
        self.state
            .producer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Push samples into the current frame
    ///
    /// # Returns
    /// Number of samples handed to the producer; 0 when the source is stopped
    pub fn push_samples(&self, samples: &[f32]) -> usize {
        match self.producer().as_mut() {
            Some(producer) => {
                producer.push_samples(samples);
                samples.len()
            }
            None => 0,
        }
    }

    /// Whether the source currently accepts samples
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Sample rate the source was last started with
    pub fn sample_rate(&self) -> u32 {
        self.state.sample_rate.load(Ordering::SeqCst)
    }

    /// Channel the source was last started on
    pub fn channel(&self) -> u8 {
        self.state.channel.load(Ordering::SeqCst) as u8
    }

    /// Gain mode last applied to the source
    pub fn gain_mode(&self) -> GainMode {
        if self.state.high_gain.load(Ordering::SeqCst) {
            GainMode::High
        } else {
            GainMode::Standard
        }
    }

    /// Frame size of the running exchange, if any
    pub fn frame_size(&self) -> Option<usize> {
        self.producer().as_ref().map(FrameProducer::frame_size)
    }
}

/// Acquisition source whose samples come from an [`InjectionHandle`]
pub struct InjectedSource {
    state: Arc<InjectionState>,
    channel_count: u8,
}

impl InjectedSource {
    /// Create a single-channel source and its handle
    pub fn new() -> (Self, InjectionHandle) {
        Self::with_channels(1)
    }

    /// Create a source that accepts channels `0..channel_count`
    pub fn with_channels(channel_count: u8) -> (Self, InjectionHandle) {
        let state = Arc::new(InjectionState::default());
        let handle = InjectionHandle {
            state: Arc::clone(&state),
        };
        (
            Self {
                state,
                channel_count,
            },
            handle,
        )
    }
}

impl AcquisitionSource for InjectedSource {
    fn name(&self) -> &str {
        "injected"
    }

    fn supports_channel(&self, channel: u8) -> bool {
        channel < self.channel_count
    }

    fn start(
        &mut self,
        channel: u8,
        sample_rate: u32,
        producer: FrameProducer,
    ) -> Result<(), CaptureError> {
        if !self.supports_channel(channel) {
            return Err(CaptureError::InvalidChannel { channel });
        }
        *self
            .state
            .producer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(producer);
        self.state.sample_rate.store(sample_rate, Ordering::SeqCst);
        self.state
            .channel
            .store(u32::from(channel), Ordering::SeqCst);
        self.state.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
        self.state
            .producer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }

    fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    fn set_gain_mode(&mut self, mode: GainMode) -> Result<(), CaptureError> {
        self.state
            .high_gain
            .store(mode == GainMode::High, Ordering::SeqCst);
        Ok(())
    }
}
