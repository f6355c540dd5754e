// Capture module - continuous double-buffered acquisition
//
// The acquisition source keeps writing samples into a back buffer while the
// polling side claims the newest completed frame. CaptureManager wraps a
// source and the consumer end of the exchange behind the poll/claim contract
// used by the analysis pipeline.

pub mod double_buffer;
pub mod injected;
pub mod source;
pub mod synthetic;

#[cfg(not(target_os = "android"))]
mod cpal_source;
#[cfg(not(target_os = "android"))]
pub use cpal_source::CpalSource;

pub use double_buffer::{
    ExchangeStats, FrameConsumer, FrameExchange, FrameExchangeChannels, FrameProducer,
};
pub use injected::{InjectedSource, InjectionHandle};
pub use source::{
    AcquisitionSource, AnalogReader, SteppedTimeSource, SystemTimeSource, TimeSource,
};
pub use synthetic::{SyntheticPattern, SyntheticSignal, SyntheticSource, SyntheticSpec};

use crate::config::{CaptureConfig, GainMode};
use crate::error::CaptureError;

/// Owns an acquisition source and the consumer end of its frame exchange
pub struct CaptureManager {
    source: Box<dyn AcquisitionSource>,
    consumer: FrameConsumer,
    channel: u8,
    sample_rate: u32,
    frame_size: usize,
    gain_mode: GainMode,
    /// Counters of exchanges retired by sample-rate changes
    retired: ExchangeStats,
}

impl CaptureManager {
    /// Validate the capture config and start continuous acquisition
    ///
    /// # Errors
    /// Configuration errors (channel, sample rate, frame size) and any
    /// failure reported by the source while starting.
    pub fn initialize(
        mut source: Box<dyn AcquisitionSource>,
        config: &CaptureConfig,
    ) -> Result<Self, CaptureError> {
        config.validate()?;
        if !source.supports_channel(config.channel) {
            return Err(CaptureError::InvalidChannel {
                channel: config.channel,
            });
        }

        source.set_gain_mode(config.gain_mode)?;

        let FrameExchangeChannels { producer, consumer } = FrameExchange::new(config.frame_size);
        source.start(config.channel, config.sample_rate, producer)?;

        log::info!(
            "[Capture] {} source running: channel={}, sample_rate={} Hz, frame_size={}",
            source.name(),
            config.channel,
            config.sample_rate,
            config.frame_size
        );

        Ok(Self {
            source,
            consumer,
            channel: config.channel,
            sample_rate: config.sample_rate,
            frame_size: config.frame_size,
            gain_mode: config.gain_mode,
            retired: ExchangeStats::default(),
        })
    }

    /// Whether a completed frame is waiting (non-blocking)
    pub fn is_frame_ready(&self) -> bool {
        self.consumer.is_frame_ready()
    }

    /// Copy the newest completed frame into `dest` and release its buffer
    ///
    /// # Returns
    /// `true` if a frame was claimed
    pub fn claim_frame(&mut self, dest: &mut [f32]) -> bool {
        self.consumer.claim_frame(dest)
    }

    /// Restart the periodic trigger at a new rate
    ///
    /// The exchange is rebuilt; any partially written or unclaimed frame from
    /// the old rate is discarded. Consumer-side analysis state is not touched.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), CaptureError> {
        if sample_rate == 0 {
            return Err(CaptureError::InvalidSampleRate { rate: sample_rate });
        }

        self.source.stop();
        self.retired = self.retired.accumulate(&self.consumer.stats());

        let FrameExchangeChannels { producer, consumer } = FrameExchange::new(self.frame_size);
        self.consumer = consumer;
        self.source.start(self.channel, sample_rate, producer)?;
        self.sample_rate = sample_rate;

        log::info!("[Capture] Sample rate changed to {} Hz", sample_rate);
        Ok(())
    }

    /// Forward a gain change to the source
    pub fn set_gain_mode(&mut self, mode: GainMode) -> Result<(), CaptureError> {
        self.source.set_gain_mode(mode)?;
        self.gain_mode = mode;
        Ok(())
    }

    /// Stop acquisition; safe to call repeatedly
    pub fn stop(&mut self) {
        self.source.stop();
    }

    pub fn is_running(&self) -> bool {
        self.source.is_running()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn gain_mode(&self) -> GainMode {
        self.gain_mode
    }

    /// Exchange counters accumulated across restarts
    pub fn stats(&self) -> ExchangeStats {
        self.retired.accumulate(&self.consumer.stats())
    }
}

impl Drop for CaptureManager {
    fn drop(&mut self) {
        self.source.stop();
    }
}
