//! Acquisition source abstraction.
//!
//! A source owns the periodic trigger that samples the input and writes into
//! a [`FrameProducer`]. Sources run asynchronously relative to the polling
//! pipeline: a cpal callback, a paced thread, or a test harness.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::GainMode;
use crate::error::CaptureError;

use super::double_buffer::FrameProducer;

/// Trait implemented by platform and synthetic acquisition backends.
///
/// `start` hands the producer end of a fresh exchange to the source; the
/// source keeps it for as long as it runs and drops it on `stop`.
pub trait AcquisitionSource {
    /// Short human-readable identifier used in logs
    fn name(&self) -> &str;

    /// Whether the source can sample from `channel`
    fn supports_channel(&self, _channel: u8) -> bool {
        true
    }

    /// Begin periodic sampling of `channel` at `sample_rate` Hz
    fn start(
        &mut self,
        channel: u8,
        sample_rate: u32,
        producer: FrameProducer,
    ) -> Result<(), CaptureError>;

    /// Stop sampling. Must be safe to call at any time, including twice.
    fn stop(&mut self);

    /// Whether the periodic trigger is active
    fn is_running(&self) -> bool;

    /// Apply an amplifier gain change
    fn set_gain_mode(&mut self, _mode: GainMode) -> Result<(), CaptureError> {
        Ok(())
    }
}

impl<S: AcquisitionSource + ?Sized> AcquisitionSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn supports_channel(&self, channel: u8) -> bool {
        (**self).supports_channel(channel)
    }

    fn start(
        &mut self,
        channel: u8,
        sample_rate: u32,
        producer: FrameProducer,
    ) -> Result<(), CaptureError> {
        (**self).start(channel, sample_rate, producer)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn set_gain_mode(&mut self, mode: GainMode) -> Result<(), CaptureError> {
        (**self).set_gain_mode(mode)
    }
}

/// Single-sample analog input used by the lightweight envelope follower.
pub trait AnalogReader {
    /// Read the current input value in raw units
    fn read(&mut self) -> f32;
}

impl<F: FnMut() -> f32> AnalogReader for F {
    fn read(&mut self) -> f32 {
        self()
    }
}

/// Trait representing a monotonic time source used for rate-of-change timing.
pub trait TimeSource {
    fn now(&self) -> Instant;
}

/// Default time source backed by `Instant::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic time source for offline runs and tests.
///
/// Each call to `now()` advances by a fixed step, so the first call returns
/// `start + step`. Use a step of one sample period to replay recorded audio.
pub struct SteppedTimeSource {
    start: Instant,
    step: Duration,
    ticks: AtomicU64,
}

impl SteppedTimeSource {
    pub fn new(step: Duration) -> Self {
        Self {
            start: Instant::now(),
            step,
            ticks: AtomicU64::new(0),
        }
    }

    /// Time source advancing by one sample period per call
    pub fn per_sample(sample_rate: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / f64::from(sample_rate.max(1))))
    }
}

impl TimeSource for SteppedTimeSource {
    fn now(&self) -> Instant {
        let ticks = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
        self.start + self.step * ticks
    }
}
