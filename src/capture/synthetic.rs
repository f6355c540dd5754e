//! Synthetic acquisition source.
//!
//! Generates deterministic waveforms in raw ADC-like units on a background
//! thread paced by the configured sample rate. Used to exercise the pipeline
//! without audio hardware.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::GainMode;
use crate::error::CaptureError;

use super::double_buffer::FrameProducer;
use super::source::{AcquisitionSource, AnalogReader};

/// Trigger period of the generator thread.
const TICK: Duration = Duration::from_millis(5);

/// Supported deterministic waveform patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticPattern {
    Sine,
    Square,
    WhiteNoise,
    Silence,
}

/// Configuration for synthetic waveforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    pub pattern: SyntheticPattern,
    pub frequency_hz: f32,
    /// Peak deviation from `offset`, in raw units
    pub amplitude: f32,
    /// DC bias of the signal, in raw units (a biased microphone ADC idles mid-scale)
    pub offset: f32,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            pattern: SyntheticPattern::Sine,
            frequency_hz: 440.0,
            amplitude: 1024.0,
            offset: 0.0,
        }
    }
}

/// Sample-by-sample waveform generator
pub struct SyntheticSignal {
    spec: SyntheticSpec,
    sample_rate: u32,
    phase: f32,
    gain: f32,
    rng: StdRng,
}

impl SyntheticSignal {
    pub fn new(spec: SyntheticSpec, sample_rate: u32) -> Self {
        Self {
            spec,
            sample_rate: sample_rate.max(1),
            phase: 0.0,
            gain: 1.0,
            rng: StdRng::seed_from_u64(0x5A5A_FFF0),
        }
    }

    /// Change the sample rate without resetting phase
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.max(1);
    }

    /// Linear gain applied to the deviation from `offset`
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    /// Produce the next sample
    pub fn next_sample(&mut self) -> f32 {
        let amplitude = self.spec.amplitude * self.gain;
        let deviation = match self.spec.pattern {
            SyntheticPattern::Sine => (2.0 * PI * self.phase).sin() * amplitude,
            SyntheticPattern::Square => {
                if self.phase < 0.5 {
                    amplitude
                } else {
                    -amplitude
                }
            }
            SyntheticPattern::WhiteNoise => {
                if amplitude > 0.0 {
                    self.rng.gen_range(-amplitude..amplitude)
                } else {
                    0.0
                }
            }
            SyntheticPattern::Silence => 0.0,
        };

        self.phase += self.spec.frequency_hz / self.sample_rate as f32;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        self.spec.offset + deviation
    }

    /// Fill `buffer` with consecutive samples
    pub fn fill(&mut self, buffer: &mut [f32]) {
        buffer.iter_mut().for_each(|sample| *sample = self.next_sample());
    }
}

impl AnalogReader for SyntheticSignal {
    fn read(&mut self) -> f32 {
        self.next_sample()
    }
}

/// Acquisition source running a [`SyntheticSignal`] on a paced thread
pub struct SyntheticSource {
    spec: SyntheticSpec,
    running: Arc<AtomicBool>,
    gain_bits: Arc<AtomicU32>,
    worker: Option<JoinHandle<()>>,
}

impl SyntheticSource {
    pub fn new(spec: SyntheticSpec) -> Self {
        Self {
            spec,
            running: Arc::new(AtomicBool::new(false)),
            gain_bits: Arc::new(AtomicU32::new(1.0f32.to_bits())),
            worker: None,
        }
    }
}

impl AcquisitionSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn start(
        &mut self,
        _channel: u8,
        sample_rate: u32,
        mut producer: FrameProducer,
    ) -> Result<(), CaptureError> {
        if sample_rate == 0 {
            return Err(CaptureError::InvalidSampleRate { rate: sample_rate });
        }
        self.stop();

        let mut signal = SyntheticSignal::new(self.spec.clone(), sample_rate);
        let running = Arc::clone(&self.running);
        let gain_bits = Arc::clone(&self.gain_bits);
        running.store(true, Ordering::SeqCst);

        let worker = thread::Builder::new()
            .name("synthetic-capture".to_string())
            .spawn(move || {
                let started = Instant::now();
                let mut emitted: u64 = 0;
                while running.load(Ordering::Relaxed) {
                    signal.set_gain(f32::from_bits(gain_bits.load(Ordering::Relaxed)));
                    // Emit exactly as many samples as wall-clock time allows
                    let due = (started.elapsed().as_secs_f64() * f64::from(sample_rate)) as u64;
                    while emitted < due {
                        producer.push_sample(signal.next_sample());
                        emitted += 1;
                    }
                    thread::sleep(TICK);
                }
            })
            .map_err(|err| CaptureError::StreamOpenFailed {
                reason: format!("failed to spawn synthetic capture thread: {}", err),
            })?;

        self.worker = Some(worker);
        log::info!(
            "[Capture] Synthetic {:?} source started at {} Hz",
            self.spec.pattern,
            sample_rate
        );
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("[Capture] Synthetic capture thread panicked");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn set_gain_mode(&mut self, mode: GainMode) -> Result<(), CaptureError> {
        self.gain_bits
            .store(mode.linear_gain().to_bits(), Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.stop();
    }
}
