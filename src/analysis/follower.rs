// Lightweight envelope follower
//
// Single analog input, no FFT. Tracks the rate of change of the input,
// removes a slowly adapting noise floor and emits a smoothed [0, 1] level.

use std::time::{Duration, Instant};

use super::filters::{MinFilter, RunningAverageFilter};
use super::ReactiveInput;
use crate::capture::{AnalogReader, TimeSource};
use crate::config::EnvelopeFollowerConfig;

/// Shortest interval used for the rate computation
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Envelope follower driven by an [`AnalogReader`] and a [`TimeSource`]
pub struct EnvelopeFollower<R: AnalogReader, T: TimeSource> {
    reader: R,
    clock: T,
    config: EnvelopeFollowerConfig,
    amplitude: RunningAverageFilter,
    floor: MinFilter,
    output: RunningAverageFilter,
    previous: Option<(f32, Instant)>,
    level: f32,
}

impl<R: AnalogReader, T: TimeSource> EnvelopeFollower<R, T> {
    pub fn new(reader: R, clock: T, config: EnvelopeFollowerConfig) -> Self {
        let amplitude = RunningAverageFilter::new(config.rate_gain, config.rate_memory.max(1));
        let floor = MinFilter::new(config.floor_memory.max(1));
        let output = RunningAverageFilter::new(config.output_gain, config.output_memory.max(1));

        Self {
            reader,
            clock,
            config,
            amplitude,
            floor,
            output,
            previous: None,
            level: 0.0,
        }
    }

    /// Read one sample and return the updated level in [0, 1]
    pub fn update(&mut self) -> f32 {
        let sample = self.reader.read();
        let now = self.clock.now();

        let rate = match self.previous {
            Some((previous, at)) => {
                let dt = now.saturating_duration_since(at).max(MIN_INTERVAL);
                (sample - previous) / dt.as_secs_f32()
            }
            None => 0.0,
        };
        self.previous = Some((sample, now));

        let amplitude = self.amplitude.filter(rate.abs());
        let floor = self.floor.filter(amplitude);
        let normalized =
            (amplitude - floor - self.config.floor_offset).clamp(0.0, self.config.ceiling);
        let divisor = if self.config.output_divisor != 0.0 {
            self.config.output_divisor
        } else {
            1.0
        };
        let smoothed = self.output.filter(normalized / divisor);

        self.level = if smoothed.is_finite() {
            smoothed.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.level
    }

    /// Last returned level
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }
}

impl<R: AnalogReader, T: TimeSource> ReactiveInput for EnvelopeFollower<R, T> {
    fn update(&mut self) -> f32 {
        EnvelopeFollower::update(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SteppedTimeSource;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn follower<R: AnalogReader>(reader: R) -> EnvelopeFollower<R, SteppedTimeSource> {
        EnvelopeFollower::new(
            reader,
            SteppedTimeSource::new(Duration::from_millis(1)),
            EnvelopeFollowerConfig::default(),
        )
    }

    #[test]
    fn test_constant_input_stays_silent() {
        let mut follower = follower(|| 2048.0f32);
        for _ in 0..500 {
            assert_eq!(follower.update(), 0.0);
        }
    }

    fn square_wave() -> impl FnMut() -> f32 {
        let mut tick = 0u32;
        move || {
            tick += 1;
            if (tick / 2) % 2 == 0 {
                0.0
            } else {
                4000.0
            }
        }
    }

    #[test]
    fn test_onset_drives_level_up() {
        let mut follower = follower(square_wave());
        let peak = (0..150).map(|_| follower.update()).fold(0.0f32, f32::max);
        assert!(peak > 0.5, "expected a high level at onset, got {}", peak);
        assert!(peak <= 1.0);
    }

    #[test]
    fn test_steady_signal_adapts_to_floor() {
        let mut follower = follower(square_wave());
        let peak = (0..150).map(|_| follower.update()).fold(0.0f32, f32::max);
        for _ in 0..2_000 {
            follower.update();
        }
        assert!(follower.level() < peak);
        assert!(follower.level() < 0.1, "level did not settle: {}", follower.level());
    }

    #[test]
    fn test_random_input_bounded() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut follower = follower(move || rng.gen_range(-1.0e7f32..1.0e7));
        for _ in 0..1_000 {
            let level = follower.update();
            assert!((0.0..=1.0).contains(&level), "level out of range: {}", level);
        }
    }

    #[test]
    fn test_zero_interval_is_floored() {
        struct FrozenClock(Instant);
        impl TimeSource for FrozenClock {
            fn now(&self) -> Instant {
                self.0
            }
        }

        let mut tick = 0.0f32;
        let mut follower = EnvelopeFollower::new(
            move || {
                tick += 100.0;
                tick
            },
            FrozenClock(Instant::now()),
            EnvelopeFollowerConfig::default(),
        );
        for _ in 0..50 {
            let level = follower.update();
            assert!(level.is_finite());
        }
    }
}
