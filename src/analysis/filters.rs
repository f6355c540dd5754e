// Filter primitives shared by the envelope detector and envelope follower
//
// All filters are single-channel, allocation-free after construction, and
// keep their state until dropped.

use std::collections::VecDeque;

/// Moving average over the last `memory` inputs, blended into the previous
/// output with weight `gain`
///
/// `output += gain * (mean(window) - output)`. The first call seeds the
/// output with the first mean so the filter starts without a ramp from zero.
#[derive(Debug, Clone)]
pub struct RunningAverageFilter {
    gain: f32,
    window: VecDeque<f32>,
    memory: usize,
    sum: f32,
    output: Option<f32>,
}

impl RunningAverageFilter {
    /// # Panics
    /// Panics if memory is 0
    pub fn new(gain: f32, memory: usize) -> Self {
        assert!(memory > 0, "memory must be greater than 0");
        Self {
            gain: gain.clamp(0.0, 1.0),
            window: VecDeque::with_capacity(memory),
            memory,
            sum: 0.0,
            output: None,
        }
    }

    pub fn filter(&mut self, value: f32) -> f32 {
        if self.window.len() == self.memory {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }
        self.window.push_back(value);
        self.sum += value;

        // Recompute instead of trusting the running sum once it drifts to
        // non-finite values (e.g. after an infinite input leaves the window)
        if !self.sum.is_finite() {
            self.sum = self.window.iter().sum();
        }

        let mean = self.sum / self.window.len() as f32;
        let output = match self.output {
            Some(previous) => previous + self.gain * (mean - previous),
            None => mean,
        };
        self.output = Some(output);
        output
    }

    /// Last output, 0.0 before the first sample
    pub fn value(&self) -> f32 {
        self.output.unwrap_or(0.0)
    }
}

/// Minimum over the last `memory` inputs
#[derive(Debug, Clone)]
pub struct MinFilter {
    window: VecDeque<f32>,
    memory: usize,
}

impl MinFilter {
    /// # Panics
    /// Panics if memory is 0
    pub fn new(memory: usize) -> Self {
        assert!(memory > 0, "memory must be greater than 0");
        Self {
            window: VecDeque::with_capacity(memory),
            memory,
        }
    }

    pub fn filter(&mut self, value: f32) -> f32 {
        if self.window.len() == self.memory {
            self.window.pop_front();
        }
        self.window.push_back(value);
        self.window.iter().copied().fold(f32::INFINITY, f32::min)
    }
}

/// Rate-of-change detector
///
/// `|x - x_prev|` is smoothed by a running average, the running minimum of
/// that average is subtracted as a noise floor, and the result is clamped to
/// [0, 1]. Non-finite intermediate values produce 0.
#[derive(Debug, Clone)]
pub struct DerivativeFilter {
    average: RunningAverageFilter,
    floor: MinFilter,
    previous: f32,
    output: f32,
}

impl DerivativeFilter {
    pub const AVERAGE_GAIN: f32 = 0.2;
    pub const AVERAGE_MEMORY: usize = 10;
    pub const FLOOR_MEMORY: usize = 10;

    pub fn new() -> Self {
        Self {
            average: RunningAverageFilter::new(Self::AVERAGE_GAIN, Self::AVERAGE_MEMORY),
            floor: MinFilter::new(Self::FLOOR_MEMORY),
            previous: 0.0,
            output: 0.0,
        }
    }

    pub fn filter(&mut self, value: f32) -> f32 {
        let change = (value - self.previous).abs();
        self.previous = value;

        let smoothed = self.average.filter(change);
        let floor = self.floor.filter(smoothed);
        let above_floor = smoothed - floor;

        self.output = if above_floor.is_finite() {
            above_floor.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.output
    }

    pub fn value(&self) -> f32 {
        self.output
    }
}

impl Default for DerivativeFilter {
    fn default() -> Self {
        Self::new()
    }
}
