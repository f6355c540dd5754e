// FrameExchange - lock-free latest-frame hand-off between capture and analysis
//
// Three pre-allocated frame buffers are shared between the acquisition source
// (producer) and the analysis pipeline (consumer) through a triple buffer.
// No heap allocation happens on the producer path.
//
// Buffer roles:
// - BACK: the buffer the producer is filling
// - MIDDLE: the most recently completed frame, not yet claimed
// - FRONT: the buffer the consumer copied its last claim from
//
// Buffer flow:
// 1. Producer writes samples into BACK until it holds a full frame
// 2. Producer publishes: BACK and MIDDLE swap atomically
// 3. Consumer claims: if MIDDLE is fresh, MIDDLE and FRONT swap atomically
// 4. Consumer copies FRONT out
//
// Overwrite policy: the newest completed frame always wins. Publishing while
// MIDDLE still holds an unclaimed frame replaces that frame, so a stalled
// consumer loses older frames, never newer ones. The producer never blocks
// and never drops samples.
//
// Visibility: the MIDDLE swap is an acquire-release exchange, so every sample
// written before `publish` is visible to the consumer after `update`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use triple_buffer::{Input, Output, TripleBuffer};

/// Raw frame storage - pre-allocated vector of samples
pub type FrameBuffer = Vec<f32>;

/// Counters shared by both ends of one exchange
#[derive(Debug, Default)]
struct ExchangeCounters {
    frames_completed: AtomicU64,
    frames_overwritten: AtomicU64,
}

/// Point-in-time copy of the exchange counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExchangeStats {
    /// Frames fully written by the producer
    pub frames_completed: u64,
    /// Completed frames replaced by a newer frame before the claim
    pub frames_overwritten: u64,
}

impl ExchangeStats {
    /// Sum of two snapshots, used to carry totals across capture restarts
    pub fn accumulate(&self, other: &ExchangeStats) -> ExchangeStats {
        ExchangeStats {
            frames_completed: self.frames_completed + other.frames_completed,
            frames_overwritten: self.frames_overwritten + other.frames_overwritten,
        }
    }
}

impl ExchangeCounters {
    fn snapshot(&self) -> ExchangeStats {
        ExchangeStats {
            frames_completed: self.frames_completed.load(Ordering::Relaxed),
            frames_overwritten: self.frames_overwritten.load(Ordering::Relaxed),
        }
    }
}

/// Split exchange endpoints for producer/consumer separation
///
/// Returned by [`FrameExchange::new`]; move `producer` into the acquisition
/// context and keep `consumer` on the polling side.
pub struct FrameExchangeChannels {
    pub producer: FrameProducer,
    pub consumer: FrameConsumer,
}

/// Builder for the producer/consumer frame exchange
pub struct FrameExchange;

impl FrameExchange {
    /// Create an exchange whose buffers each hold `frame_size` samples
    ///
    /// # Panics
    /// Panics if frame_size is 0
    #[allow(clippy::new_ret_no_self)]
    pub fn new(frame_size: usize) -> FrameExchangeChannels {
        assert!(frame_size > 0, "frame_size must be greater than 0");

        let (input, output) = TripleBuffer::new(&vec![0.0_f32; frame_size]).split();
        let counters = Arc::new(ExchangeCounters::default());

        FrameExchangeChannels {
            producer: FrameProducer {
                input,
                fill: 0,
                frame_size,
                counters: Arc::clone(&counters),
            },
            consumer: FrameConsumer { output, counters },
        }
    }
}

/// Acquisition-side endpoint
///
/// Always owns exactly one writable buffer. All methods are wait-free and
/// allocation-free, so they may be called from an audio callback.
pub struct FrameProducer {
    input: Input<FrameBuffer>,
    fill: usize,
    frame_size: usize,
    counters: Arc<ExchangeCounters>,
}

impl FrameProducer {
    /// Samples per frame
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Append one sample to the frame being filled
    ///
    /// Completes and publishes the frame when it reaches `frame_size`
    /// samples, replacing any completed frame the consumer has not claimed.
    pub fn push_sample(&mut self, sample: f32) {
        self.input.input_buffer()[self.fill] = sample;
        self.fill += 1;

        if self.fill == self.frame_size {
            self.fill = 0;
            let overwrote = self.input.publish();
            self.counters
                .frames_completed
                .fetch_add(1, Ordering::Relaxed);
            if overwrote {
                self.counters
                    .frames_overwritten
                    .fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Append a block of samples in order
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.push_sample(sample);
        }
    }

    /// Samples already written into the frame being filled
    pub fn pending_samples(&self) -> usize {
        self.fill
    }
}

/// Polling-side endpoint
pub struct FrameConsumer {
    output: Output<FrameBuffer>,
    counters: Arc<ExchangeCounters>,
}

impl FrameConsumer {
    /// Whether a completed frame is waiting to be claimed
    pub fn is_frame_ready(&self) -> bool {
        self.output.updated()
    }

    /// Claim the newest completed frame
    ///
    /// Copies the newest frame into `dest` (up to `dest.len()` samples).
    /// Each completed frame can be claimed at most once.
    ///
    /// # Returns
    /// `true` if a frame was copied, `false` if none was ready (`dest` untouched)
    pub fn claim_frame(&mut self, dest: &mut [f32]) -> bool {
        if !self.output.update() {
            return false;
        }

        let frame = self.output.output_buffer();
        let len = dest.len().min(frame.len());
        dest[..len].copy_from_slice(&frame[..len]);
        true
    }

    /// Snapshot of the exchange counters
    pub fn stats(&self) -> ExchangeStats {
        self.counters.snapshot()
    }
}
