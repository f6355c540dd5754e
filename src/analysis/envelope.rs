// Envelope/threshold beat detector
//
// Runs alongside the band pass. Every STRIDE-th band index samples the raw
// waveform at that same index and feeds it through a derivative filter; the
// last filtered value of the pass is squared, gated and scaled into a beat
// intensity.

use super::filters::DerivativeFilter;

/// Beat detector state carried across frames
///
/// Note: the sample fed for band `b` is `raw[b]`, i.e. the band index doubles
/// as a time index into the frame. With 128 bands and 256-sample frames only
/// the first half of the frame is ever observed. This coupling is kept as-is
/// so tuned installations keep their response.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeDetector {
    derivative: DerivativeFilter,
    pass_value: Option<f32>,
    intensity: f32,
}

impl EnvelopeDetector {
    /// Band indices that sample the waveform
    pub const STRIDE: usize = 12;
    /// Gain applied to the derivative before squaring
    pub const GAIN: f32 = 10.0;
    /// Squared values below this are treated as silence
    pub const GATE: f32 = 0.2;
    /// Scale applied to values that pass the gate
    pub const SCALE: f32 = 5.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Whether band index `band` samples the waveform
    pub fn samples_band(band: usize) -> bool {
        band % Self::STRIDE == 0
    }

    /// Start a new band pass
    pub fn begin_pass(&mut self) {
        self.pass_value = None;
    }

    /// Feed band index `band` of the current pass
    ///
    /// `raw` is the claimed frame; `full_scale` (finite and positive, see
    /// [`CaptureConfig::validate`](crate::config::CaptureConfig::validate))
    /// normalizes samples to [-1, 1].
    pub fn observe(&mut self, band: usize, raw: &[f32], full_scale: f32) {
        if !Self::samples_band(band) {
            return;
        }
        let Some(&sample) = raw.get(band) else {
            return;
        };
        self.pass_value = Some(self.derivative.filter(sample / full_scale));
    }

    /// Close the pass and compute the beat intensity
    pub fn finish_pass(&mut self) -> f32 {
        if let Some(value) = self.pass_value.take() {
            self.intensity = gate(value);
        }
        self.intensity
    }

    /// Last computed intensity, in [0, 1]
    pub fn intensity(&self) -> f32 {
        self.intensity
    }
}

/// `(value * GAIN)^2`, zeroed below `GATE`, otherwise `min(v * SCALE, 1)`
pub fn gate(value: f32) -> f32 {
    let amplified = value * EnvelopeDetector::GAIN;
    let squared = amplified * amplified;
    if !squared.is_finite() || squared < EnvelopeDetector::GATE {
        0.0
    } else {
        (squared * EnvelopeDetector::SCALE).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn run_pass(detector: &mut EnvelopeDetector, raw: &[f32], bands: usize) -> f32 {
        detector.begin_pass();
        for band in 0..bands {
            detector.observe(band, raw, 4096.0);
        }
        detector.finish_pass()
    }

    #[test]
    fn test_gate_thresholds() {
        assert_eq!(gate(0.0), 0.0);
        // (0.04 * 10)^2 = 0.16 < 0.2
        assert_eq!(gate(0.04), 0.0);
        // (0.05 * 10)^2 = 0.25, * 5 = 1.25 -> 1.0
        assert_eq!(gate(0.05), 1.0);
        assert_eq!(gate(f32::NAN), 0.0);
        assert_eq!(gate(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_stride_selection() {
        assert!(EnvelopeDetector::samples_band(0));
        assert!(EnvelopeDetector::samples_band(12));
        assert!(EnvelopeDetector::samples_band(120));
        assert!(!EnvelopeDetector::samples_band(1));
        assert!(!EnvelopeDetector::samples_band(127));
    }

    #[test]
    fn test_silence_produces_no_beat() {
        let mut detector = EnvelopeDetector::new();
        let raw = vec![0.0; 256];
        for _ in 0..10 {
            assert_eq!(run_pass(&mut detector, &raw, 128), 0.0);
        }
    }

    #[test]
    fn test_sharp_transient_produces_beat() {
        let mut detector = EnvelopeDetector::new();
        let quiet = vec![0.0; 256];
        for _ in 0..5 {
            run_pass(&mut detector, &quiet, 128);
        }
        let mut loud = vec![0.0; 256];
        for (i, sample) in loud.iter_mut().enumerate() {
            if (i / 12) % 2 == 1 {
                *sample = 4000.0;
            }
        }
        let beat = run_pass(&mut detector, &loud, 128);
        assert!(beat > 0.0, "expected a beat, got {}", beat);
        assert!(beat <= 1.0);
    }

    #[test]
    fn test_empty_pass_keeps_previous_intensity() {
        let mut detector = EnvelopeDetector::new();
        detector.begin_pass();
        assert_eq!(detector.finish_pass(), 0.0);
        assert_eq!(detector.intensity(), 0.0);
    }

    #[test]
    fn test_randomized_input_stays_bounded() {
        let mut rng = StdRng::seed_from_u64(0xBEA7);
        let mut detector = EnvelopeDetector::new();
        for _ in 0..200 {
            let raw: Vec<f32> = (0..256).map(|_| rng.gen_range(-1.0e6..1.0e6)).collect();
            let beat = run_pass(&mut detector, &raw, 128);
            assert!((0.0..=1.0).contains(&beat), "beat out of range: {}", beat);
        }
    }
}
