// Window table - precomputed Hann coefficients
//
// Symmetric bell curve `0.5 * (1 - cos(2*pi*i / (N - 1)))`, normalized so the
// largest coefficient is exactly 1.0 (unity gain at the window peak).

/// Fixed per-slot window coefficients for one frame length
#[derive(Debug, Clone, PartialEq)]
pub struct WindowTable {
    coefficients: Vec<f32>,
}

impl WindowTable {
    /// Build a Hann table for `len` samples
    ///
    /// # Panics
    /// Panics if len < 2
    pub fn hann(len: usize) -> Self {
        assert!(len >= 2, "window length must be at least 2");

        let denominator = (len - 1) as f32;
        let mut coefficients: Vec<f32> = (0..len)
            .map(|i| 0.5 * (1.0 - ((2.0 * std::f32::consts::PI * i as f32) / denominator).cos()))
            .collect();

        let peak = coefficients.iter().copied().fold(0.0f32, f32::max);
        if peak > 0.0 {
            coefficients.iter_mut().for_each(|c| *c /= peak);
        }

        Self { coefficients }
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }
}
