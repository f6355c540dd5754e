// Spectral transform - forward FFT and magnitude spectrum
//
// The FFT is planned once for the frame length and reused; the transform
// keeps only its own scratch buffer between calls.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// FFT processor that computes magnitude spectra from complex frames
pub struct SpectralTransform {
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    fft_size: usize,
}

impl SpectralTransform {
    /// Plan a forward transform of `fft_size` points
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            fft,
            scratch,
            fft_size,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of magnitude bins produced per frame
    pub fn spectrum_len(&self) -> usize {
        self.fft_size / 2
    }

    /// Transform `frame` in place and write |X[k]| for k in 0..N/2
    ///
    /// # Arguments
    /// * `frame` - Complex frame of `fft_size` values (overwritten)
    /// * `spectrum` - Output magnitudes, at least `fft_size / 2` long
    pub fn magnitudes(&mut self, frame: &mut [Complex<f32>], spectrum: &mut [f32]) {
        debug_assert_eq!(frame.len(), self.fft_size, "complex frame length mismatch");

        self.fft.process_with_scratch(frame, &mut self.scratch);

        for (magnitude, bin) in spectrum
            .iter_mut()
            .zip(frame[..self.spectrum_len()].iter())
        {
            *magnitude = bin.norm();
        }
    }
}
