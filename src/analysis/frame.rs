// Frame builder - raw frame to windowed complex frame
//
// `Complex<f32>` is `#[repr(C)]` {re, im}, so a slice of N complex values is
// the interleaved [re0, im0, re1, im1, ...] layout of 2N scalars.

use rustfft::num_complex::Complex;

use super::window::WindowTable;

/// Apply the window to `raw` and write real/zero-imaginary pairs into `out`
///
/// Pure and deterministic. All three lengths must match; the pipeline checks
/// this once at initialization.
pub fn build_complex_frame(raw: &[f32], window: &WindowTable, out: &mut [Complex<f32>]) {
    debug_assert_eq!(raw.len(), window.len(), "raw frame and window length differ");
    debug_assert_eq!(raw.len(), out.len(), "raw frame and complex frame length differ");

    for ((slot, &sample), &coefficient) in out
        .iter_mut()
        .zip(raw.iter())
        .zip(window.coefficients().iter())
    {
        *slot = Complex::new(sample * coefficient, 0.0);
    }
}
