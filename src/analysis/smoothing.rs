// Band smoother - one single-pole low-pass filter per band

/// Independent single-pole filters, `state += alpha * (raw - state)`
///
/// States persist across frames and are only reset by building a new
/// smoother. The state is kept unclamped; [`BandSmoother::value`] clamps the
/// exposed intensity to [0, 1].
#[derive(Debug, Clone)]
pub struct BandSmoother {
    alpha: f32,
    states: Vec<f32>,
}

impl BandSmoother {
    /// `alpha` is the weight of the newest value, in (0, 1]
    ///
    /// The range is enforced by [`crate::config::AnalysisConfig::validate`].
    pub fn new(band_count: usize, alpha: f32) -> Self {
        Self {
            alpha,
            states: vec![0.0; band_count],
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Advance band `band` by one step and return its clamped value
    pub fn step(&mut self, band: usize, raw: f32) -> f32 {
        let state = &mut self.states[band];
        if raw.is_finite() {
            *state += self.alpha * (raw - *state);
        }
        state.clamp(0.0, 1.0)
    }

    /// Clamped value of band `band`
    pub fn value(&self, band: usize) -> f32 {
        self.states[band].clamp(0.0, 1.0)
    }

    pub fn states(&self) -> &[f32] {
        &self.states
    }
}
