// Band aggregator - magnitude spectrum to per-band decibel intensities
//
// Band b averages bins b and b+1 (bin 0 excluded but still counted in the
// divisor), converts to decibels and maps [min_db, max_db] onto [0, 1].
// The mapping is linear and unclamped: values below min_db are negative and
// values above max_db exceed 1.

/// Smallest average magnitude passed to log10
pub const MAGNITUDE_FLOOR: f32 = 1e-9;

/// Nominal number of bins averaged per band
pub const BINS_PER_BAND: usize = 2;

/// Mean magnitude of bins `[start, start + BINS_PER_BAND)` restricted to
/// `[1, spectrum.len())`, divided by the nominal width
pub fn average_magnitude(spectrum: &[f32], start: usize) -> f32 {
    let end = (start + BINS_PER_BAND).min(spectrum.len());
    let first = start.max(1);
    if first >= end {
        return 0.0;
    }
    let total: f32 = spectrum[first..end].iter().sum();
    total / BINS_PER_BAND as f32
}

/// 20 * log10(magnitude), with magnitude floored at [`MAGNITUDE_FLOOR`]
pub fn magnitude_to_db(magnitude: f32) -> f32 {
    let magnitude = if magnitude.is_finite() {
        magnitude.max(MAGNITUDE_FLOOR)
    } else {
        MAGNITUDE_FLOOR
    };
    20.0 * magnitude.log10()
}

/// Linear map of `[min_db, max_db]` onto `[0, 1]`, not clamped
pub fn normalize_db(db: f32, min_db: f32, max_db: f32) -> f32 {
    (db - min_db) / (max_db - min_db)
}

/// Converts a magnitude spectrum into `band_count` raw intensities
#[derive(Debug, Clone)]
pub struct BandAggregator {
    band_count: usize,
    min_db: f32,
    max_db: f32,
}

impl BandAggregator {
    pub fn new(band_count: usize, min_db: f32, max_db: f32) -> Self {
        Self {
            band_count,
            min_db,
            max_db,
        }
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Raw intensity of one band
    pub fn band_intensity(&self, spectrum: &[f32], band: usize) -> f32 {
        let db = magnitude_to_db(average_magnitude(spectrum, band));
        normalize_db(db, self.min_db, self.max_db)
    }

    /// Fill `bands` (length `band_count`) from `spectrum`
    pub fn aggregate(&self, spectrum: &[f32], bands: &mut [f32]) {
        for (band, slot) in bands.iter_mut().enumerate().take(self.band_count) {
            *slot = self.band_intensity(spectrum, band);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_skips_dc_but_keeps_divisor() {
        let spectrum = [100.0, 4.0, 6.0, 8.0];
        // Band 0 sees only bin 1
        assert_eq!(average_magnitude(&spectrum, 0), 2.0);
        assert_eq!(average_magnitude(&spectrum, 1), 5.0);
        assert_eq!(average_magnitude(&spectrum, 2), 7.0);
        // Last band sees only the final bin
        assert_eq!(average_magnitude(&spectrum, 3), 4.0);
        assert_eq!(average_magnitude(&spectrum, 4), 0.0);
    }

    #[test]
    fn test_floor_keeps_silence_finite() {
        let db = magnitude_to_db(0.0);
        assert!(db.is_finite());
        assert!((db - (-180.0)).abs() < 1e-3);
        assert_eq!(magnitude_to_db(f32::NAN), db);
    }

    #[test]
    fn test_normalization_is_unclamped() {
        assert_eq!(normalize_db(50.0, 50.0, 120.0), 0.0);
        assert_eq!(normalize_db(120.0, 50.0, 120.0), 1.0);
        assert!(normalize_db(0.0, 50.0, 120.0) < 0.0);
        assert!(normalize_db(190.0, 50.0, 120.0) > 1.0);
    }

    #[test]
    fn test_aggregate_fills_every_band() {
        let aggregator = BandAggregator::new(4, 50.0, 120.0);
        let spectrum = vec![0.0; 8];
        let mut bands = vec![f32::NAN; 4];
        aggregator.aggregate(&spectrum, &mut bands);
        assert!(bands.iter().all(|b| b.is_finite()));
        assert!(bands.iter().all(|&b| b < 0.0));
    }

    #[test]
    fn test_peak_bin_dominates_neighbours() {
        let aggregator = BandAggregator::new(8, 50.0, 120.0);
        let mut spectrum = vec![1.0; 8];
        spectrum[5] = 10_000.0;
        let mut bands = vec![0.0; 8];
        aggregator.aggregate(&spectrum, &mut bands);

        // Bands 4 and 5 both include bin 5
        assert!(bands[4] > bands[3]);
        assert!(bands[5] > bands[6]);
        assert_eq!(bands[4], bands[5]);
    }
}
