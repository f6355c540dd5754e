//! WAV input for offline analysis.
//!
//! Samples are normalized to [-1, 1] on load; callers scale them to the
//! capture full-scale value before feeding the pipeline so offline runs see
//! the same units as live capture.

use std::path::Path;

use crate::error::CaptureError;

/// Single-channel clip decoded from a WAV file
#[derive(Debug, Clone, PartialEq)]
pub struct WavClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl WavClip {
    /// Samples multiplied by `full_scale`
    pub fn scaled(&self, full_scale: f32) -> Vec<f32> {
        self.samples.iter().map(|s| s * full_scale).collect()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

fn read_error(path: &Path, err: impl std::fmt::Display) -> CaptureError {
    CaptureError::WavRead {
        reason: format!("error reading {}: {err}", path.display()),
    }
}

/// Decode `channel` of the WAV file at `path`
///
/// 16, 24 and 32-bit integer and 32-bit float files are supported.
pub fn read_wav(path: &Path, channel: u8) -> Result<WavClip, CaptureError> {
    let mut reader = hound::WavReader::open(path).map_err(|err| CaptureError::WavRead {
        reason: format!("failed to open {}: {err}", path.display()),
    })?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(CaptureError::WavRead {
            reason: format!("{} has zero channels", path.display()),
        });
    }
    if u16::from(channel) >= spec.channels {
        return Err(CaptureError::InvalidChannel { channel });
    }

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| read_error(path, err)))
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = match spec.bits_per_sample {
                16 => f32::from(i16::MAX),
                24 => 8_388_607.0,
                32 => i32::MAX as f32,
                bits => {
                    return Err(CaptureError::WavRead {
                        reason: format!(
                            "unsupported bits_per_sample={} for {}",
                            bits,
                            path.display()
                        ),
                    })
                }
            };
            reader
                .samples::<i32>()
                .map(|sample| {
                    sample
                        .map(|v| v as f32 / scale)
                        .map_err(|err| read_error(path, err))
                })
                .collect::<Result<Vec<f32>, _>>()?
        }
    };

    let samples = interleaved
        .iter()
        .skip(usize::from(channel))
        .step_by(usize::from(spec.channels))
        .copied()
        .collect();

    Ok(WavClip {
        samples,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_wav(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("audio_reactive_wav_{}_{}.wav", name, std::process::id()))
    }

    fn write_stereo_i16(path: &Path, left: &[i16], right: &[i16]) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for (l, r) in left.iter().zip(right) {
            writer.write_sample(*l).unwrap();
            writer.write_sample(*r).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_reads_selected_channel() {
        let path = temp_wav("stereo");
        write_stereo_i16(&path, &[i16::MAX, 0, i16::MAX], &[0, i16::MIN + 1, 0]);

        let left = read_wav(&path, 0).unwrap();
        let right = read_wav(&path, 1).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(left.sample_rate, 8_000);
        assert_eq!(left.samples, vec![1.0, 0.0, 1.0]);
        assert_eq!(right.samples, vec![0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_rejects_missing_channel() {
        let path = temp_wav("mono_channel");
        write_stereo_i16(&path, &[1], &[2]);
        let result = read_wav(&path, 2);
        std::fs::remove_file(&path).ok();
        assert_eq!(result, Err(CaptureError::InvalidChannel { channel: 2 }));
    }

    #[test]
    fn test_missing_file_is_wav_error() {
        let result = read_wav(Path::new("/nonexistent/clip.wav"), 0);
        assert!(matches!(result, Err(CaptureError::WavRead { .. })));
    }

    #[test]
    fn test_scaled_and_duration() {
        let clip = WavClip {
            samples: vec![0.5, -0.25, 1.0, 0.0],
            sample_rate: 4,
        };
        assert_eq!(clip.scaled(4096.0), vec![2048.0, -1024.0, 4096.0, 0.0]);
        assert_eq!(clip.duration_secs(), 1.0);
    }
}
