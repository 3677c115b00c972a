//! 16-bit PCM conversion and WAV inspection.

use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::Result;

/// Convert a float sample to 16-bit PCM: clamp to `[-1, 1]`, scale and round.
///
/// NaN maps to silence.
#[inline]
pub fn sample_to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let scaled = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round();
    // In range after the clamp.
    scaled as i16
}

/// WAV header details.
#[derive(Debug, Clone, PartialEq)]
pub struct WavInfo {
    /// Interleaved channel count.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Frames (samples per channel).
    pub num_frames: u64,
    /// Length in seconds.
    pub duration_secs: f64,
}

/// Read the header of a WAV file without decoding samples.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.len()) / u64::from(spec.channels.max(1));
    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs: num_frames as f64 / f64::from(spec.sample_rate),
    })
}

/// Read every interleaved sample of a WAV file as `f32` in `[-1, 1]`.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavInfo)> {
    let info = read_wav_info(&path)?;
    let reader = WavReader::open(path)?;
    let samples = match reader.spec().sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let full_scale = (1i64 << (info.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok((samples, info))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_clamps_and_rounds() {
        assert_eq!(sample_to_i16(0.0), 0);
        assert_eq!(sample_to_i16(1.0), 32767);
        assert_eq!(sample_to_i16(-1.0), -32767);
        assert_eq!(sample_to_i16(2.5), 32767);
        assert_eq!(sample_to_i16(-7.0), -32767);
        assert_eq!(sample_to_i16(0.5), 16384);
        assert_eq!(sample_to_i16(f32::NAN), 0);
    }
}
