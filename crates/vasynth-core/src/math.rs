//! Mathematical utility functions for synthesis.
//!
//! All functions are allocation-free and suitable for `no_std`.
//!
//! # Pitch Conversions
//!
//! - [`midi_to_freq`] - Equal-temperament note number to Hz
//! - [`semitones_to_ratio`] / [`octaves_to_ratio`] - Interval to frequency ratio
//!
//! # Utilities
//!
//! - [`flush_denormal`] - Denormal protection for recursive state
//! - [`fast_tanh`] - Saturation used by the ladder filter
//! - [`seconds_to_samples`] - Time conversion used by envelopes

use libm::{exp2f, roundf, tanhf};

/// Reference pitch of MIDI note 69 (A4) in Hz.
pub const A4_FREQUENCY: f32 = 440.0;

/// MIDI note number of A4.
pub const A4_NOTE: f32 = 69.0;

/// Convert a MIDI note number to frequency using equal temperament.
///
/// `f = 440 · 2^((n − 69) / 12)`
///
/// # Example
/// ```rust
/// use vasynth_core::midi_to_freq;
///
/// assert!((midi_to_freq(69.0) - 440.0).abs() < 1e-3);
/// assert!((midi_to_freq(57.0) - 220.0).abs() < 1e-3);
/// ```
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    A4_FREQUENCY * exp2f((note - A4_NOTE) / 12.0)
}

/// Frequency ratio for an interval given in semitones.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    exp2f(semitones / 12.0)
}

/// Frequency ratio for an interval given in octaves.
///
/// One octave of control voltage doubles the frequency (1 V/oct).
#[inline]
pub fn octaves_to_ratio(octaves: f32) -> f32 {
    exp2f(octaves)
}

/// Hyperbolic tangent, used for soft saturation.
///
/// Output is always in (-1, 1), which keeps feedback paths bounded.
#[inline]
pub fn fast_tanh(x: f32) -> f32 {
    tanhf(x)
}

/// Flush denormal numbers to zero.
///
/// Values below 1e-20 are replaced with zero before they reach the
/// subnormal range. Used on every filter state update.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Convert a duration in seconds to a whole number of samples.
///
/// Never returns zero, so a ramp always spans at least one sample.
#[inline]
pub fn seconds_to_samples(seconds: f32, sample_rate: f32) -> u32 {
    let samples = roundf(seconds * sample_rate);
    if samples < 1.0 { 1 } else { samples as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midi_to_freq_octaves() {
        assert!((midi_to_freq(69.0) - 440.0).abs() < 1e-3);
        assert!((midi_to_freq(81.0) - 880.0).abs() < 1e-2);
        assert!((midi_to_freq(60.0) - 261.6256).abs() < 1e-2);
    }

    #[test]
    fn ratios() {
        assert!((semitones_to_ratio(12.0) - 2.0).abs() < 1e-6);
        assert!((semitones_to_ratio(-12.0) - 0.5).abs() < 1e-6);
        assert!((octaves_to_ratio(1.0) - 2.0).abs() < 1e-6);
        assert!((octaves_to_ratio(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn denormals_flush() {
        assert_eq!(flush_denormal(1e-25), 0.0);
        assert_eq!(flush_denormal(-1e-30), 0.0);
        assert_eq!(flush_denormal(0.5), 0.5);
    }

    #[test]
    fn seconds_to_samples_never_zero() {
        assert_eq!(seconds_to_samples(0.0, 48000.0), 1);
        assert_eq!(seconds_to_samples(1.0, 44100.0), 44100);
        assert_eq!(seconds_to_samples(0.001, 48000.0), 48);
    }
}
