//! Voltage-controlled oscillator with additive band-limiting.
//!
//! The phase accumulator runs in radians, φ ∈ [0, 2π). Each tick produces
//! one sample at the current phase and then advances by
//! `2π · f_eff / f_s`, where
//!
//! ```text
//! f_eff = f_base · 2^(detune/12) · 2^(cv · sens) · (1 + fm · fm_depth)
//! ```
//!
//! clamped to [0, f_s / 2].
//!
//! # Anti-aliasing
//!
//! Sawtooth, triangle and square are built as a Fourier sum of their
//! harmonics up to `⌊f_s / (2 · f_eff)⌋`, capped at [`MAX_HARMONICS`] to bound
//! per-sample cost. The sines of the harmonics come from the Chebyshev
//! recurrence `sin((k+1)φ) = 2cos(φ)·sin(kφ) − sin((k−1)φ)`, so one `sin`
//! and one `cos` are evaluated per sample regardless of harmonic count.
//!
//! The square is the difference of two band-limited saws offset by the duty
//! cycle, which keeps any pulse width band-limited.
//!
//! Gibbs ripple lets band-limited waveforms overshoot ±1 by roughly 18%,
//! see [`Oscillator::PEAK`].

use core::f32::consts::{PI, TAU};
use libm::{cosf, floorf, sinf};

use crate::math::{octaves_to_ratio, semitones_to_ratio};
use crate::param::ParamRange;
use crate::waveform::{NoiseGenerator, Waveform};

/// Upper bound on harmonics summed per sample.
pub const MAX_HARMONICS: u32 = 20;

/// Audio-rate oscillator.
///
/// ## Parameters
///
/// - `frequency`: base frequency in Hz (0 to 20000, default 440)
/// - `detune`: offset in semitones (−24 to 24, default 0)
/// - `cv_sensitivity`: octaves per unit of pitch CV (0 to 4, default 1)
/// - `fm_depth`: scale of the FM input (0 to 1, default 0)
/// - `pulse_width`: duty cycle of the square (0.01 to 0.99, default 0.5)
/// - `level`: output gain (0 to 1, default 1)
/// - `sample_hold_rate`: trigger rate of sample-and-hold in Hz (0.1 to 20000, default 100)
///
/// # Example
///
/// ```rust
/// use vasynth_core::{Oscillator, Waveform};
///
/// let mut osc = Oscillator::new(48000.0);
/// osc.set_frequency(220.0);
/// osc.set_waveform(Waveform::Sawtooth);
///
/// let sample = osc.tick(0.0, 0.0);
/// assert!(sample.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    sample_rate: f32,
    phase: f32,
    waveform: Waveform,
    frequency: f32,
    detune: f32,
    detune_ratio: f32,
    cv_sensitivity: f32,
    fm_depth: f32,
    pulse_width: f32,
    level: f32,
    sample_hold_rate: f32,
    sh_phase: f32,
    held: f32,
    noise: NoiseGenerator,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Oscillator {
    /// Range of [`set_frequency`](Self::set_frequency).
    pub const FREQUENCY: ParamRange = ParamRange::new(0.0, 20000.0, 440.0);
    /// Range of [`set_detune`](Self::set_detune).
    pub const DETUNE: ParamRange = ParamRange::new(-24.0, 24.0, 0.0);
    /// Range of [`set_cv_sensitivity`](Self::set_cv_sensitivity).
    pub const CV_SENSITIVITY: ParamRange = ParamRange::new(0.0, 4.0, 1.0);
    /// Range of [`set_fm_depth`](Self::set_fm_depth).
    pub const FM_DEPTH: ParamRange = ParamRange::new(0.0, 1.0, 0.0);
    /// Range of [`set_pulse_width`](Self::set_pulse_width).
    pub const PULSE_WIDTH: ParamRange = ParamRange::new(0.01, 0.99, 0.5);
    /// Range of [`set_level`](Self::set_level).
    pub const LEVEL: ParamRange = ParamRange::new(0.0, 1.0, 1.0);
    /// Range of [`set_sample_hold_rate`](Self::set_sample_hold_rate).
    pub const SAMPLE_HOLD_RATE: ParamRange = ParamRange::new(0.1, 20000.0, 100.0);

    /// Largest absolute output at unit level, including Gibbs overshoot.
    pub const PEAK: f32 = 1.25;

    /// Create an oscillator at `sample_rate` Hz with default parameters.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            phase: 0.0,
            waveform: Waveform::Sine,
            frequency: Self::FREQUENCY.default,
            detune: 0.0,
            detune_ratio: 1.0,
            cv_sensitivity: Self::CV_SENSITIVITY.default,
            fm_depth: Self::FM_DEPTH.default,
            pulse_width: Self::PULSE_WIDTH.default,
            level: Self::LEVEL.default,
            sample_hold_rate: Self::SAMPLE_HOLD_RATE.default,
            sh_phase: 1.0,
            held: 0.0,
            noise: NoiseGenerator::default(),
        }
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Set the waveform.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Current waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Set the base frequency in Hz. Clamped to [`Self::FREQUENCY`].
    pub fn set_frequency(&mut self, hz: f32) {
        self.frequency = Self::FREQUENCY.clamp(hz);
    }

    /// Base frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set the detune in semitones.
    pub fn set_detune(&mut self, semitones: f32) {
        self.detune = Self::DETUNE.clamp(semitones);
        self.detune_ratio = semitones_to_ratio(self.detune);
    }

    /// Detune in semitones.
    pub fn detune(&self) -> f32 {
        self.detune
    }

    /// Set the pitch CV sensitivity in octaves per unit.
    pub fn set_cv_sensitivity(&mut self, octaves: f32) {
        self.cv_sensitivity = Self::CV_SENSITIVITY.clamp(octaves);
    }

    /// Pitch CV sensitivity in octaves per unit.
    pub fn cv_sensitivity(&self) -> f32 {
        self.cv_sensitivity
    }

    /// Set the FM depth.
    pub fn set_fm_depth(&mut self, depth: f32) {
        self.fm_depth = Self::FM_DEPTH.clamp(depth);
    }

    /// FM depth.
    pub fn fm_depth(&self) -> f32 {
        self.fm_depth
    }

    /// Set the square duty cycle.
    pub fn set_pulse_width(&mut self, width: f32) {
        self.pulse_width = Self::PULSE_WIDTH.clamp(width);
    }

    /// Square duty cycle.
    pub fn pulse_width(&self) -> f32 {
        self.pulse_width
    }

    /// Set the output level.
    pub fn set_level(&mut self, level: f32) {
        self.level = Self::LEVEL.clamp(level);
    }

    /// Output level.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Set the sample-and-hold trigger rate in Hz.
    pub fn set_sample_hold_rate(&mut self, hz: f32) {
        self.sample_hold_rate = Self::SAMPLE_HOLD_RATE.clamp(hz);
    }

    /// Sample-and-hold trigger rate in Hz.
    pub fn sample_hold_rate(&self) -> f32 {
        self.sample_hold_rate
    }

    /// Reseed the noise generator and restart its sequence.
    pub fn set_noise_seed(&mut self, seed: u32) {
        self.noise = NoiseGenerator::new(seed);
    }

    /// Current phase in radians, in [0, 2π).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Set the phase in radians. Wrapped into [0, 2π).
    pub fn set_phase(&mut self, radians: f32) {
        let wrapped = radians - TAU * floorf(radians / TAU);
        self.phase = if wrapped >= TAU { 0.0 } else { wrapped };
    }

    /// Zero the phase and restart the noise sequence.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.sh_phase = 1.0;
        self.held = 0.0;
        self.noise.reset();
    }

    /// Frequency the next tick will run at for the given inputs.
    #[inline]
    pub fn effective_frequency(&self, cv: f32, fm: f32) -> f32 {
        let f = self.frequency
            * self.detune_ratio
            * octaves_to_ratio(cv * self.cv_sensitivity)
            * (1.0 + fm * self.fm_depth);
        if f.is_finite() {
            f.clamp(0.0, self.sample_rate * 0.5)
        } else {
            0.0
        }
    }

    /// Produce one sample and advance the phase.
    ///
    /// `cv` is pitch control in units scaled by the CV sensitivity; `fm` is
    /// the audio-rate frequency modulation input scaled by the FM depth.
    #[inline]
    pub fn tick(&mut self, cv: f32, fm: f32) -> f32 {
        let f_eff = self.effective_frequency(cv, fm);
        let harmonics = self.harmonic_count(f_eff);

        let raw = match self.waveform {
            Waveform::Sine => sinf(self.phase),
            Waveform::Sawtooth => band_limited_saw(self.phase, harmonics),
            Waveform::Triangle => band_limited_triangle(self.phase, harmonics),
            Waveform::Square => band_limited_pulse(self.phase, self.pulse_width, harmonics),
            Waveform::Noise => self.noise.next_bipolar(),
            Waveform::SampleAndHold => {
                if self.sh_phase >= 1.0 {
                    self.sh_phase -= floorf(self.sh_phase);
                    self.held = self.noise.next_bipolar();
                }
                self.sh_phase += self.sample_hold_rate / self.sample_rate;
                self.held
            }
        };

        self.phase += TAU * f_eff / self.sample_rate;
        if self.phase >= TAU {
            self.phase -= TAU;
        }

        raw * self.level
    }

    /// Harmonics that fit below Nyquist at `f_eff`, in [1, MAX_HARMONICS].
    #[inline]
    pub fn harmonic_count(&self, f_eff: f32) -> u32 {
        if f_eff <= 0.0 {
            return MAX_HARMONICS;
        }
        let n = floorf(self.sample_rate / (2.0 * f_eff));
        if n >= MAX_HARMONICS as f32 {
            MAX_HARMONICS
        } else if n < 1.0 {
            1
        } else {
            n as u32
        }
    }
}

/// Rising sawtooth: `−(2/π) Σ sin(kφ)/k`.
fn band_limited_saw(phase: f32, harmonics: u32) -> f32 {
    let two_cos = 2.0 * cosf(phase);
    let mut s_prev = 0.0;
    let mut s_k = sinf(phase);
    let mut sum = 0.0;
    for k in 1..=harmonics {
        sum += s_k / k as f32;
        let next = two_cos * s_k - s_prev;
        s_prev = s_k;
        s_k = next;
    }
    -(2.0 / PI) * sum
}

/// Triangle: `(8/π²) Σ_odd (−1)^((k−1)/2) sin(kφ)/k²`.
fn band_limited_triangle(phase: f32, harmonics: u32) -> f32 {
    let two_cos = 2.0 * cosf(phase);
    let mut s_prev = 0.0;
    let mut s_k = sinf(phase);
    let mut sum = 0.0;
    for k in 1..=harmonics {
        if k % 2 == 1 {
            let sign = if (k / 2) % 2 == 0 { 1.0 } else { -1.0 };
            let kf = k as f32;
            sum += sign * s_k / (kf * kf);
        }
        let next = two_cos * s_k - s_prev;
        s_prev = s_k;
        s_k = next;
    }
    (8.0 / (PI * PI)) * sum
}

/// Pulse high for the first `width` of the cycle, from two offset saws.
fn band_limited_pulse(phase: f32, width: f32, harmonics: u32) -> f32 {
    let mut shifted = phase - TAU * width;
    if shifted < 0.0 {
        shifted += TAU;
    }
    (2.0 * width - 1.0) - (band_limited_saw(phase, harmonics) - band_limited_saw(shifted, harmonics))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    fn render(osc: &mut Oscillator, n: usize) -> Vec<f32> {
        (0..n).map(|_| osc.tick(0.0, 0.0)).collect()
    }

    #[test]
    fn sine_matches_reference() {
        let mut osc = Oscillator::new(SR);
        osc.set_frequency(1000.0);
        for n in 0..100 {
            let expected = sinf(TAU * 1000.0 * n as f32 / SR);
            let got = osc.tick(0.0, 0.0);
            assert!((got - expected).abs() < 1e-3, "n={n} got {got} expected {expected}");
        }
    }

    #[test]
    fn square_is_high_then_low() {
        let mut osc = Oscillator::new(SR);
        osc.set_frequency(100.0);
        osc.set_waveform(Waveform::Square);
        let out = render(&mut osc, 480);
        // Quarter and three-quarter points of the cycle, away from the edges.
        assert!(out[120] > 0.8, "first half should be high: {}", out[120]);
        assert!(out[360] < -0.8, "second half should be low: {}", out[360]);
    }

    #[test]
    fn saw_rises_through_cycle() {
        let mut osc = Oscillator::new(SR);
        osc.set_frequency(100.0);
        osc.set_waveform(Waveform::Sawtooth);
        let out = render(&mut osc, 480);
        assert!(out[60] < out[240], "saw should rise: {} vs {}", out[60], out[240]);
        assert!(out[240] < out[420], "saw should rise: {} vs {}", out[240], out[420]);
    }

    #[test]
    fn triangle_peaks_at_quarter_cycle() {
        let mut osc = Oscillator::new(SR);
        osc.set_frequency(100.0);
        osc.set_waveform(Waveform::Triangle);
        let out = render(&mut osc, 480);
        assert!((out[120] - 1.0).abs() < 0.05, "peak {}", out[120]);
        assert!((out[360] + 1.0).abs() < 0.05, "trough {}", out[360]);
    }

    #[test]
    fn harmonic_count_is_capped() {
        let osc = Oscillator::new(SR);
        assert_eq!(osc.harmonic_count(50.0), MAX_HARMONICS);
        assert_eq!(osc.harmonic_count(4000.0), 6);
        assert_eq!(osc.harmonic_count(20000.0), 1);
    }

    #[test]
    fn band_limited_output_stays_bounded() {
        for waveform in Waveform::ALL {
            for width in [0.01, 0.25, 0.5, 0.99] {
                let mut osc = Oscillator::new(SR);
                osc.set_waveform(waveform);
                osc.set_pulse_width(width);
                osc.set_frequency(97.0);
                for s in render(&mut osc, 2000) {
                    assert!(s.abs() <= Oscillator::PEAK, "{waveform:?} width {width}: {s}");
                }
            }
        }
    }

    #[test]
    fn cv_raises_pitch_by_octaves() {
        let osc = Oscillator::new(SR);
        assert!((osc.effective_frequency(1.0, 0.0) - 880.0).abs() < 0.01);
        assert!((osc.effective_frequency(-1.0, 0.0) - 220.0).abs() < 0.01);
    }

    #[test]
    fn fm_scales_frequency() {
        let mut osc = Oscillator::new(SR);
        osc.set_fm_depth(0.5);
        assert!((osc.effective_frequency(0.0, 1.0) - 660.0).abs() < 0.01);
    }

    #[test]
    fn effective_frequency_is_clamped_to_nyquist() {
        let mut osc = Oscillator::new(SR);
        osc.set_frequency(20000.0);
        assert_eq!(osc.effective_frequency(4.0, 0.0), SR * 0.5);
    }

    #[test]
    fn sample_and_hold_steps() {
        let mut osc = Oscillator::new(SR);
        osc.set_waveform(Waveform::SampleAndHold);
        osc.set_sample_hold_rate(100.0);
        let out = render(&mut osc, 960);
        // One step every 480 samples.
        assert!(out[..470].iter().all(|&s| s == out[0]));
        assert!(out[470..500].iter().any(|&s| s != out[0]));
    }

    #[test]
    fn pulse_width_is_clamped() {
        let mut osc = Oscillator::new(SR);
        osc.set_pulse_width(0.0);
        assert_eq!(osc.pulse_width(), 0.01);
        osc.set_pulse_width(1.0);
        assert_eq!(osc.pulse_width(), 0.99);
    }

    #[test]
    fn reset_restores_phase_and_noise() {
        let mut osc = Oscillator::new(SR);
        osc.set_waveform(Waveform::Noise);
        let first = render(&mut osc, 16);
        osc.reset();
        assert_eq!(osc.phase(), 0.0);
        assert_eq!(render(&mut osc, 16), first);
    }
}
