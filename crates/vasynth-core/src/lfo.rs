//! Low frequency oscillator for modulation sources.
//!
//! Shares the [`Waveform`] selection with the audio oscillator but runs a
//! naive phase accumulator: at sub-audio rates aliasing is not a concern.

use core::f32::consts::TAU;
use libm::sinf;

use crate::param::ParamRange;
use crate::waveform::{NoiseGenerator, Waveform};

/// Low frequency oscillator producing values in [-depth, depth].
///
/// # Example
///
/// ```rust
/// use vasynth_core::{Lfo, Waveform};
///
/// let mut lfo = Lfo::new(44100.0);
/// lfo.set_rate(2.0);
/// lfo.set_waveform(Waveform::Triangle);
///
/// let value = lfo.tick();
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Phase in [0, 1)
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
    rate: f32,
    depth: f32,
    waveform: Waveform,
    held: f32,
    noise: NoiseGenerator,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Lfo {
    /// Range of [`set_rate`](Self::set_rate), in Hz.
    pub const RATE: ParamRange = ParamRange::new(0.01, 50.0, 5.0);
    /// Range of [`set_depth`](Self::set_depth).
    pub const DEPTH: ParamRange = ParamRange::new(0.0, 1.0, 1.0);

    /// Create a sine LFO at the default rate.
    pub fn new(sample_rate: f32) -> Self {
        let rate = Self::RATE.default;
        Self {
            phase: 0.0,
            phase_inc: rate / sample_rate,
            sample_rate,
            rate,
            depth: Self::DEPTH.default,
            waveform: Waveform::Sine,
            held: 0.0,
            noise: NoiseGenerator::default(),
        }
    }

    /// Set the rate in Hz.
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = Self::RATE.clamp(rate);
        self.phase_inc = self.rate / self.sample_rate;
    }

    /// Rate in Hz.
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Set the output depth.
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = Self::DEPTH.clamp(depth);
    }

    /// Output depth.
    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// Select the waveform.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Current waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Reseed the noise generator used by the noise and S&H waveforms.
    pub fn set_noise_seed(&mut self, seed: u32) {
        self.noise = NoiseGenerator::new(seed);
    }

    /// Phase in [0, 1).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Jump to `phase` (wrapped into [0, 1)).
    pub fn set_phase(&mut self, phase: f32) {
        let p = phase - libm::floorf(phase);
        self.phase = if p >= 1.0 { 0.0 } else { p };
    }

    /// Restart from phase zero with a fresh noise sequence.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.held = 0.0;
        self.noise.reset();
    }

    /// Advance one sample and return the output.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let p = self.phase;
        let out = match self.waveform {
            Waveform::Sine => sinf(p * TAU),
            Waveform::Sawtooth => 2.0 * p - 1.0,
            Waveform::Triangle => {
                if p < 0.5 {
                    4.0 * p - 1.0
                } else {
                    3.0 - 4.0 * p
                }
            }
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Noise => self.noise.next_bipolar(),
            Waveform::SampleAndHold => {
                if p == 0.0 || p < self.phase_inc {
                    self.held = self.noise.next_bipolar();
                }
                self.held
            }
        };

        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        out * self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    #[test]
    fn one_cycle_per_period() {
        let mut lfo = Lfo::new(SR);
        lfo.set_rate(1.0);
        for _ in 0..48000 {
            lfo.tick();
        }
        let err = lfo.phase().min(1.0 - lfo.phase());
        assert!(err < 0.01, "phase after one period: {}", lfo.phase());
    }

    #[test]
    fn every_waveform_is_bounded() {
        for w in Waveform::ALL {
            let mut lfo = Lfo::new(SR);
            lfo.set_rate(7.0);
            lfo.set_waveform(w);
            for _ in 0..20000 {
                let v = lfo.tick();
                assert!((-1.0..=1.0).contains(&v), "{w:?} out of range: {v}");
            }
        }
    }

    #[test]
    fn sine_hits_peaks() {
        let mut lfo = Lfo::new(SR);
        lfo.set_rate(5.0);
        let (mut lo, mut hi) = (0.0f32, 0.0f32);
        for _ in 0..9600 {
            let v = lfo.tick();
            lo = lo.min(v);
            hi = hi.max(v);
        }
        assert!(hi > 0.999 && lo < -0.999, "range [{lo}, {hi}]");
    }

    #[test]
    fn sample_and_hold_changes_once_per_cycle() {
        let mut lfo = Lfo::new(1000.0);
        lfo.set_rate(10.0);
        lfo.set_waveform(Waveform::SampleAndHold);
        let out: Vec<f32> = (0..300).map(|_| lfo.tick()).collect();
        let changes = out.windows(2).filter(|w| w[0] != w[1]).count();
        assert!((2..=3).contains(&changes), "changes: {changes}");
    }

    #[test]
    fn depth_scales_output() {
        let mut lfo = Lfo::new(SR);
        lfo.set_depth(0.25);
        lfo.set_waveform(Waveform::Square);
        assert_eq!(lfo.tick(), 0.25);
    }

    #[test]
    fn rate_is_clamped() {
        let mut lfo = Lfo::new(SR);
        lfo.set_rate(1000.0);
        assert_eq!(lfo.rate(), 50.0);
        lfo.set_rate(0.0);
        assert_eq!(lfo.rate(), 0.01);
    }
}
