//! Voltage-controlled filter with switchable topology and response.
//!
//! The effective cutoff is computed per sample:
//!
//! ```text
//! f_c,eff = clamp(f_c · 2^(cv · sens) · (1 + env · env_amount), f_min, f_max)
//! ```
//!
//! where `f_max` never exceeds `0.45 · f_s` (90% of Nyquist). The
//! pre-warped gain `g = tan(π · f_c,eff / f_s)` is recomputed only when the
//! effective cutoff changes.
//!
//! # Topologies
//!
//! | Topology | Order | Structure |
//! |----------|-------|-----------|
//! | [`FilterTopology::OnePole`] | 1 | TPT one-pole; band-pass is HP→LP |
//! | [`FilterTopology::StateVariable`] | 2 | TPT SVF, `k = 1/Q` |
//! | [`FilterTopology::Ladder`] | 4 | four TPT one-poles with feedback, tanh on the last stage |
//! | [`FilterTopology::Butterworth`] | 4 | two SVF sections at Q = 0.541 and 1.307 |
//!
//! State lives in a fixed four-element array; nothing is allocated after
//! construction and switching topology only clears the state.
//!
//! # Reference
//!
//! Zavalishin, "The Art of VA Filter Design", rev. 2.1.2 (2018), Chapters 3–5.

use core::f32::consts::PI;
use libm::tanf;

use crate::math::{fast_tanh, flush_denormal, octaves_to_ratio};
use crate::param::ParamRange;

/// Filter circuit model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterTopology {
    /// First-order, 6 dB/oct.
    OnePole,
    /// Second-order state-variable, 12 dB/oct.
    #[default]
    StateVariable,
    /// Four-pole transistor ladder, 24 dB/oct, saturating.
    Ladder,
    /// Fourth-order Butterworth approximation, 24 dB/oct.
    Butterworth,
}

impl FilterTopology {
    /// Every topology, in index order.
    pub const ALL: [FilterTopology; 4] = [
        FilterTopology::OnePole,
        FilterTopology::StateVariable,
        FilterTopology::Ladder,
        FilterTopology::Butterworth,
    ];

    /// Numeric index used by preset files.
    pub fn index(self) -> u8 {
        match self {
            FilterTopology::OnePole => 0,
            FilterTopology::StateVariable => 1,
            FilterTopology::Ladder => 2,
            FilterTopology::Butterworth => 3,
        }
    }

    /// Topology for a preset index, if known.
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Which filter output is used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterResponse {
    /// Passes frequencies below the cutoff.
    #[default]
    Lowpass,
    /// Passes frequencies above the cutoff.
    Highpass,
    /// Passes frequencies near the cutoff, unity gain at the peak.
    Bandpass,
    /// Rejects frequencies near the cutoff.
    Notch,
    /// Unity magnitude, phase shift around the cutoff.
    Allpass,
}

impl FilterResponse {
    /// Every response, in index order.
    pub const ALL: [FilterResponse; 5] = [
        FilterResponse::Lowpass,
        FilterResponse::Highpass,
        FilterResponse::Bandpass,
        FilterResponse::Notch,
        FilterResponse::Allpass,
    ];

    /// Numeric index used by preset files.
    pub fn index(self) -> u8 {
        match self {
            FilterResponse::Lowpass => 0,
            FilterResponse::Highpass => 1,
            FilterResponse::Bandpass => 2,
            FilterResponse::Notch => 3,
            FilterResponse::Allpass => 4,
        }
    }

    /// Response for a preset index, if known.
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Highest cutoff as a fraction of the sample rate.
pub const NYQUIST_SAFETY: f32 = 0.45;

const SVF_Q_MIN: f32 = 0.5;
const SVF_Q_MAX: f32 = 20.0;
const LADDER_FEEDBACK_MAX: f32 = 4.0;
const BUTTERWORTH_Q1: f32 = 0.541_196_1;
const BUTTERWORTH_Q2: f32 = 1.306_563;

/// Multi-topology resonant filter.
///
/// ## Parameters
///
/// - `cutoff`: base cutoff in Hz (20 to 20000, default 1000)
/// - `resonance`: normalized resonance (0 to 1, default 0.1)
/// - `cv_sensitivity`: octaves per unit of cutoff CV (0 to 4, default 1)
/// - `env_amount`: envelope depth, `(1 + env · amount)` (−1 to 8, default 0)
///
/// # Example
///
/// ```rust
/// use vasynth_core::{Filter, FilterResponse, FilterTopology};
///
/// let mut vcf = Filter::new(48000.0);
/// vcf.set_topology(FilterTopology::Ladder);
/// vcf.set_response(FilterResponse::Lowpass);
/// vcf.set_cutoff(800.0);
///
/// let out = vcf.tick(0.5, 0.0, 0.0);
/// assert!(out.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct Filter {
    sample_rate: f32,
    topology: FilterTopology,
    response: FilterResponse,
    cutoff: f32,
    resonance: f32,
    cv_sensitivity: f32,
    env_amount: f32,
    min_cutoff: f32,
    max_cutoff: f32,
    state: [f32; 4],
    feedback: f32,
    effective_cutoff: f32,
    g: f32,
}

impl Default for Filter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Filter {
    /// Range of [`set_cutoff`](Self::set_cutoff).
    pub const CUTOFF: ParamRange = ParamRange::new(20.0, 20000.0, 1000.0);
    /// Range of [`set_resonance`](Self::set_resonance).
    pub const RESONANCE: ParamRange = ParamRange::new(0.0, 1.0, 0.1);
    /// Range of [`set_cv_sensitivity`](Self::set_cv_sensitivity).
    pub const CV_SENSITIVITY: ParamRange = ParamRange::new(0.0, 4.0, 1.0);
    /// Range of [`set_env_amount`](Self::set_env_amount).
    pub const ENV_AMOUNT: ParamRange = ParamRange::new(-1.0, 8.0, 0.0);

    /// Create a state-variable low-pass at `sample_rate` Hz.
    pub fn new(sample_rate: f32) -> Self {
        let mut filter = Self {
            sample_rate,
            topology: FilterTopology::default(),
            response: FilterResponse::default(),
            cutoff: Self::CUTOFF.default,
            resonance: Self::RESONANCE.default,
            cv_sensitivity: Self::CV_SENSITIVITY.default,
            env_amount: Self::ENV_AMOUNT.default,
            min_cutoff: Self::CUTOFF.min,
            max_cutoff: Self::CUTOFF.max.min(sample_rate * NYQUIST_SAFETY),
            state: [0.0; 4],
            feedback: 0.0,
            effective_cutoff: 0.0,
            g: 0.0,
        };
        filter.update_g(filter.cutoff.clamp(filter.min_cutoff, filter.max_cutoff));
        filter
    }

    /// Switch topology. Clears the filter state.
    pub fn set_topology(&mut self, topology: FilterTopology) {
        if topology != self.topology {
            self.topology = topology;
            self.reset();
        }
    }

    /// Current topology.
    pub fn topology(&self) -> FilterTopology {
        self.topology
    }

    /// Select the output response.
    pub fn set_response(&mut self, response: FilterResponse) {
        self.response = response;
    }

    /// Current response.
    pub fn response(&self) -> FilterResponse {
        self.response
    }

    /// Set the base cutoff in Hz.
    pub fn set_cutoff(&mut self, hz: f32) {
        self.cutoff = Self::CUTOFF.clamp(hz);
    }

    /// Base cutoff in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set the normalized resonance.
    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = Self::RESONANCE.clamp(resonance);
    }

    /// Normalized resonance.
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Set the cutoff CV sensitivity in octaves per unit.
    pub fn set_cv_sensitivity(&mut self, octaves: f32) {
        self.cv_sensitivity = Self::CV_SENSITIVITY.clamp(octaves);
    }

    /// Cutoff CV sensitivity.
    pub fn cv_sensitivity(&self) -> f32 {
        self.cv_sensitivity
    }

    /// Set the envelope amount.
    pub fn set_env_amount(&mut self, amount: f32) {
        self.env_amount = Self::ENV_AMOUNT.clamp(amount);
    }

    /// Envelope amount.
    pub fn env_amount(&self) -> f32 {
        self.env_amount
    }

    /// Set the absolute cutoff limits in Hz.
    ///
    /// The upper limit is further bounded by `0.45 · f_s`; a lower limit at
    /// or above the upper one collapses to the upper one.
    pub fn set_cutoff_limits(&mut self, min_hz: f32, max_hz: f32) {
        let max = max_hz.min(self.sample_rate * NYQUIST_SAFETY).max(1.0);
        self.max_cutoff = max;
        self.min_cutoff = min_hz.clamp(1.0, max);
    }

    /// Absolute cutoff limits `(min, max)` in Hz.
    pub fn cutoff_limits(&self) -> (f32, f32) {
        (self.min_cutoff, self.max_cutoff)
    }

    /// Cutoff used by the most recent tick.
    pub fn last_effective_cutoff(&self) -> f32 {
        self.effective_cutoff
    }

    /// Clear filter memory.
    pub fn reset(&mut self) {
        self.state = [0.0; 4];
        self.feedback = 0.0;
    }

    /// Cutoff the next tick will use for the given control inputs.
    #[inline]
    pub fn effective_cutoff(&self, cv: f32, env: f32) -> f32 {
        let fc = self.cutoff
            * octaves_to_ratio(cv * self.cv_sensitivity)
            * (1.0 + env * self.env_amount);
        if fc.is_finite() {
            fc.clamp(self.min_cutoff, self.max_cutoff)
        } else {
            self.min_cutoff
        }
    }

    /// Filter one sample.
    ///
    /// `cv` shifts the cutoff in octaves (scaled by sensitivity); `env` is
    /// the envelope input scaled by the envelope amount.
    #[inline]
    pub fn tick(&mut self, input: f32, cv: f32, env: f32) -> f32 {
        let fc = self.effective_cutoff(cv, env);
        if fc != self.effective_cutoff {
            self.update_g(fc);
        }

        match self.topology {
            FilterTopology::OnePole => self.tick_one_pole(input),
            FilterTopology::StateVariable => self.tick_svf(input),
            FilterTopology::Ladder => self.tick_ladder(input),
            FilterTopology::Butterworth => self.tick_butterworth(input),
        }
    }

    fn update_g(&mut self, fc: f32) {
        self.effective_cutoff = fc;
        self.g = tanf(PI * fc / self.sample_rate);
    }

    fn tick_one_pole(&mut self, input: f32) -> f32 {
        let big_g = self.g / (1.0 + self.g);
        let lp = one_pole_step(&mut self.state[0], input, big_g);
        let hp = input - lp;
        match self.response {
            FilterResponse::Lowpass => lp,
            FilterResponse::Highpass => hp,
            FilterResponse::Bandpass => {
                // 0.5 peak gain at fc, scaled to unity.
                2.0 * one_pole_step(&mut self.state[1], hp, big_g)
            }
            FilterResponse::Notch => {
                let bp = one_pole_step(&mut self.state[1], hp, big_g);
                input - 2.0 * bp
            }
            FilterResponse::Allpass => lp - hp,
        }
    }

    fn tick_svf(&mut self, input: f32) -> f32 {
        let q = SVF_Q_MIN + self.resonance * (SVF_Q_MAX - SVF_Q_MIN);
        let k = 1.0 / q;
        let [s1, s2, _, _] = &mut self.state;
        let (lp, bp, hp) = svf_step(s1, s2, self.g, k, input);
        select_svf(self.response, input, lp, bp, hp, k)
    }

    fn tick_butterworth(&mut self, input: f32) -> f32 {
        let k1 = 1.0 / BUTTERWORTH_Q1;
        let k2 = 1.0 / (BUTTERWORTH_Q2 + self.resonance * (SVF_Q_MAX - BUTTERWORTH_Q2));
        let [s1, s2, s3, s4] = &mut self.state;
        let (lp, bp, hp) = svf_step(s1, s2, self.g, k1, input);
        let first = select_svf(self.response, input, lp, bp, hp, k1);
        let (lp, bp, hp) = svf_step(s3, s4, self.g, k2, first);
        select_svf(self.response, first, lp, bp, hp, k2)
    }

    fn tick_ladder(&mut self, input: f32) -> f32 {
        let k = self.resonance * LADDER_FEEDBACK_MAX;
        let big_g = self.g / (1.0 + self.g);

        // (1 + k) restores unity gain at DC.
        let u = input * (1.0 + k) - k * self.feedback;
        let y1 = one_pole_step(&mut self.state[0], u, big_g);
        let y2 = one_pole_step(&mut self.state[1], y1, big_g);
        let y3 = one_pole_step(&mut self.state[2], y2, big_g);
        let y4_linear = one_pole_step(&mut self.state[3], y3, big_g);
        let y4 = fast_tanh(y4_linear);
        self.feedback = y4;

        // Mode mixes use the linear stage so saturation does not leak into stopbands.
        match self.response {
            FilterResponse::Lowpass => y4,
            FilterResponse::Highpass => u - 4.0 * y1 + 6.0 * y2 - 4.0 * y3 + y4_linear,
            FilterResponse::Bandpass => 2.0 * (y1 - y2),
            FilterResponse::Notch => u - 2.0 * y1 + 2.0 * y2,
            FilterResponse::Allpass => u - 4.0 * y1 + 4.0 * y2,
        }
    }
}

/// TPT one-pole low-pass step. `big_g = g / (1 + g)`.
#[inline]
fn one_pole_step(state: &mut f32, input: f32, big_g: f32) -> f32 {
    let v = (input - *state) * big_g;
    let lp = v + *state;
    *state = flush_denormal(lp + v);
    lp
}

/// TPT state-variable step returning `(lp, bp, hp)`.
#[inline]
fn svf_step(ic1: &mut f32, ic2: &mut f32, g: f32, k: f32, input: f32) -> (f32, f32, f32) {
    let v3 = input - *ic2;
    let v1 = (g * v3 + *ic1) / (1.0 + g * (g + k));
    let v2 = *ic2 + g * v1;
    *ic1 = flush_denormal(2.0 * v1 - *ic1);
    *ic2 = flush_denormal(2.0 * v2 - *ic2);
    (v2, v1, input - k * v1 - v2)
}

#[inline]
fn select_svf(response: FilterResponse, input: f32, lp: f32, bp: f32, hp: f32, k: f32) -> f32 {
    match response {
        FilterResponse::Lowpass => lp,
        FilterResponse::Highpass => hp,
        FilterResponse::Bandpass => k * bp,
        FilterResponse::Notch => lp + hp,
        FilterResponse::Allpass => input - 2.0 * k * bp,
    }
}
