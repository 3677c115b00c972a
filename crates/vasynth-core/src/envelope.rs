//! Linear ADSR envelope generator.
//!
//! The envelope is a finite automaton over [`EnvelopeState`]. Every stage is
//! a straight ramp from the level it started at to its target, driven by a
//! per-stage sample counter, so the output is a piecewise-linear function of
//! the counters:
//!
//! ```text
//! Level
//!   1.0 |    /\
//!       |   /  \_______
//!     S |  /           \
//!       | /             \
//!   0.0 |/_______________\____
//!        A   D     S     R
//! ```
//!
//! - ATTACK ramps to 1 over `attack · f_s` samples, starting from the
//!   current level, so a retrigger never jumps.
//! - DECAY ramps from 1 to the sustain level over `decay · f_s` samples and
//!   never rises, even if the sustain level changes part way through.
//! - SUSTAIN holds until [`gate_off`](AdsrEnvelope::gate_off).
//! - RELEASE ramps from the current level to 0 over `release · f_s`
//!   samples, then the envelope is IDLE.
//!
//! Stage times are clamped to [1 ms, 10 s] and sustain to [0, 1]. A changed
//! time takes effect at the next stage boundary.

use crate::math::seconds_to_samples;
use crate::param::ParamRange;

/// Envelope stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Silent, waiting for a gate.
    #[default]
    Idle,
    /// Ramping up to full level.
    Attack,
    /// Ramping down to the sustain level.
    Decay,
    /// Holding the sustain level.
    Sustain,
    /// Ramping down to silence after the gate closed.
    Release,
}

/// Attack-decay-sustain-release envelope with linear segments.
///
/// # Example
///
/// ```rust
/// use vasynth_core::{AdsrEnvelope, EnvelopeState};
///
/// let mut env = AdsrEnvelope::new(48000.0);
/// env.set_attack(0.01);
/// env.set_sustain(0.5);
///
/// env.gate_on();
/// assert_eq!(env.state(), EnvelopeState::Attack);
/// let level = env.tick();
/// assert!(level > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    sample_rate: f32,
    state: EnvelopeState,
    level: f32,
    start_level: f32,
    counter: u32,
    stage_len: u32,
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl AdsrEnvelope {
    /// Range of every stage time, in seconds.
    pub const TIME: ParamRange = ParamRange::new(0.001, 10.0, 0.01);
    /// Range of the sustain level.
    pub const SUSTAIN: ParamRange = ParamRange::new(0.0, 1.0, 0.7);

    /// Default attack time in seconds.
    pub const DEFAULT_ATTACK: f32 = 0.01;
    /// Default decay time in seconds.
    pub const DEFAULT_DECAY: f32 = 0.1;
    /// Default release time in seconds.
    pub const DEFAULT_RELEASE: f32 = 0.2;

    /// Create an idle envelope at `sample_rate` Hz with default times.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            state: EnvelopeState::Idle,
            level: 0.0,
            start_level: 0.0,
            counter: 0,
            stage_len: 1,
            attack: Self::DEFAULT_ATTACK,
            decay: Self::DEFAULT_DECAY,
            sustain: Self::SUSTAIN.default,
            release: Self::DEFAULT_RELEASE,
        }
    }

    /// Set the attack time in seconds.
    pub fn set_attack(&mut self, seconds: f32) {
        self.attack = Self::TIME.clamp(seconds);
    }

    /// Attack time in seconds.
    pub fn attack(&self) -> f32 {
        self.attack
    }

    /// Set the decay time in seconds.
    pub fn set_decay(&mut self, seconds: f32) {
        self.decay = Self::TIME.clamp(seconds);
    }

    /// Decay time in seconds.
    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Set the sustain level.
    ///
    /// During DECAY the remaining ramp restarts from the current level and
    /// never rises: a sustain above the current level holds it until the
    /// stage ends.
    pub fn set_sustain(&mut self, level: f32) {
        self.sustain = Self::SUSTAIN.clamp(level);
        if self.state == EnvelopeState::Decay {
            self.stage_len = self.stage_len.saturating_sub(self.counter).max(1);
            self.start_level = self.level;
            self.counter = 0;
        }
    }

    /// Sustain level.
    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    /// Set the release time in seconds.
    pub fn set_release(&mut self, seconds: f32) {
        self.release = Self::TIME.clamp(seconds);
    }

    /// Release time in seconds.
    pub fn release(&self) -> f32 {
        self.release
    }

    /// Current stage.
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Current output level.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Samples spent in the current stage.
    pub fn stage_counter(&self) -> u32 {
        self.counter
    }

    /// Whether the envelope produces output (any stage except IDLE).
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    /// Whether the gate is held (ATTACK, DECAY or SUSTAIN).
    pub fn is_gated(&self) -> bool {
        matches!(
            self.state,
            EnvelopeState::Attack | EnvelopeState::Decay | EnvelopeState::Sustain
        )
    }

    /// Open the gate: start ATTACK from the current level.
    pub fn gate_on(&mut self) {
        self.enter(EnvelopeState::Attack);
    }

    /// Close the gate: start RELEASE from the current level.
    ///
    /// Ignored while IDLE or already releasing.
    pub fn gate_off(&mut self) {
        if self.is_gated() {
            self.enter(EnvelopeState::Release);
        }
    }

    /// Return to IDLE at zero level.
    pub fn reset(&mut self) {
        self.state = EnvelopeState::Idle;
        self.level = 0.0;
        self.start_level = 0.0;
        self.counter = 0;
    }

    fn enter(&mut self, state: EnvelopeState) {
        self.state = state;
        self.start_level = self.level;
        self.counter = 0;
        self.stage_len = match state {
            EnvelopeState::Attack => seconds_to_samples(self.attack, self.sample_rate),
            EnvelopeState::Decay => seconds_to_samples(self.decay, self.sample_rate),
            EnvelopeState::Release => seconds_to_samples(self.release, self.sample_rate),
            EnvelopeState::Idle | EnvelopeState::Sustain => 1,
        };
    }

    /// Advance one sample and return the new level.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        match self.state {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }
            EnvelopeState::Sustain => {
                self.level = self.sustain;
            }
            EnvelopeState::Attack => {
                if self.ramp_toward(1.0) {
                    self.enter(EnvelopeState::Decay);
                }
            }
            EnvelopeState::Decay => {
                if self.ramp_toward(self.sustain.min(self.start_level)) {
                    self.state = EnvelopeState::Sustain;
                    self.counter = 0;
                }
            }
            EnvelopeState::Release => {
                if self.ramp_toward(0.0) {
                    self.state = EnvelopeState::Idle;
                    self.counter = 0;
                }
            }
        }
        self.level
    }

    /// Step the current ramp. Returns true when the target is reached.
    #[inline]
    fn ramp_toward(&mut self, target: f32) -> bool {
        self.counter += 1;
        if self.counter >= self.stage_len {
            self.level = target;
            true
        } else {
            let t = self.counter as f32 / self.stage_len as f32;
            self.level = self.start_level + (target - self.start_level) * t;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 1000.0;

    fn env() -> AdsrEnvelope {
        let mut e = AdsrEnvelope::new(SR);
        e.set_attack(0.01);
        e.set_decay(0.02);
        e.set_sustain(0.5);
        e.set_release(0.04);
        e
    }

    #[test]
    fn idle_outputs_zero() {
        let mut e = env();
        for _ in 0..10 {
            assert_eq!(e.tick(), 0.0);
        }
        assert!(!e.is_active());
    }

    #[test]
    fn full_cycle_timing() {
        let mut e = env();
        e.gate_on();
        for i in 1..=10 {
            let level = e.tick();
            assert!((level - i as f32 / 10.0).abs() < 1e-6, "attack {i}: {level}");
        }
        assert_eq!(e.state(), EnvelopeState::Decay);
        for _ in 0..20 {
            e.tick();
        }
        assert_eq!(e.state(), EnvelopeState::Sustain);
        assert_eq!(e.level(), 0.5);
        assert_eq!(e.tick(), 0.5);

        e.gate_off();
        assert_eq!(e.state(), EnvelopeState::Release);
        for _ in 0..40 {
            e.tick();
        }
        assert_eq!(e.state(), EnvelopeState::Idle);
        assert_eq!(e.level(), 0.0);
    }

    #[test]
    fn release_during_attack_starts_from_current_level() {
        let mut e = env();
        e.gate_on();
        for _ in 0..5 {
            e.tick();
        }
        let level = e.level();
        e.gate_off();
        let next = e.tick();
        assert!(next < level && next > 0.0, "release should ramp down from {level}: {next}");
    }

    #[test]
    fn retrigger_in_release_has_no_discontinuity() {
        let mut e = env();
        e.gate_on();
        for _ in 0..40 {
            e.tick();
        }
        e.gate_off();
        for _ in 0..10 {
            e.tick();
        }
        let before = e.level();
        assert!(before > 0.0);
        e.gate_on();
        let after = e.tick();
        assert!(after >= before, "attack must continue upward: {before} -> {after}");
        assert!(after - before < 0.2, "no jump: {before} -> {after}");
    }

    #[test]
    fn gate_off_when_idle_is_ignored() {
        let mut e = env();
        e.gate_off();
        assert_eq!(e.state(), EnvelopeState::Idle);
    }

    #[test]
    fn times_are_clamped() {
        let mut e = AdsrEnvelope::new(SR);
        e.set_attack(0.0);
        assert_eq!(e.attack(), 0.001);
        e.set_release(100.0);
        assert_eq!(e.release(), 10.0);
        e.set_sustain(1.5);
        assert_eq!(e.sustain(), 1.0);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut e = env();
        e.gate_on();
        e.tick();
        e.reset();
        assert_eq!(e.state(), EnvelopeState::Idle);
        assert_eq!(e.level(), 0.0);
    }

    #[test]
    fn raising_sustain_mid_decay_never_steps_up() {
        let mut e = AdsrEnvelope::new(SR);
        e.set_attack(0.01);
        e.set_decay(0.1);
        e.set_sustain(0.0);
        e.gate_on();
        for _ in 0..60 {
            e.tick();
        }
        assert_eq!(e.state(), EnvelopeState::Decay);
        let mut previous = e.level();
        assert!((previous - 0.5).abs() < 1e-6);

        e.set_sustain(1.0);
        while e.state() == EnvelopeState::Decay {
            let level = e.tick();
            if e.state() == EnvelopeState::Decay {
                assert!(level <= previous, "decay rose: {previous} -> {level}");
            }
            previous = level;
        }
        assert_eq!(e.state(), EnvelopeState::Sustain);
    }

    #[test]
    fn lowering_sustain_mid_decay_keeps_stage_end() {
        let mut e = AdsrEnvelope::new(SR);
        e.set_attack(0.01);
        e.set_decay(0.1);
        e.set_sustain(0.0);
        e.gate_on();
        for _ in 0..60 {
            e.tick();
        }
        e.set_sustain(0.25);
        for _ in 0..49 {
            e.tick();
            assert_eq!(e.state(), EnvelopeState::Decay);
            assert!(e.level() >= 0.25);
        }
        assert_eq!(e.tick(), 0.25);
        assert_eq!(e.state(), EnvelopeState::Sustain);
    }
}
