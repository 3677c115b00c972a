//! vasynth Core - primitive synthesis blocks
//!
//! This crate provides the per-sample building blocks of the vasynth engine.
//! Every block is a plain struct with clamped setters and a `tick` method that
//! advances time by exactly one sample; nothing allocates after construction.
//!
//! # Blocks
//!
//! - [`Oscillator`] - VCO with additive band-limited saw/triangle/pulse, noise
//!   and sample-and-hold
//! - [`Filter`] - VCF with one-pole, state-variable, ladder and Butterworth
//!   topologies, each with five responses
//! - [`Amplifier`] - VCA with linear, exponential and logarithmic response
//! - [`AdsrEnvelope`] - linear attack/decay/sustain/release state machine
//! - [`Lfo`] - low-frequency oscillator sharing the VCO [`Waveform`] set
//!
//! ## Utilities
//!
//! - [`ParamRange`] - declared parameter range with clamping
//! - [`Diagnostics`] - lock-free monotonic counters shared across threads
//! - Math functions: [`midi_to_freq`], [`semitones_to_ratio`], [`fast_tanh`], etc.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! vasynth-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use vasynth_core::{AdsrEnvelope, Amplifier, Filter, Oscillator, Waveform};
//!
//! let sr = 48000.0;
//! let mut osc = Oscillator::new(sr);
//! let mut vcf = Filter::new(sr);
//! let mut vca = Amplifier::new();
//! let mut env = AdsrEnvelope::new(sr);
//!
//! osc.set_waveform(Waveform::Sawtooth);
//! osc.set_frequency(110.0);
//! vcf.set_cutoff(1200.0);
//! env.gate_on();
//!
//! let mut out = [0.0f32; 64];
//! for sample in out.iter_mut() {
//!     let level = env.tick();
//!     let s = osc.tick(0.0, 0.0);
//!     *sample = vca.tick(vcf.tick(s, 0.0, level), level);
//! }
//! assert!(out.iter().all(|s| s.is_finite()));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod amplifier;
pub mod diagnostics;
pub mod envelope;
pub mod filter;
pub mod lfo;
pub mod math;
pub mod oscillator;
pub mod param;
pub mod waveform;

pub use amplifier::{AmpResponse, Amplifier, EXPONENTIAL_K};
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot};
pub use envelope::{AdsrEnvelope, EnvelopeState};
pub use filter::{Filter, FilterResponse, FilterTopology, NYQUIST_SAFETY};
pub use lfo::Lfo;
pub use math::{
    A4_FREQUENCY, A4_NOTE, fast_tanh, flush_denormal, midi_to_freq, octaves_to_ratio,
    seconds_to_samples, semitones_to_ratio,
};
pub use oscillator::{MAX_HARMONICS, Oscillator};
pub use param::ParamRange;
pub use waveform::{DEFAULT_NOISE_SEED, NoiseGenerator, Waveform};
