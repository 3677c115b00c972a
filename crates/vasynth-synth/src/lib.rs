//! vasynth Synth - voices, modulation and the engine
//!
//! This crate composes the `vasynth-core` blocks into playable voices.
//!
//! # Core Components
//!
//! ## Signal paths
//!
//! - [`SignalPath`] - ordered blocks plus a routing table, frozen with a
//!   topological sort that rejects cycles
//! - [`BlockKind`] / [`BlockHandle`] / [`Param`] - typed block identity and
//!   parameter ids
//! - [`PathKind`] - canonical single-oscillator, dual-oscillator and vintage
//!   mono layouts
//!
//! ## Modulation
//!
//! - [`ModulationMatrix`] - bounded source-to-destination links with
//!   per-destination apply rules (exponential pitch, clamped cutoff)
//! - [`ModSourceId`] / [`ModDestination`] - source and destination tags
//!
//! ## Voice management
//!
//! - [`Voice`] - one note on one signal path
//! - [`VoicePool`] - poly, mono, legato and multi-timbral allocation with
//!   configurable stealing
//!
//! ## Engine (`std`)
//!
//! - [`Engine`] / [`EngineHandle`] - audio-side renderer and control-side
//!   event queue plus patch publisher
//! - [`EventFrontend`] - MIDI bytes to engine events
//!
//! # no_std Support
//!
//! Everything except the engine and the frontend builds without `std`:
//!
//! ```toml
//! [dependencies]
//! vasynth-synth = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use vasynth_synth::{Engine, EngineConfig};
//!
//! let (mut engine, mut handle) = Engine::new(EngineConfig::default()).unwrap();
//! handle.note_on(0, 69, 100);
//!
//! let mut out = vec![0.0f32; 2 * 256];
//! engine.render(&mut out, 2);
//! assert!(out.iter().any(|&s| s != 0.0));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod block;
pub mod config;
pub mod error;
pub mod midi;
pub mod mod_matrix;
pub mod patch;
pub mod path;
pub mod pool;
pub mod voice;

#[cfg(feature = "std")]
pub mod engine;
#[cfg(feature = "std")]
pub mod frontend;

pub use block::{BlockHandle, BlockKind, BlockStore, MAX_INPUTS, Param, REFERENCE_RANGE, param_range};
pub use config::{AllocationMode, EngineConfig, StealingMode};
pub use error::{PathError, SynthError};
pub use midi::{MidiDecoder, MidiMessage, PITCH_BEND_CENTER};
pub use mod_matrix::{
    ModDestination, ModSourceId, ModulationMatrix, ModulationRoute, ModulationSums,
    ModulationValues,
};
pub use patch::{
    AmpSettings, EnvelopeSettings, FilterSettings, LfoSettings, OscillatorSettings, Patch,
};
pub use path::{Edge, OutputEdge, PathKind, SignalPath};
pub use pool::VoicePool;
pub use voice::Voice;

#[cfg(feature = "std")]
pub use engine::{ControlEvent, Engine, EngineHandle, cc};
#[cfg(feature = "std")]
pub use frontend::{EventFrontend, bend_to_octaves};

// Re-export the block layer so callers need only one dependency.
pub use vasynth_core::{
    AdsrEnvelope, AmpResponse, Amplifier, Diagnostics, DiagnosticsSnapshot, EnvelopeState,
    Filter, FilterResponse, FilterTopology, Lfo, Oscillator, ParamRange, Waveform, midi_to_freq,
};
