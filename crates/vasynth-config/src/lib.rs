//! Configuration and presets for vasynth.
//!
//! # Features
//!
//! - **Engine config**: [`EngineConfig`](vasynth_synth::EngineConfig) as TOML,
//!   validated on load
//! - **Preset text**: the `[Preset]`/`[EndPreset]` format, parsed atomically
//!   with line-numbered errors and written back in canonical order
//! - **Preset banks**: ordered, unique by name, addressable by MIDI program
//! - **Factory presets**: a small built-in bank
//!
//! # Example
//!
//! ```rust
//! use vasynth_config::PresetBank;
//!
//! let bank = PresetBank::parse("[Preset]\nname=Warm Pad\nattack=1.2\n[EndPreset]\n").unwrap();
//! let patch = bank.get("Warm Pad").unwrap().to_patch();
//! assert_eq!(patch.amp_envelope.attack, 1.2);
//! ```

mod bank;
mod engine_config;
mod error;
mod preset;

/// The preset text format.
pub mod format;

/// Factory presets bundled with the library.
pub mod factory_presets;

pub use bank::PresetBank;
pub use engine_config::{load_engine_config, parse_engine_config, save_engine_config};
pub use error::ConfigError;
pub use factory_presets::{
    FACTORY_PRESET_NAMES, factory_presets, get_factory_preset, is_factory_preset,
};
pub use format::{parse_presets, presets_to_string, write_preset};
pub use preset::{
    ConnectionPreset, EnvelopePreset, LfoPreset, Preset, VcaPreset, VcfPreset, VcoPreset,
};
