//! Shared CLI helpers used across multiple commands.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::{Args, ValueEnum};
use vasynth_config::{PresetBank, factory_presets, load_engine_config};
use vasynth_synth::{EngineConfig, Patch, PathKind};

/// Voice layout names accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PathArg {
    /// VCO, VCF, VCA with two envelopes and two LFOs
    Single,
    /// Two VCOs mixed into the filter
    Dual,
    /// Two VCOs with cross-modulation into a ladder filter
    Vintage,
}

impl From<PathArg> for PathKind {
    fn from(arg: PathArg) -> Self {
        match arg {
            PathArg::Single => PathKind::SingleOscillator,
            PathArg::Dual => PathKind::DualOscillator,
            PathArg::Vintage => PathKind::VintageMono,
        }
    }
}

/// Engine settings that override the `--config` file.
#[derive(Args, Debug, Default)]
pub struct EngineArgs {
    /// Sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Voice pool size
    #[arg(long)]
    pub voices: Option<usize>,

    /// Voice layout
    #[arg(long, value_enum)]
    pub path: Option<PathArg>,

    /// Output channel count
    #[arg(long)]
    pub channels: Option<usize>,
}

impl EngineArgs {
    /// Load `config` (or defaults) and apply the overrides.
    pub fn resolve(&self, config: Option<&Path>) -> anyhow::Result<EngineConfig> {
        let mut engine = match config {
            Some(path) => load_engine_config(path)
                .with_context(|| format!("loading engine config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(rate) = self.sample_rate {
            engine.sample_rate = rate as f32;
        }
        if let Some(voices) = self.voices {
            engine.max_voices = voices;
        }
        if let Some(path) = self.path {
            engine.path_kind = path.into();
        }
        if let Some(channels) = self.channels {
            engine.channel_count = channels;
        }
        engine.validate()?;
        tracing::debug!(
            sample_rate = engine.sample_rate,
            voices = engine.max_voices,
            path = engine.path_kind.name(),
            "engine config resolved"
        );
        Ok(engine)
    }
}

/// Factory presets followed by the presets in `file`, if given.
///
/// A file preset with a factory name replaces the factory one.
pub fn load_bank(file: Option<&Path>) -> anyhow::Result<PresetBank> {
    let mut bank = factory_presets();
    if let Some(path) = file {
        let user = PresetBank::load(path)
            .with_context(|| format!("loading presets from {}", path.display()))?;
        tracing::info!(path = %path.display(), presets = user.len(), "preset file loaded");
        bank.merge(user);
    }
    Ok(bank)
}

/// Resolve the starting patch: the named preset, or the engine default.
pub fn initial_patch(bank: &PresetBank, name: Option<&str>) -> anyhow::Result<Option<Patch>> {
    let Some(name) = name else {
        return Ok(None);
    };
    let preset = bank.require(name).with_context(|| {
        format!("preset '{name}' not found; run 'vasynth presets list' to see the bank")
    })?;
    Ok(Some(preset.to_patch()))
}

/// Output path helper used by commands that write files.
pub fn display_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// One note given as `NOTE[:VELOCITY[:START[:LENGTH]]]`.
///
/// `NOTE` is a MIDI number or a name such as `A4`, `C#3` or `Eb5`.
/// Velocity is 0-127; start and length are seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteSpec {
    /// MIDI note number.
    pub note: u8,
    /// MIDI velocity.
    pub velocity: u8,
    /// Onset in seconds.
    pub start: f64,
    /// Held time in seconds.
    pub length: f64,
}

impl NoteSpec {
    /// Onset frame at `sample_rate`.
    pub fn start_frame(&self, sample_rate: f32) -> u64 {
        seconds_to_frames(self.start, sample_rate)
    }

    /// Held length in frames at `sample_rate`.
    pub fn length_frames(&self, sample_rate: f32) -> u64 {
        seconds_to_frames(self.length, sample_rate)
    }

    /// Time at which the note is released.
    pub fn end(&self) -> f64 {
        self.start + self.length
    }
}

impl FromStr for NoteSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split(':');
        let note = parse_note(fields.next().unwrap_or_default())?;

        let velocity = match fields.next() {
            Some(v) => v
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|v| *v <= 127)
                .ok_or_else(|| format!("invalid velocity '{v}' (expected 0-127)"))?,
            None => 100,
        };
        let start = match fields.next() {
            Some(v) => parse_seconds(v, "start")?,
            None => 0.0,
        };
        let length = match fields.next() {
            Some(v) => parse_seconds(v, "length")?,
            None => 1.0,
        };
        if fields.next().is_some() {
            return Err(format!(
                "invalid note '{s}' (expected NOTE[:VELOCITY[:START[:LENGTH]]])"
            ));
        }
        Ok(Self {
            note,
            velocity,
            start,
            length,
        })
    }
}

fn parse_seconds(s: &str, what: &str) -> Result<f64, String> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| format!("invalid {what} '{s}' (expected seconds >= 0)"))
}

/// Convert seconds to whole frames, rounding to the nearest frame.
pub fn seconds_to_frames(seconds: f64, sample_rate: f32) -> u64 {
    (seconds * f64::from(sample_rate)).round() as u64
}

/// Parse a MIDI note number or a note name (`C4` = 60, `A4` = 69).
pub fn parse_note(s: &str) -> Result<u8, String> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u8>() {
        return if n <= 127 {
            Ok(n)
        } else {
            Err(format!("note {n} out of range (0-127)"))
        };
    }

    let invalid = || format!("invalid note '{s}' (expected 0-127 or a name like A4)");
    let mut chars = s.chars();
    let pitch_class: i32 = match chars.next().map(|c| c.to_ascii_uppercase()) {
        Some('C') => 0,
        Some('D') => 2,
        Some('E') => 4,
        Some('F') => 5,
        Some('G') => 7,
        Some('A') => 9,
        Some('B') => 11,
        _ => return Err(invalid()),
    };
    let rest = chars.as_str();
    let (accidental, octave) = if let Some(octave) = rest.strip_prefix('#') {
        (1, octave)
    } else if let Some(octave) = rest.strip_prefix('b') {
        (-1, octave)
    } else {
        (0, rest)
    };
    let octave: i32 = octave.parse().map_err(|_| invalid())?;
    let number = (octave + 1) * 12 + pitch_class + accidental;
    u8::try_from(number)
        .ok()
        .filter(|n| *n <= 127)
        .ok_or_else(|| format!("note '{s}' out of range (0-127)"))
}
