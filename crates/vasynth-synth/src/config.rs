//! Engine build-time configuration.

use crate::error::SynthError;
use crate::path::PathKind;

/// How note events map onto voices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AllocationMode {
    /// Distinct notes occupy distinct voices.
    #[default]
    Poly,
    /// One voice plays the highest held note.
    Mono,
    /// One voice plays the most recently pressed held note, without
    /// retriggering while any note is held.
    Legato,
    /// Poly allocation keyed by (channel, note).
    MultiTimbral,
}

impl AllocationMode {
    /// Whether the pool drives a single voice.
    pub fn is_monophonic(self) -> bool {
        matches!(self, Self::Mono | Self::Legato)
    }
}

/// Which busy voice to reuse when every slot is taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StealingMode {
    /// The voice with the largest age.
    #[default]
    OldestFirst,
    /// The voice with the lowest velocity.
    QuietestFirst,
    /// The voice with the smallest age.
    LastPlayed,
}

/// Everything needed to build an [`Engine`](crate::Engine).
///
/// Missing keys take their defaults when deserialized.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Audio rate in Hz. Fixed once rendering starts.
    pub sample_rate: f32,
    /// Voice pool capacity.
    pub max_voices: usize,
    /// Note-to-voice mapping.
    pub allocation_mode: AllocationMode,
    /// Voice stealing policy for poly modes.
    pub stealing_mode: StealingMode,
    /// Maximum simultaneous modulation links.
    pub matrix_capacity: usize,
    /// Output channels; the mono mix is copied to each.
    pub channel_count: usize,
    /// Canonical voice layout.
    pub path_kind: PathKind,
    /// Pitch bend range in semitones either side of center.
    pub pitch_bend_range: f32,
    /// Only accept MIDI from this channel (0-15). `None` accepts all.
    pub midi_channel: Option<u8>,
    /// Control event queue length.
    pub event_queue_capacity: usize,
    /// Lowest filter cutoff in Hz.
    pub cutoff_min: f32,
    /// Highest filter cutoff in Hz.
    pub cutoff_max: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            max_voices: 8,
            allocation_mode: AllocationMode::Poly,
            stealing_mode: StealingMode::OldestFirst,
            matrix_capacity: 16,
            channel_count: 2,
            path_kind: PathKind::SingleOscillator,
            pitch_bend_range: 2.0,
            midi_channel: None,
            event_queue_capacity: 1024,
            cutoff_min: 20.0,
            cutoff_max: 20000.0,
        }
    }
}

impl EngineConfig {
    /// Lowest accepted sample rate.
    pub const MIN_SAMPLE_RATE: f32 = 8000.0;
    /// Highest accepted sample rate.
    pub const MAX_SAMPLE_RATE: f32 = 192_000.0;

    /// Check every field.
    pub fn validate(&self) -> Result<(), SynthError> {
        let sr = self.sample_rate;
        if !sr.is_finite() || !(Self::MIN_SAMPLE_RATE..=Self::MAX_SAMPLE_RATE).contains(&sr) {
            return Err(SynthError::InvalidSampleRate(sr));
        }
        if self.max_voices == 0 {
            return Err(SynthError::ZeroCapacity("max_voices"));
        }
        if self.matrix_capacity == 0 {
            return Err(SynthError::ZeroCapacity("matrix_capacity"));
        }
        if self.channel_count == 0 {
            return Err(SynthError::ZeroCapacity("channel_count"));
        }
        if self.event_queue_capacity == 0 {
            return Err(SynthError::ZeroCapacity("event_queue_capacity"));
        }
        if !self.pitch_bend_range.is_finite() || !(0.0..=48.0).contains(&self.pitch_bend_range) {
            return Err(SynthError::InvalidConfig("pitch_bend_range must be 0..=48 semitones"));
        }
        if self.midi_channel.is_some_and(|c| c > 15) {
            return Err(SynthError::InvalidConfig("midi_channel must be 0..=15"));
        }
        if !self.cutoff_min.is_finite()
            || !self.cutoff_max.is_finite()
            || self.cutoff_min < 20.0
            || self.cutoff_max > 20000.0
        {
            return Err(SynthError::InvalidConfig("cutoff limits must lie in 20..=20000 Hz"));
        }
        if self.cutoff_min >= self.cutoff_max {
            return Err(SynthError::InvalidConfig("cutoff_min must be below cutoff_max"));
        }
        Ok(())
    }
}
