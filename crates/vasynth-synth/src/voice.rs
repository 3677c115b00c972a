//! A single playing note.

use vasynth_core::{EnvelopeState, midi_to_freq};

use crate::mod_matrix::{ModulationMatrix, ModulationValues};
use crate::path::SignalPath;

/// One voice: note state plus its own signal path.
///
/// A voice stays active after [`stop_note`](Voice::stop_note) until its
/// amplitude envelope has finished the release stage.
#[derive(Debug, Clone)]
pub struct Voice {
    path: SignalPath,
    sources: ModulationValues,
    note: u8,
    pub(crate) channel: u8,
    frequency: f32,
    velocity: f32,
    age: u64,
    pub(crate) seq: u64,
    active: bool,
    gated: bool,
}

impl Voice {
    /// Wrap a frozen path.
    pub fn new(path: SignalPath) -> Self {
        Self {
            path,
            sources: ModulationValues::new(),
            note: 0,
            channel: 0,
            frequency: 0.0,
            velocity: 0.0,
            age: 0,
            seq: 0,
            active: false,
            gated: false,
        }
    }

    /// Start `note` at `velocity` (0..=1).
    ///
    /// The envelopes re-enter attack from their current level, so
    /// retriggering a sounding voice does not click.
    pub fn start_note(&mut self, note: u8, velocity: f32) {
        self.note = note.min(127);
        self.frequency = midi_to_freq(f32::from(self.note));
        self.velocity = velocity.clamp(0.0, 1.0);
        self.age = 0;
        self.active = true;
        self.gated = true;
        self.sources.velocity = self.velocity;
        self.sources.set_key_track_from_note(self.note);
        self.path.set_note_frequency(self.frequency);
        self.path.gate_on();
    }

    /// Release the note. The voice keeps sounding through the release stage.
    pub fn stop_note(&mut self) {
        if !self.gated {
            return;
        }
        self.gated = false;
        self.path.gate_off();
        if self.path.amp_envelope().is_none() {
            self.active = false;
        }
    }

    /// Change pitch without touching the envelopes.
    pub fn retarget(&mut self, note: u8) {
        self.note = note.min(127);
        self.frequency = midi_to_freq(f32::from(self.note));
        self.sources.set_key_track_from_note(self.note);
        self.path.set_note_frequency(self.frequency);
    }

    /// Silence immediately and clear all block state.
    pub fn reset(&mut self) {
        self.path.reset();
        self.active = false;
        self.gated = false;
        self.age = 0;
        self.sources.aftertouch = 0.0;
    }

    /// Set polyphonic aftertouch for this voice.
    pub fn set_aftertouch(&mut self, value: f32) {
        self.sources.aftertouch = value.clamp(0.0, 1.0);
    }

    /// Produce one sample, not yet scaled by velocity.
    ///
    /// Inactive voices return 0. A voice whose amplitude envelope has
    /// reached idle deactivates itself.
    #[inline]
    pub fn tick(&mut self, matrix: &ModulationMatrix, globals: &ModulationValues) -> f32 {
        if !self.active {
            return 0.0;
        }
        self.sources.copy_globals(globals);
        self.sources.gate = if self.gated { 1.0 } else { 0.0 };
        let out = self.path.tick(matrix, &mut self.sources);
        self.age += 1;
        let finished = self
            .path
            .amp_envelope()
            .is_some_and(|env| env.state() == EnvelopeState::Idle);
        if finished {
            self.active = false;
            self.gated = false;
        }
        out
    }

    /// MIDI note number.
    pub fn note(&self) -> u8 {
        self.note
    }

    /// MIDI channel the note arrived on.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Note frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Note velocity, 0..=1.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Samples since the note started.
    pub fn age(&self) -> u64 {
        self.age
    }

    /// Whether the voice is producing sound.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the key is still held.
    pub fn is_gated(&self) -> bool {
        self.gated
    }

    /// Amplitude envelope stage, or `Idle` for a path without envelopes.
    pub fn envelope_state(&self) -> EnvelopeState {
        self.path
            .amp_envelope()
            .map_or(EnvelopeState::Idle, |env| env.state())
    }

    /// The voice's signal path.
    pub fn path(&self) -> &SignalPath {
        &self.path
    }

    /// Mutable access to the signal path.
    pub fn path_mut(&mut self) -> &mut SignalPath {
        &mut self.path
    }
}
