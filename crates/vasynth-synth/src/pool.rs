//! Voice allocation, stealing and mix-down.
//!
//! The pool owns a fixed number of voices built once from a path factory.
//! Poly modes hand each note its own voice and steal a busy one when every
//! slot is taken. Mono and legato drive voice 0 from a held-note list:
//! mono plays the highest held note and retriggers when a new press becomes
//! the top note; legato plays the last pressed note and only retunes while
//! any key is held. Neither retriggers when a release uncovers a held note.
//!
//! Mix-down is `Σ tick · velocity / sqrt(capacity)`, clamped to [-1, 1].

use alloc::sync::Arc;
use alloc::vec::Vec;

use vasynth_core::Diagnostics;

use crate::block::{BlockKind, Param};
use crate::config::{AllocationMode, EngineConfig, StealingMode};
use crate::error::{PathError, SynthError};
use crate::mod_matrix::{ModulationMatrix, ModulationValues};
use crate::patch::Patch;
use crate::path::SignalPath;
use crate::voice::Voice;

/// Highest number of distinct MIDI notes.
const MAX_HELD: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq)]
struct HeldNote {
    note: u8,
    velocity: f32,
}

/// Fixed-capacity voice manager.
#[derive(Debug)]
pub struct VoicePool {
    voices: Vec<Voice>,
    held: Vec<HeldNote>,
    allocation_mode: AllocationMode,
    stealing_mode: StealingMode,
    matrix: ModulationMatrix,
    globals: ModulationValues,
    diagnostics: Arc<Diagnostics>,
    next_seq: u64,
    norm: f32,
}

impl VoicePool {
    /// Build a pool from `config`, using its canonical path kind.
    pub fn from_config(
        config: &EngineConfig,
        diagnostics: Arc<Diagnostics>,
    ) -> Result<Self, SynthError> {
        let kind = config.path_kind;
        Self::with_paths(config, diagnostics, |sr| kind.build(sr))
    }

    /// Build a pool whose voices come from `build`, called once per voice
    /// with the sample rate. Every path must freeze.
    pub fn with_paths<F>(
        config: &EngineConfig,
        diagnostics: Arc<Diagnostics>,
        mut build: F,
    ) -> Result<Self, SynthError>
    where
        F: FnMut(f32) -> Result<SignalPath, PathError>,
    {
        config.validate()?;
        let mut voices = Vec::with_capacity(config.max_voices);
        for _ in 0..config.max_voices {
            let mut path = build(config.sample_rate)?;
            path.freeze()?;
            path.set_cutoff_limits(config.cutoff_min, config.cutoff_max);
            voices.push(Voice::new(path));
        }

        let mut matrix = ModulationMatrix::new(config.matrix_capacity);
        matrix.set_cutoff_limits(config.cutoff_min, config.cutoff_max);

        Ok(Self {
            voices,
            held: Vec::with_capacity(MAX_HELD),
            allocation_mode: config.allocation_mode,
            stealing_mode: config.stealing_mode,
            matrix,
            globals: ModulationValues::new(),
            diagnostics,
            next_seq: 0,
            norm: 1.0 / libm::sqrtf(config.max_voices as f32),
        })
    }

    /// Number of voice slots.
    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    /// Voices currently producing sound.
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Every voice in slot order.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// One voice by slot.
    pub fn voice(&self, slot: usize) -> Option<&Voice> {
        self.voices.get(slot)
    }

    /// Allocation mode.
    pub fn allocation_mode(&self) -> AllocationMode {
        self.allocation_mode
    }

    /// Stealing mode.
    pub fn stealing_mode(&self) -> StealingMode {
        self.stealing_mode
    }

    /// Change the stealing policy.
    pub fn set_stealing_mode(&mut self, mode: StealingMode) {
        self.stealing_mode = mode;
    }

    /// The shared modulation matrix.
    pub fn matrix(&self) -> &ModulationMatrix {
        &self.matrix
    }

    /// Mutable access to the matrix.
    pub fn matrix_mut(&mut self) -> &mut ModulationMatrix {
        &mut self.matrix
    }

    /// Global modulation sources (wheel, bend, pressure, volume).
    pub fn globals(&self) -> &ModulationValues {
        &self.globals
    }

    /// Mutable access to the global sources.
    pub fn globals_mut(&mut self) -> &mut ModulationValues {
        &mut self.globals
    }

    /// Shared diagnostic counters.
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// Start a note. Velocity 0 is a note-off.
    pub fn note_on(&mut self, channel: u8, note: u8, velocity: f32) {
        if velocity <= 0.0 || velocity.is_nan() {
            self.note_off(channel, note);
            return;
        }
        let velocity = velocity.min(1.0);
        match self.allocation_mode {
            AllocationMode::Poly => self.poly_note_on(None, channel, note, velocity),
            AllocationMode::MultiTimbral => {
                self.poly_note_on(Some(channel), channel, note, velocity);
            }
            AllocationMode::Mono => self.mono_note_on(note, velocity),
            AllocationMode::Legato => self.legato_note_on(note, velocity),
        }
    }

    /// Release a note.
    pub fn note_off(&mut self, channel: u8, note: u8) {
        match self.allocation_mode {
            AllocationMode::Poly => self.poly_note_off(None, note),
            AllocationMode::MultiTimbral => self.poly_note_off(Some(channel), note),
            AllocationMode::Mono | AllocationMode::Legato => self.mono_note_off(note),
        }
    }

    fn poly_note_on(&mut self, channel: Option<u8>, raw_channel: u8, note: u8, velocity: f32) {
        let free = self
            .find_voice(channel, note)
            .or_else(|| self.voices.iter().position(|v| !v.is_active()));
        let slot = match free {
            Some(slot) => slot,
            None => {
                let slot = self.steal_slot();
                self.diagnostics.record_voice_steal();
                self.voices[slot].reset();
                slot
            }
        };
        self.start(slot, raw_channel, note, velocity);
    }

    fn poly_note_off(&mut self, channel: Option<u8>, note: u8) {
        if let Some(slot) = self.find_gated_voice(channel, note) {
            self.voices[slot].stop_note();
        }
    }

    fn start(&mut self, slot: usize, channel: u8, note: u8, velocity: f32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let voice = &mut self.voices[slot];
        voice.channel = channel;
        voice.seq = seq;
        voice.start_note(note, velocity);
    }

    /// Active voice playing `note` (on `channel`, when given).
    fn find_voice(&self, channel: Option<u8>, note: u8) -> Option<usize> {
        self.voices.iter().position(|v| {
            v.is_active() && v.note() == note && channel.is_none_or(|c| v.channel() == c)
        })
    }

    fn find_gated_voice(&self, channel: Option<u8>, note: u8) -> Option<usize> {
        self.voices.iter().position(|v| {
            v.is_gated() && v.note() == note && channel.is_none_or(|c| v.channel() == c)
        })
    }

    /// Slot to reuse when every voice is busy.
    fn steal_slot(&self) -> usize {
        let voices = self.voices.iter().enumerate();
        let slot = match self.stealing_mode {
            // Largest age; ties go to the earliest start.
            StealingMode::OldestFirst => voices
                .min_by(|(_, a), (_, b)| b.age().cmp(&a.age()).then(a.seq.cmp(&b.seq))),
            // Smallest age; ties go to the latest start.
            StealingMode::LastPlayed => voices
                .min_by(|(_, a), (_, b)| a.age().cmp(&b.age()).then(b.seq.cmp(&a.seq))),
            // Lowest velocity; ties go to the earliest start.
            StealingMode::QuietestFirst => voices.min_by(|(_, a), (_, b)| {
                a.velocity()
                    .total_cmp(&b.velocity())
                    .then(a.seq.cmp(&b.seq))
            }),
        };
        slot.map_or(0, |(i, _)| i)
    }

    fn hold(&mut self, note: u8, velocity: f32) {
        self.held.retain(|h| h.note != note);
        if self.held.len() < MAX_HELD {
            self.held.push(HeldNote { note, velocity });
        }
    }

    fn highest_held(&self) -> Option<HeldNote> {
        self.held.iter().copied().max_by_key(|h| h.note)
    }

    fn mono_note_on(&mut self, note: u8, velocity: f32) {
        self.hold(note, velocity);
        let Some(top) = self.highest_held() else {
            return;
        };
        let voice = &self.voices[0];
        if top.note == note || !voice.is_gated() {
            // New top note, or nothing sounding: retrigger.
            self.start(0, 0, top.note, top.velocity);
        }
    }

    fn legato_note_on(&mut self, note: u8, velocity: f32) {
        let was_held = !self.held.is_empty();
        self.hold(note, velocity);
        if was_held && self.voices[0].is_gated() {
            self.voices[0].retarget(note);
        } else {
            self.start(0, 0, note, velocity);
        }
    }

    fn mono_note_off(&mut self, note: u8) {
        let before = self.held.len();
        self.held.retain(|h| h.note != note);
        if self.held.len() == before {
            return;
        }
        let next = match self.allocation_mode {
            AllocationMode::Mono => self.highest_held(),
            _ => self.held.last().copied(),
        };
        let voice = &mut self.voices[0];
        match next {
            Some(next) => {
                if voice.is_gated() && voice.note() != next.note {
                    voice.retarget(next.note);
                }
            }
            None => voice.stop_note(),
        }
    }

    /// Release every voice; release tails keep sounding.
    pub fn all_notes_off(&mut self) {
        self.held.clear();
        for voice in &mut self.voices {
            voice.stop_note();
        }
    }

    /// Silence every voice immediately and clear filter state.
    pub fn hard_stop(&mut self) {
        self.held.clear();
        for voice in &mut self.voices {
            voice.reset();
        }
    }

    /// Polyphonic aftertouch for every voice playing `note`.
    pub fn poly_aftertouch(&mut self, note: u8, value: f32) {
        for voice in self.voices.iter_mut().filter(|v| v.note() == note) {
            voice.set_aftertouch(value);
        }
    }

    /// Set the `nth` block of `kind` on every voice.
    ///
    /// A clamp is counted once, not per voice. Returns whether the value
    /// was clamped.
    pub fn set_block_param(
        &mut self,
        kind: BlockKind,
        nth: usize,
        param: Param,
        value: f32,
    ) -> Result<bool, PathError> {
        let mut clamped = false;
        for voice in &mut self.voices {
            let path = voice.path_mut();
            let Some(node) = path.node(kind, nth) else {
                return Err(PathError::InvalidParam { kind, param });
            };
            clamped |= path.set_param(node, param, value)?;
        }
        if clamped {
            self.diagnostics.record_clamp();
        }
        Ok(clamped)
    }

    /// Output scale on every voice path.
    pub fn set_master_volume(&mut self, volume: f32) {
        for voice in &mut self.voices {
            voice.path_mut().set_master_volume(volume);
        }
    }

    /// Apply a patch to every voice and replace the matrix links.
    pub fn apply_patch(&mut self, patch: &Patch) {
        // Every voice clamps the same values; count them once.
        let mut clamps = 0;
        for voice in &mut self.voices {
            clamps = patch.apply(voice.path_mut());
            voice.path_mut().set_master_volume(patch.master_volume);
        }
        for _ in 0..clamps {
            self.diagnostics.record_clamp();
        }
        let dropped = self.matrix.replace_routes(&patch.routes);
        for _ in 0..dropped {
            self.diagnostics.record_dropped_event();
        }
    }

    /// Render one mixed sample.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let mut out = 0.0;
        for voice in &mut self.voices {
            if voice.is_active() {
                out += voice.tick(&self.matrix, &self.globals) * voice.velocity();
            }
        }
        (out * self.norm).clamp(-1.0, 1.0)
    }

    /// Render `out.len()` mono samples.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.tick();
        }
    }
}
