//! The engine and its control handle.
//!
//! [`Engine::new`] returns two halves. The [`Engine`] lives in the audio
//! context: it owns the voice pool and renders frames. The [`EngineHandle`]
//! lives in the control context: it pushes [`ControlEvent`]s into an SPSC
//! queue and publishes [`Patch`] snapshots through an atomic pointer.
//!
//! The engine drains the queue and picks up a newly published patch at the
//! start of every [`Engine::render`] call, never mid-block.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use rtrb::{Consumer, Producer, PushError, RingBuffer};
use tracing::{info, warn};
use vasynth_core::{AdsrEnvelope, Diagnostics, DiagnosticsSnapshot};

use crate::block::{BlockKind, Param};
use crate::config::EngineConfig;
use crate::error::{PathError, SynthError};
use crate::patch::Patch;
use crate::path::SignalPath;
use crate::pool::VoicePool;

/// MIDI controller numbers with a fixed meaning.
pub mod cc {
    /// Modulation wheel.
    pub const MOD_WHEEL: u8 = 1;
    /// Breath controller, routed to the pressure source.
    pub const BREATH: u8 = 2;
    /// Channel volume, also the master volume.
    pub const VOLUME: u8 = 7;
    /// Expression.
    pub const EXPRESSION: u8 = 11;
    /// Filter resonance.
    pub const RESONANCE: u8 = 71;
    /// Amplitude envelope release.
    pub const RELEASE: u8 = 72;
    /// Amplitude envelope attack.
    pub const ATTACK: u8 = 73;
    /// Filter cutoff.
    pub const CUTOFF: u8 = 74;
    /// Hard stop.
    pub const ALL_SOUND_OFF: u8 = 120;
    /// Soft stop.
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// A control-context request, applied at the next block boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlEvent {
    /// Start a note; velocity 0..=1.
    NoteOn {
        /// MIDI channel.
        channel: u8,
        /// Note number.
        note: u8,
        /// Velocity.
        velocity: f32,
    },
    /// Release a note.
    NoteOff {
        /// MIDI channel.
        channel: u8,
        /// Note number.
        note: u8,
    },
    /// Controller change.
    ControlChange {
        /// MIDI channel.
        channel: u8,
        /// Controller number.
        controller: u8,
        /// Value, 0..=127.
        value: u8,
    },
    /// Pitch bend in octaves.
    PitchBend {
        /// Bend amount.
        octaves: f32,
    },
    /// Channel pressure, 0..=1.
    ChannelPressure {
        /// Pressure.
        value: f32,
    },
    /// Polyphonic aftertouch, 0..=1.
    PolyAftertouch {
        /// Note number.
        note: u8,
        /// Pressure.
        value: f32,
    },
    /// Set one block parameter on every voice.
    SetParam {
        /// Block kind.
        kind: BlockKind,
        /// Which block of that kind, in path order.
        nth: usize,
        /// Parameter.
        param: Param,
        /// New value.
        value: f32,
    },
    /// Release every note.
    AllNotesOff,
    /// Silence everything immediately.
    HardStop,
}

struct Shared {
    diagnostics: Arc<Diagnostics>,
    patch: ArcSwapOption<Patch>,
    patch_generation: AtomicU64,
    running: AtomicBool,
}

type PathBuilder = Box<dyn FnMut(f32) -> Result<SignalPath, PathError> + Send>;

/// Audio-context half: voice pool, event consumer, patch follower.
pub struct Engine {
    pool: VoicePool,
    events: Consumer<ControlEvent>,
    shared: Arc<Shared>,
    config: EngineConfig,
    build: PathBuilder,
    applied_generation: u64,
    cc: [u8; 128],
    frames: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("active_voices", &self.pool.active_voice_count())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine whose voices use `config.path_kind`.
    pub fn new(config: EngineConfig) -> Result<(Engine, EngineHandle), SynthError> {
        let kind = config.path_kind;
        Self::with_path_builder(config, move |sr| kind.build(sr))
    }

    /// Build an engine whose voices come from `build`.
    ///
    /// `build` is kept so the pool can be rebuilt by
    /// [`set_max_voices`](Engine::set_max_voices).
    pub fn with_path_builder<F>(
        config: EngineConfig,
        build: F,
    ) -> Result<(Engine, EngineHandle), SynthError>
    where
        F: FnMut(f32) -> Result<SignalPath, PathError> + Send + 'static,
    {
        config.validate()?;
        let mut build: PathBuilder = Box::new(build);
        let diagnostics = Arc::new(Diagnostics::new());
        let pool = VoicePool::with_paths(&config, Arc::clone(&diagnostics), &mut build)?;
        let (producer, consumer) = RingBuffer::new(config.event_queue_capacity);

        let shared = Arc::new(Shared {
            diagnostics,
            patch: ArcSwapOption::empty(),
            patch_generation: AtomicU64::new(0),
            running: AtomicBool::new(false),
        });

        info!(
            sample_rate = config.sample_rate,
            voices = config.max_voices,
            mode = ?config.allocation_mode,
            path = config.path_kind.name(),
            "engine built"
        );

        let engine = Engine {
            pool,
            events: consumer,
            shared: Arc::clone(&shared),
            config,
            build,
            applied_generation: 0,
            cc: [0; 128],
            frames: 0,
        };
        let handle = EngineHandle {
            events: producer,
            shared,
        };
        Ok((engine, handle))
    }

    /// Mark the engine as rendering.
    pub fn start(&mut self) {
        if !self.shared.running.swap(true, Ordering::AcqRel) {
            info!(sample_rate = self.config.sample_rate, "engine started");
        }
    }

    /// Stop rendering and silence every voice.
    pub fn stop(&mut self) {
        if self.shared.running.swap(false, Ordering::AcqRel) {
            self.pool.hard_stop();
            info!(frames = self.frames, "engine stopped");
        }
    }

    /// Whether [`start`](Engine::start) was called without a matching stop.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Rebuild the pool with `voices` slots.
    ///
    /// Only allowed while stopped. Matrix links, global sources and the
    /// current patch carry over.
    pub fn set_max_voices(&mut self, voices: usize) -> Result<(), SynthError> {
        if self.is_running() {
            return Err(SynthError::EngineBusy);
        }
        let config = EngineConfig {
            max_voices: voices,
            ..self.config.clone()
        };
        let mut pool = VoicePool::with_paths(
            &config,
            Arc::clone(&self.shared.diagnostics),
            &mut self.build,
        )?;
        let routes: Vec<_> = self.pool.matrix().iter().copied().collect();
        pool.matrix_mut().replace_routes(&routes);
        *pool.globals_mut() = *self.pool.globals();
        if let Some(patch) = self.shared.patch.load_full() {
            pool.apply_patch(&patch);
        }
        pool.set_master_volume(self.master_volume());
        info!(voices, "voice pool rebuilt");
        self.pool = pool;
        self.config = config;
        Ok(())
    }

    fn master_volume(&self) -> f32 {
        self.pool
            .voice(0)
            .map_or(1.0, |v| v.path().master_volume())
    }

    /// Render interleaved frames; the mono mix is copied to every channel.
    ///
    /// Queued events and a newly published patch are applied first.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        self.begin_block();
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            let sample = self.pool.tick();
            frame.fill(sample);
        }
        self.frames += out.len().div_ceil(channels) as u64;
    }

    /// Apply the pending patch and drain the control queue.
    pub fn begin_block(&mut self) {
        self.follow_patch();
        while let Ok(event) = self.events.pop() {
            self.handle_event(event);
        }
    }

    fn follow_patch(&mut self) {
        let generation = self.shared.patch_generation.load(Ordering::Acquire);
        if generation == self.applied_generation {
            return;
        }
        self.applied_generation = generation;
        let guard = self.shared.patch.load();
        if let Some(patch) = guard.as_ref() {
            self.pool.apply_patch(patch);
        }
    }

    /// Apply one event immediately.
    pub fn handle_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::NoteOn {
                channel,
                note,
                velocity,
            } => self.pool.note_on(channel, note, velocity),
            ControlEvent::NoteOff { channel, note } => self.pool.note_off(channel, note),
            ControlEvent::ControlChange {
                controller, value, ..
            } => self.control_change(controller, value),
            ControlEvent::PitchBend { octaves } => self.pool.globals_mut().pitch_bend = octaves,
            ControlEvent::ChannelPressure { value } => {
                self.pool.globals_mut().pressure = value.clamp(0.0, 1.0);
            }
            ControlEvent::PolyAftertouch { note, value } => self.pool.poly_aftertouch(note, value),
            ControlEvent::SetParam {
                kind,
                nth,
                param,
                value,
            } => self.apply_param(kind, nth, param, value),
            ControlEvent::AllNotesOff => self.pool.all_notes_off(),
            ControlEvent::HardStop => self.pool.hard_stop(),
        }
    }

    fn control_change(&mut self, controller: u8, value: u8) {
        let controller = controller & 0x7F;
        let value = value.min(127);
        self.cc[usize::from(controller)] = value;
        let v = f32::from(value) / 127.0;

        let (kind, param, target) = match controller {
            cc::MOD_WHEEL => {
                self.pool.globals_mut().mod_wheel = v;
                return;
            }
            cc::BREATH => {
                self.pool.globals_mut().pressure = v;
                return;
            }
            cc::VOLUME => {
                self.pool.globals_mut().volume = v;
                self.pool.set_master_volume(v);
                return;
            }
            cc::EXPRESSION => {
                self.pool.globals_mut().expression = v;
                return;
            }
            cc::ALL_SOUND_OFF => {
                self.pool.hard_stop();
                return;
            }
            cc::ALL_NOTES_OFF => {
                self.pool.all_notes_off();
                return;
            }
            cc::RESONANCE => (BlockKind::Vcf, Param::Resonance, v),
            cc::CUTOFF => (
                BlockKind::Vcf,
                Param::Cutoff,
                exp_map(self.config.cutoff_min, self.config.cutoff_max, v),
            ),
            cc::ATTACK => (
                BlockKind::Adsr,
                Param::Attack,
                exp_map(AdsrEnvelope::TIME.min, AdsrEnvelope::TIME.max, v),
            ),
            cc::RELEASE => (
                BlockKind::Adsr,
                Param::Release,
                exp_map(AdsrEnvelope::TIME.min, AdsrEnvelope::TIME.max, v),
            ),
            _ => return,
        };
        self.apply_param(kind, 0, param, target);
    }

    /// Set a block parameter on every voice. A write the path cannot take
    /// (missing block or parameter) is counted as a dropped event.
    fn apply_param(&mut self, kind: BlockKind, nth: usize, param: Param, value: f32) {
        if self.pool.set_block_param(kind, nth, param, value).is_err() {
            self.pool.diagnostics().record_dropped_event();
        }
    }

    /// Last value received for a controller.
    pub fn cc_value(&self, controller: u8) -> u8 {
        self.cc[usize::from(controller & 0x7F)]
    }

    /// The voice pool.
    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Mutable access to the voice pool.
    pub fn pool_mut(&mut self) -> &mut VoicePool {
        &mut self.pool
    }

    /// Build configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate
    }

    /// Output channel count.
    pub fn channel_count(&self) -> usize {
        self.config.channel_count
    }

    /// Frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Shared diagnostic counters.
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.shared.diagnostics
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
    }
}

/// Map `t` in 0..=1 exponentially onto `lo..=hi`, hitting both ends exactly.
fn exp_map(lo: f32, hi: f32, t: f32) -> f32 {
    if t <= 0.0 {
        lo
    } else if t >= 1.0 {
        hi
    } else {
        lo * libm::powf(hi / lo, t)
    }
}

/// Control-context half: event producer and patch publisher.
pub struct EngineHandle {
    events: Producer<ControlEvent>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("free_slots", &self.events.slots())
            .finish_non_exhaustive()
    }
}

impl EngineHandle {
    /// Queue an event. Returns false, and counts a dropped event, if the
    /// queue is full.
    pub fn send(&mut self, event: ControlEvent) -> bool {
        match self.events.push(event) {
            Ok(()) => true,
            Err(PushError::Full(event)) => {
                self.shared.diagnostics.record_dropped_event();
                warn!(?event, "control queue full, event dropped");
                false
            }
        }
    }

    /// Queue a note-on with MIDI velocity 0..=127.
    pub fn note_on(&mut self, channel: u8, note: u8, velocity: u8) -> bool {
        self.send(ControlEvent::NoteOn {
            channel,
            note,
            velocity: f32::from(velocity.min(127)) / 127.0,
        })
    }

    /// Queue a note-off.
    pub fn note_off(&mut self, channel: u8, note: u8) -> bool {
        self.send(ControlEvent::NoteOff { channel, note })
    }

    /// Queue a controller change.
    pub fn control_change(&mut self, channel: u8, controller: u8, value: u8) -> bool {
        self.send(ControlEvent::ControlChange {
            channel,
            controller,
            value,
        })
    }

    /// Queue a pitch bend in octaves.
    pub fn pitch_bend(&mut self, octaves: f32) -> bool {
        self.send(ControlEvent::PitchBend { octaves })
    }

    /// Queue a soft stop.
    pub fn all_notes_off(&mut self) -> bool {
        self.send(ControlEvent::AllNotesOff)
    }

    /// Queue a hard stop.
    pub fn hard_stop(&mut self) -> bool {
        self.send(ControlEvent::HardStop)
    }

    /// Publish a patch; the engine applies it at its next block boundary.
    pub fn publish_patch(&self, patch: Patch) {
        info!(name = %patch.name, "patch published");
        self.shared.patch.store(Some(Arc::new(patch)));
        self.shared.patch_generation.fetch_add(1, Ordering::AcqRel);
    }

    /// The most recently published patch.
    pub fn current_patch(&self) -> Option<Arc<Patch>> {
        self.shared.patch.load_full()
    }

    /// Whether the engine is rendering.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Shared diagnostic counters.
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.shared.diagnostics
    }

    /// Counter snapshot.
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        self.shared.diagnostics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(config: EngineConfig) -> (Engine, EngineHandle) {
        Engine::new(config).unwrap()
    }

    #[test]
    fn invalid_config_fails_to_build() {
        let config = EngineConfig {
            sample_rate: 0.0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(config),
            Err(SynthError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn unroutable_param_writes_are_counted() {
        let (mut engine, _handle) = engine(EngineConfig::default());
        engine.handle_event(ControlEvent::SetParam {
            kind: BlockKind::Vcf,
            nth: 0,
            param: Param::Cutoff,
            value: 800.0,
        });
        assert_eq!(engine.diagnostics().snapshot().dropped_events, 0);

        // The single-oscillator path has one VCO.
        engine.handle_event(ControlEvent::SetParam {
            kind: BlockKind::Vco,
            nth: 3,
            param: Param::Detune,
            value: 0.5,
        });
        assert_eq!(engine.diagnostics().snapshot().dropped_events, 1);
    }

    #[test]
    fn render_replicates_mono_to_channels() {
        let (mut engine, mut handle) = engine(EngineConfig::default());
        handle.note_on(0, 69, 100);
        let mut buf = vec![0.0f32; 2 * 512];
        engine.render(&mut buf, 2);
        assert!(buf.chunks(2).all(|f| f[0] == f[1]));
        assert!(buf.iter().any(|&s| s != 0.0));
        assert_eq!(engine.frames_rendered(), 512);
    }

    #[test]
    fn full_queue_counts_dropped_events() {
        let config = EngineConfig {
            event_queue_capacity: 2,
            ..EngineConfig::default()
        };
        let (_engine, mut handle) = engine(config);
        assert!(handle.note_on(0, 60, 100));
        assert!(handle.note_on(0, 62, 100));
        assert!(!handle.note_on(0, 64, 100));
        assert_eq!(handle.snapshot().dropped_events, 1);
    }

    #[test]
    fn set_max_voices_rejected_while_running() {
        let (mut engine, _handle) = engine(EngineConfig::default());
        engine.start();
        assert_eq!(engine.set_max_voices(4), Err(SynthError::EngineBusy));
        engine.stop();
        engine.set_max_voices(4).unwrap();
        assert_eq!(engine.pool().capacity(), 4);
        assert_eq!(engine.set_max_voices(0), Err(SynthError::ZeroCapacity("max_voices")));
    }

    #[test]
    fn patch_applies_at_block_boundary() {
        let (mut engine, handle) = engine(EngineConfig::default());
        let mut patch = Patch::default();
        patch.amp_envelope.attack = 0.5;
        handle.publish_patch(patch);

        let adsr = engine.pool().voice(0).unwrap().path().node(BlockKind::Adsr, 0).unwrap();
        let before = engine.pool().voice(0).unwrap().path().param(adsr, Param::Attack).unwrap();
        assert_eq!(before, 0.01);

        let mut buf = [0.0f32; 64];
        engine.render(&mut buf, 1);
        for voice in engine.pool().voices() {
            assert_eq!(voice.path().param(adsr, Param::Attack).unwrap(), 0.5);
        }
    }

    #[test]
    fn cc_table_keeps_unknown_controllers() {
        let (mut engine, mut handle) = engine(EngineConfig::default());
        handle.control_change(0, 20, 99);
        engine.render(&mut [0.0; 16], 1);
        assert_eq!(engine.cc_value(20), 99);
    }

    #[test]
    fn exp_map_hits_endpoints() {
        assert_eq!(exp_map(20.0, 20000.0, 0.0), 20.0);
        assert_eq!(exp_map(20.0, 20000.0, 1.0), 20000.0);
        let mid = exp_map(20.0, 20000.0, 0.5);
        assert!((mid - 632.455).abs() < 0.01);
    }
}
