//! End-to-end behavior of voices, the pool, the matrix and the engine.

use std::sync::Arc;

use vasynth_synth::{
    AllocationMode, BlockKind, Diagnostics, Engine, EngineConfig, EnvelopeState, EventFrontend,
    ModDestination, ModSourceId, ModulationRoute, Param, PathKind, StealingMode, VoicePool, cc,
};

const SR: f32 = 44100.0;

fn pool(voices: usize, allocation: AllocationMode, stealing: StealingMode) -> VoicePool {
    let config = EngineConfig {
        sample_rate: SR,
        max_voices: voices,
        allocation_mode: allocation,
        stealing_mode: stealing,
        ..EngineConfig::default()
    };
    VoicePool::from_config(&config, Arc::new(Diagnostics::new())).unwrap()
}

fn run(pool: &mut VoicePool, samples: usize) {
    for _ in 0..samples {
        pool.tick();
    }
}

// ============================================================================
// Voice lifecycle
// ============================================================================

#[test]
fn note_lifecycle_with_default_envelope() {
    let mut p = pool(1, AllocationMode::Poly, StealingMode::OldestFirst);
    let attack = (0.01 * SR) as usize;
    let decay = (0.1 * SR) as usize;
    let release = (0.2 * SR) as usize;

    p.note_on(0, 69, 0.8);
    let mut nonzero_before_sustain = 0;
    for _ in 0..SR as usize {
        let state = p.voice(0).unwrap().envelope_state();
        let s = p.tick();
        if matches!(state, EnvelopeState::Attack | EnvelopeState::Decay) && s != 0.0 {
            nonzero_before_sustain += 1;
        }
    }
    assert_eq!(p.voice(0).unwrap().envelope_state(), EnvelopeState::Sustain);
    assert!(
        nonzero_before_sustain >= attack,
        "only {nonzero_before_sustain} non-zero samples before sustain"
    );

    p.note_off(0, 69);
    let limit = attack + decay + release + 1;
    let mut n = 0;
    while p.voice(0).unwrap().is_active() && n <= limit {
        p.tick();
        n += 1;
    }
    assert!(!p.voice(0).unwrap().is_active(), "voice still active after {n} samples");
    assert_eq!(p.voice(0).unwrap().envelope_state(), EnvelopeState::Idle);
    assert_eq!(p.tick(), 0.0);
}

#[test]
fn retrigger_during_release_starts_from_current_level() {
    let mut p = pool(1, AllocationMode::Poly, StealingMode::OldestFirst);
    p.note_on(0, 60, 1.0);
    run(&mut p, SR as usize / 2);
    p.note_off(0, 60);
    run(&mut p, 1000);
    let level = p.voice(0).unwrap().path().amp_envelope().unwrap().level();
    assert!(level > 0.0);

    p.note_on(0, 60, 1.0);
    run(&mut p, 1);
    let after = p.voice(0).unwrap().path().amp_envelope().unwrap().level();
    assert!(after >= level, "attack should continue from {level}, got {after}");
}

// ============================================================================
// Stealing
// ============================================================================

fn fill_and_steal(stealing: StealingMode) -> Vec<u8> {
    let mut p = pool(4, AllocationMode::Poly, stealing);
    for (note, velocity) in [(60, 0.9), (62, 0.5), (64, 0.7), (65, 0.8)] {
        p.note_on(0, note, velocity);
        run(&mut p, 100);
    }
    assert_eq!(p.active_voice_count(), 4);
    p.note_on(0, 67, 1.0);
    assert_eq!(p.active_voice_count(), 4);
    assert_eq!(p.diagnostics().snapshot().voice_steals, 1);
    p.voices().iter().map(|v| v.note()).collect()
}

#[test]
fn oldest_first_steals_earliest_note() {
    assert_eq!(fill_and_steal(StealingMode::OldestFirst), [67, 62, 64, 65]);
}

#[test]
fn last_played_steals_most_recent_note() {
    assert_eq!(fill_and_steal(StealingMode::LastPlayed), [60, 62, 64, 67]);
}

#[test]
fn quietest_first_steals_lowest_velocity() {
    assert_eq!(fill_and_steal(StealingMode::QuietestFirst), [60, 67, 64, 65]);
}

// ============================================================================
// Mono / legato
// ============================================================================

#[test]
fn mono_release_resumes_held_notes_without_retrigger() {
    let mut p = pool(1, AllocationMode::Mono, StealingMode::OldestFirst);
    for note in [60, 64, 67] {
        p.note_on(0, note, 1.0);
        run(&mut p, 100);
    }
    run(&mut p, SR as usize);
    let v = p.voice(0).unwrap();
    assert_eq!(v.note(), 67);
    assert_eq!(v.envelope_state(), EnvelopeState::Sustain);

    p.note_off(0, 67);
    let v = p.voice(0).unwrap();
    assert_eq!(v.note(), 64);
    assert_eq!(v.envelope_state(), EnvelopeState::Sustain);

    run(&mut p, 100);
    p.note_off(0, 64);
    let v = p.voice(0).unwrap();
    assert_eq!(v.note(), 60);
    assert_eq!(v.envelope_state(), EnvelopeState::Sustain);

    p.note_off(0, 60);
    assert_eq!(p.voice(0).unwrap().envelope_state(), EnvelopeState::Release);
}

#[test]
fn legato_follows_last_pressed() {
    let mut p = pool(1, AllocationMode::Legato, StealingMode::OldestFirst);
    p.note_on(0, 67, 1.0);
    run(&mut p, SR as usize);
    p.note_on(0, 60, 1.0);
    assert_eq!(p.voice(0).unwrap().note(), 60);
    assert_eq!(p.voice(0).unwrap().envelope_state(), EnvelopeState::Sustain);
    p.note_on(0, 64, 1.0);
    assert_eq!(p.voice(0).unwrap().note(), 64);
    p.note_off(0, 64);
    assert_eq!(p.voice(0).unwrap().note(), 60);
}

// ============================================================================
// Modulation
// ============================================================================

#[test]
fn lfo_sweeps_cutoff_within_linear_bounds() {
    let mut p = pool(1, AllocationMode::Poly, StealingMode::OldestFirst);
    p.set_block_param(BlockKind::Vcf, 0, Param::Cutoff, 2000.0)
        .unwrap();
    p.matrix_mut()
        .add_route(ModulationRoute::new(
            ModSourceId::Lfo1,
            ModDestination::FilterCutoff,
            0.3,
        ))
        .unwrap();
    p.note_on(0, 57, 1.0);

    let vcf = p.voice(0).unwrap().path().node(BlockKind::Vcf, 0).unwrap();
    let (mut lo, mut hi) = (f32::MAX, f32::MIN);
    for _ in 0..SR as usize {
        p.tick();
        let cutoff = p.voice(0).unwrap().path().param(vcf, Param::Cutoff).unwrap();
        lo = lo.min(cutoff);
        hi = hi.max(cutoff);
    }
    let tol = 0.5;
    assert!(lo >= 1400.0 - tol && hi <= 2600.0 + tol, "cutoff range [{lo}, {hi}]");
    assert!(lo < 1410.0 && hi > 2590.0, "LFO at 5 Hz should reach both extremes");
}

#[test]
fn mix_is_bounded_at_full_polyphony() {
    let config = EngineConfig {
        sample_rate: SR,
        max_voices: 8,
        path_kind: PathKind::DualOscillator,
        ..EngineConfig::default()
    };
    let mut p = VoicePool::from_config(&config, Arc::new(Diagnostics::new())).unwrap();
    p.set_block_param(BlockKind::Vca, 0, Param::Gain, 4.0).unwrap();
    for note in 40..48 {
        p.note_on(0, note, 1.0);
    }
    for _ in 0..SR as usize / 4 {
        let s = p.tick();
        assert!(s.abs() <= 1.0);
    }
}

// ============================================================================
// Engine control
// ============================================================================

#[test]
fn cutoff_cc_reaches_configured_limits() {
    let config = EngineConfig {
        sample_rate: SR,
        cutoff_min: 40.0,
        cutoff_max: 16000.0,
        ..EngineConfig::default()
    };
    let (mut engine, mut handle) = Engine::new(config).unwrap();
    let vcf = engine
        .pool()
        .voice(0)
        .unwrap()
        .path()
        .node(BlockKind::Vcf, 0)
        .unwrap();
    let mut buf = vec![0.0f32; 2 * 256];

    handle.note_on(0, 60, 100);
    handle.control_change(0, cc::CUTOFF, 0);
    engine.render(&mut buf, 2);
    for voice in engine.pool().voices() {
        assert_eq!(voice.path().base_param(vcf, Param::Cutoff), Some(40.0));
    }

    handle.control_change(0, cc::CUTOFF, 127);
    engine.render(&mut buf, 2);
    for voice in engine.pool().voices() {
        assert_eq!(voice.path().base_param(vcf, Param::Cutoff), Some(16000.0));
    }
    assert_eq!(engine.frames_rendered(), 512);
    assert_eq!(engine.cc_value(cc::CUTOFF), 127);
}

#[test]
fn midi_bytes_drive_engine() {
    let config = EngineConfig {
        sample_rate: SR,
        ..EngineConfig::default()
    };
    let (mut engine, handle) = Engine::new(config).unwrap();
    let mut frontend = EventFrontend::new(handle, None, 2.0);
    let mut buf = vec![0.0f32; 128];

    // Note on, running-status second note, then a full bend up.
    frontend.feed(&[0x90, 60, 100, 64, 100, 0xE0, 0x7F, 0x7F], |_, _| None);
    engine.render(&mut buf, 1);
    assert_eq!(engine.pool().active_voice_count(), 2);
    let bend = engine.pool().globals().pitch_bend;
    assert!((bend - 2.0 / 12.0).abs() < 1e-3, "bend {bend}");

    frontend.feed(&[0xB0, cc::ALL_NOTES_OFF, 0], |_, _| None);
    engine.render(&mut buf, 1);
    assert!(engine.pool().voices().iter().all(|v| !v.is_gated()));

    frontend.feed(&[0xB0, cc::ALL_SOUND_OFF, 0], |_, _| None);
    engine.render(&mut buf, 1);
    assert_eq!(engine.pool().active_voice_count(), 0);
}

#[test]
fn volume_cc_scales_output() {
    let (mut engine, mut handle) = Engine::new(EngineConfig::default()).unwrap();
    handle.note_on(0, 60, 127);
    let mut loud = vec![0.0f32; 4800];
    engine.render(&mut loud, 1);

    engine.pool_mut().hard_stop();
    handle.control_change(0, cc::VOLUME, 0);
    handle.note_on(0, 60, 127);
    let mut quiet = vec![0.0f32; 4800];
    engine.render(&mut quiet, 1);

    assert!(loud.iter().any(|&s| s != 0.0));
    assert!(quiet.iter().all(|&s| s == 0.0));
}
