//! Preset files, banks and engine configs end to end.

use std::sync::Arc;

use tempfile::TempDir;
use vasynth_config::{
    ConfigError, Preset, PresetBank, factory_presets, load_engine_config, presets_to_string,
};
use vasynth_synth::{
    BlockKind, Diagnostics, Engine, EngineConfig, EventFrontend, Param, PathKind, VoicePool,
    Waveform,
};

const WARM_PAD: &str = "\
[Preset]
name=Warm Pad
attack=1.2
decay=0.3
sustain=0.7
release=1.0
vco0_waveform=SAWTOOTH
vcf_cutoff=1500
vcf_res=0.4
[EndPreset]
";

#[test]
fn warm_pad_reaches_the_voice() {
    let bank = PresetBank::parse(WARM_PAD).unwrap();
    let patch = bank.get("Warm Pad").unwrap().to_patch();

    let config = EngineConfig {
        sample_rate: 44100.0,
        max_voices: 2,
        ..EngineConfig::default()
    };
    let mut pool = VoicePool::from_config(&config, Arc::new(Diagnostics::new())).unwrap();
    pool.apply_patch(&patch);
    assert_eq!(pool.diagnostics().snapshot().param_clamps, 0);

    for voice in pool.voices() {
        let env = voice.path().amp_envelope().unwrap();
        assert_eq!(env.attack(), 1.2);
        assert_eq!(env.decay(), 0.3);
        assert_eq!(env.sustain(), 0.7);
        assert_eq!(env.release(), 1.0);

        let path = voice.path();
        let vco = path.node(BlockKind::Vco, 0).unwrap();
        let vcf = path.node(BlockKind::Vcf, 0).unwrap();
        let waveform = path.param(vco, Param::Waveform).unwrap();
        assert_eq!(waveform, f32::from(Waveform::Sawtooth.index()));
        assert_eq!(path.base_param(vcf, Param::Cutoff), Some(1500.0));
        assert_eq!(path.param(vcf, Param::Resonance).unwrap(), 0.4);
    }
}

#[test]
fn save_parse_save_is_identical() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bank.preset");

    let mut bank = factory_presets();
    let mut custom = Preset::new("Odd Values");
    custom.timestamp = 1_700_000_000.123_456_7;
    custom.vcf.cutoff_freq = 1234.567_890_123;
    custom.vcos[0].detune = -0.000_001;
    custom.author = "someone".into();
    bank.insert(custom).unwrap();
    bank.save(&path).unwrap();

    let first = std::fs::read_to_string(&path).unwrap();
    let reloaded = PresetBank::load(&path).unwrap();
    assert_eq!(reloaded, bank);
    assert_eq!(reloaded.to_text(), first);
    assert_eq!(presets_to_string(&reloaded.iter().cloned().collect::<Vec<_>>()), first);
}

#[test]
fn broken_file_loads_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.preset");
    std::fs::write(&path, format!("{WARM_PAD}\n[Preset]\nname=Half\n")).unwrap();

    let err = PresetBank::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::PresetParse { line: 13, .. }), "{err}");
    assert!(err.is_parse_error());
}

#[test]
fn missing_file_is_not_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let err = PresetBank::load(dir.path().join("nope.preset")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(!err.is_parse_error());
}

#[test]
fn presets_serialize_to_json() {
    let preset = factory_presets().get("Acid Bass").unwrap().clone();
    let json = serde_json::to_value(&preset).unwrap();
    assert_eq!(json["name"], "Acid Bass");
    assert_eq!(json["vcf"]["filter_type"], 2);
    assert_eq!(json["connections"][0]["source"], 4);
    let back: Preset = serde_json::from_value(json).unwrap();
    assert_eq!(back, preset);
}

#[test]
fn program_change_swaps_the_patch() {
    let bank = factory_presets();
    let (mut engine, handle) = Engine::new(EngineConfig {
        path_kind: PathKind::DualOscillator,
        ..EngineConfig::default()
    })
    .unwrap();
    let mut frontend = EventFrontend::new(handle, None, 2.0);

    // Program 2 is "Acid Bass".
    frontend.feed(&[0xC0, 2], |_, program| bank.patch_for_program(program));
    engine.render(&mut [0.0; 64], 1);

    let path = engine.pool().voice(0).unwrap().path();
    let vcf = path.node(BlockKind::Vcf, 0).unwrap();
    assert_eq!(path.base_param(vcf, Param::Cutoff), Some(300.0));
    assert_eq!(engine.pool().matrix().iter().count(), 1);
}

#[test]
fn engine_config_file_builds_an_engine() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(
        &path,
        "sample_rate = 44100\nmax_voices = 3\npath_kind = \"vintage_mono\"\nallocation_mode = \"mono\"\n",
    )
    .unwrap();
    let config = load_engine_config(&path).unwrap();
    let (engine, _handle) = Engine::new(config).unwrap();
    assert_eq!(engine.pool().capacity(), 3);
    assert_eq!(engine.sample_rate(), 44100.0);
}
