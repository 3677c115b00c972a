//! Presets bundled with the library.
//!
//! Always available without files. Program numbers follow the order below.

use crate::bank::PresetBank;
use crate::format::parse_presets;
use crate::preset::Preset;

/// Names of the factory presets, in program order.
pub static FACTORY_PRESET_NAMES: &[&str] = &["Init", "Warm Pad", "Acid Bass", "Vintage Brass", "Wobble"];

static FACTORY_PRESETS_TEXT: &str = "\
[Preset]
name=Init
description=Single sawtooth into an open low-pass
category=0
[EndPreset]

[Preset]
name=Warm Pad
description=Slow detuned saws with a breathing filter
category=1
vco_count=2
vco0_waveform=SAWTOOTH
vco1_waveform=SAWTOOTH
vco1_detune=0.12
vco1_level=0.8
vcf_cutoff=1500
vcf_res=0.4
attack=1.2
decay=0.3
sustain=0.7
release=1.0
lfo0_rate=0.3
mod_conn_count=1
conn0_source=0
conn0_destination=6
conn0_amount=0.2
conn0_name=LFO1 to cutoff
[EndPreset]

[Preset]
name=Acid Bass
description=Square into a resonant ladder with a snappy filter envelope
category=2
vco0_waveform=SQUARE
vco0_pulse_width=0.4
vcf_type=2
vcf_cutoff_freq=300
vcf_resonance=0.75
vcf_env_amount=4
env_attack=0.002
env_decay=0.2
env_sustain=0.6
env_release=0.08
filter_env_attack=0.001
filter_env_decay=0.18
filter_env_sustain=0
filter_env_release=0.1
mod_conn_count=1
conn0_source=4
conn0_destination=6
conn0_amount=0.3
conn0_name=Velocity to cutoff
[EndPreset]

[Preset]
name=Vintage Brass
description=Saw and sub square with a slow filter swell
category=3
vco_count=2
vco0_waveform=SAWTOOTH
vco1_waveform=SQUARE
vco1_detune=-12
vco1_level=0.5
vcf_type=2
vcf_cutoff_freq=900
vcf_resonance=0.2
vcf_env_amount=2.5
env_attack=0.06
env_decay=0.4
env_sustain=0.8
env_release=0.3
filter_env_attack=0.15
filter_env_decay=0.6
filter_env_sustain=0.4
filter_env_release=0.3
mod_conn_count=1
conn0_source=6
conn0_destination=0
conn0_amount=0.02
conn0_name=Mod wheel vibrato
[EndPreset]

[Preset]
name=Wobble
description=Triangle LFO sweeping a resonant state-variable low-pass
category=2
vco0_waveform=SAWTOOTH
vcf_cutoff_freq=600
vcf_resonance=0.6
lfo0_waveform=TRIANGLE
lfo0_rate=3
mod_conn_count=2
conn0_source=0
conn0_destination=6
conn0_amount=0.6
conn0_name=Wobble
conn1_source=6
conn1_destination=9
conn1_amount=0.5
conn1_name=Mod wheel speeds the wobble
[EndPreset]
";

/// Every factory preset as a bank.
pub fn factory_presets() -> PresetBank {
    parse_presets(FACTORY_PRESETS_TEXT)
        .map(|presets| presets.into_iter().collect())
        .unwrap_or_default()
}

/// A factory preset by name, case-insensitively.
pub fn get_factory_preset(name: &str) -> Option<Preset> {
    factory_presets()
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .cloned()
}

/// Whether `name` is a factory preset, case-insensitively.
pub fn is_factory_preset(name: &str) -> bool {
    FACTORY_PRESET_NAMES
        .iter()
        .any(|n| n.eq_ignore_ascii_case(name))
}
