//! Preset records and their conversion to engine patches.
//!
//! A [`Preset`] mirrors the text format one to one: enum-like fields keep
//! their raw integer tags so a file with tags this build does not know still
//! loads and saves unchanged. Tags are only interpreted by
//! [`Preset::to_patch`].

use serde::{Deserialize, Serialize};
use vasynth_synth::{
    AmpResponse, AmpSettings, EnvelopeSettings, FilterResponse, FilterSettings, FilterTopology,
    LfoSettings, ModDestination, ModSourceId, ModulationRoute, OscillatorSettings, Patch,
    Waveform,
};

/// One `vcoN_*` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcoPreset {
    /// Waveform tag.
    pub waveform_type: i64,
    /// Tuning of A4 in Hz.
    pub frequency: f64,
    /// Detune in semitones.
    pub detune: f64,
    /// Output level.
    pub level: f64,
    /// Pulse duty cycle.
    pub pulse_width: f64,
    /// FM depth.
    pub fm_depth: f64,
    /// Sample-and-hold rate in Hz.
    pub sample_hold_rate: f64,
}

/// The `vcf_*` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcfPreset {
    /// Topology tag.
    pub filter_type: i64,
    /// Response tag.
    pub response: i64,
    /// Cutoff in Hz.
    pub cutoff_freq: f64,
    /// Resonance, 0..=1.
    pub resonance: f64,
    /// Filter envelope amount.
    pub env_amount: f64,
}

/// The `vca_*` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcaPreset {
    /// Response tag.
    pub response: i64,
    /// Gain.
    pub gain: f64,
}

/// An `env_*` or `filter_env_*` group. Times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePreset {
    /// Attack time.
    pub attack: f64,
    /// Decay time.
    pub decay: f64,
    /// Sustain level.
    pub sustain: f64,
    /// Release time.
    pub release: f64,
}

/// An `lfoN_*` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LfoPreset {
    /// Waveform tag.
    pub waveform_type: i64,
    /// Rate in Hz.
    pub rate: f64,
    /// Depth, 0..=1.
    pub depth: f64,
}

/// A `connN_*` modulation link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPreset {
    /// Source tag.
    pub source: i64,
    /// Destination tag.
    pub destination: i64,
    /// Amount, -1..=1 once applied.
    pub amount: f64,
    /// Inactive links are kept but contribute nothing.
    pub active: bool,
    /// Free-form label.
    pub name: String,
}

/// A named patch as stored in a preset file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Unique within a bank.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Author.
    pub author: String,
    /// Category number.
    pub category: i64,
    /// Creation time in seconds since the Unix epoch.
    pub timestamp: f64,
    /// Oscillators in path order.
    pub vcos: Vec<VcoPreset>,
    /// Filter.
    pub vcf: VcfPreset,
    /// Amplifier.
    pub vca: VcaPreset,
    /// Amplitude envelope.
    pub amp_env: EnvelopePreset,
    /// Filter envelope.
    pub filter_env: EnvelopePreset,
    /// LFO1 and LFO2.
    pub lfos: [LfoPreset; 2],
    /// Output scale.
    pub master_volume: f64,
    /// Modulation links.
    pub connections: Vec<ConnectionPreset>,
}

impl Default for Preset {
    fn default() -> Self {
        Self::from_patch(&Patch::default())
    }
}

/// Widen through the shortest decimal form so `0.1f32` stays `0.1`.
pub(crate) fn widen(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(f64::from(value))
}

fn vco_from(osc: &OscillatorSettings) -> VcoPreset {
    VcoPreset {
        waveform_type: i64::from(osc.waveform.index()),
        frequency: widen(osc.reference),
        detune: widen(osc.detune),
        level: widen(osc.level),
        pulse_width: widen(osc.pulse_width),
        fm_depth: widen(osc.fm_depth),
        sample_hold_rate: widen(osc.sample_hold_rate),
    }
}

impl Default for VcoPreset {
    fn default() -> Self {
        vco_from(&OscillatorSettings::default())
    }
}

fn envelope_from(env: &EnvelopeSettings) -> EnvelopePreset {
    EnvelopePreset {
        attack: widen(env.attack),
        decay: widen(env.decay),
        sustain: widen(env.sustain),
        release: widen(env.release),
    }
}

fn lfo_from(lfo: &LfoSettings) -> LfoPreset {
    LfoPreset {
        waveform_type: i64::from(lfo.waveform.index()),
        rate: widen(lfo.rate),
        depth: widen(lfo.depth),
    }
}

impl Default for ConnectionPreset {
    fn default() -> Self {
        Self {
            source: 0,
            destination: 0,
            amount: 0.0,
            active: true,
            name: String::new(),
        }
    }
}

fn tag<T>(kind: &str, preset: &str, value: i64, decode: fn(i64) -> Option<T>) -> T
where
    T: Default,
{
    decode(value).unwrap_or_else(|| {
        tracing::warn!(preset, kind, value, "unknown tag, using default");
        T::default()
    })
}

impl Preset {
    /// A default preset with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Record every value of `patch`. Links get empty names.
    pub fn from_patch(patch: &Patch) -> Self {
        Self {
            name: patch.name.clone(),
            description: String::new(),
            author: String::new(),
            category: 0,
            timestamp: 0.0,
            vcos: patch.oscillators.iter().map(vco_from).collect(),
            vcf: VcfPreset {
                filter_type: i64::from(patch.filter.topology.index()),
                response: i64::from(patch.filter.response.index()),
                cutoff_freq: widen(patch.filter.cutoff),
                resonance: widen(patch.filter.resonance),
                env_amount: widen(patch.filter.env_amount),
            },
            vca: VcaPreset {
                response: i64::from(patch.amp.response.index()),
                gain: widen(patch.amp.gain),
            },
            amp_env: envelope_from(&patch.amp_envelope),
            filter_env: envelope_from(&patch.filter_envelope),
            lfos: [lfo_from(&patch.lfos[0]), lfo_from(&patch.lfos[1])],
            master_volume: widen(patch.master_volume),
            connections: patch
                .routes
                .iter()
                .map(|r| ConnectionPreset {
                    source: i64::from(r.source.index()),
                    destination: i64::from(r.destination.index()),
                    amount: widen(r.amount),
                    active: r.active,
                    name: String::new(),
                })
                .collect(),
        }
    }

    /// Build the engine patch.
    ///
    /// Unknown waveform, topology and response tags fall back to defaults.
    /// Links with an unknown source or destination are dropped. Both are
    /// logged. Out-of-range values are left for the engine to clamp.
    pub fn to_patch(&self) -> Patch {
        let name = self.name.as_str();
        let oscillators = self
            .vcos
            .iter()
            .map(|v| OscillatorSettings {
                waveform: tag("vco waveform", name, v.waveform_type, Waveform::from_index),
                reference: v.frequency as f32,
                detune: v.detune as f32,
                level: v.level as f32,
                pulse_width: v.pulse_width as f32,
                fm_depth: v.fm_depth as f32,
                sample_hold_rate: v.sample_hold_rate as f32,
            })
            .collect();
        let envelope = |e: &EnvelopePreset| EnvelopeSettings {
            attack: e.attack as f32,
            decay: e.decay as f32,
            sustain: e.sustain as f32,
            release: e.release as f32,
        };
        let lfo = |l: &LfoPreset| LfoSettings {
            waveform: tag("lfo waveform", name, l.waveform_type, Waveform::from_index),
            rate: l.rate as f32,
            depth: l.depth as f32,
        };

        let routes = self
            .connections
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let source = ModSourceId::from_index(c.source);
                let destination = ModDestination::from_index(c.destination);
                match (source, destination) {
                    (Some(s), Some(d)) => {
                        Some(ModulationRoute::new(s, d, c.amount as f32).with_active(c.active))
                    }
                    _ => {
                        tracing::warn!(
                            preset = name,
                            link = i,
                            source = c.source,
                            destination = c.destination,
                            "dropping modulation link with unknown tag"
                        );
                        None
                    }
                }
            })
            .collect();

        Patch {
            name: self.name.clone(),
            oscillators,
            filter: FilterSettings {
                topology: tag("vcf type", name, self.vcf.filter_type, FilterTopology::from_index),
                response: tag("vcf response", name, self.vcf.response, FilterResponse::from_index),
                cutoff: self.vcf.cutoff_freq as f32,
                resonance: self.vcf.resonance as f32,
                env_amount: self.vcf.env_amount as f32,
            },
            amp: AmpSettings {
                response: tag("vca response", name, self.vca.response, AmpResponse::from_index),
                gain: self.vca.gain as f32,
            },
            amp_envelope: envelope(&self.amp_env),
            filter_envelope: envelope(&self.filter_env),
            lfos: [lfo(&self.lfos[0]), lfo(&self.lfos[1])],
            routes,
            master_volume: self.master_volume as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_keeps_short_decimals() {
        assert_eq!(widen(0.1), 0.1);
        assert_eq!(widen(1500.0), 1500.0);
        assert_eq!(widen(0.7), 0.7);
    }

    #[test]
    fn default_matches_init_patch() {
        let preset = Preset::default();
        assert_eq!(preset.name, "Init");
        assert_eq!(preset.vcos.len(), 1);
        assert_eq!(preset.to_patch(), Patch::default());
    }

    #[test]
    fn patch_survives_conversion() {
        let mut patch = Patch::default();
        patch.name = "Sweep".into();
        patch.filter.cutoff = 900.0;
        patch.amp_envelope.attack = 1.25;
        patch.routes.push(
            ModulationRoute::new(ModSourceId::Lfo2, ModDestination::FilterCutoff, -0.5)
                .with_active(false),
        );
        assert_eq!(Preset::from_patch(&patch).to_patch(), patch);
    }

    #[test]
    fn unknown_link_tags_are_dropped() {
        let mut preset = Preset::new("Broken");
        preset.connections = vec![
            ConnectionPreset {
                source: 0,
                destination: 6,
                amount: 0.5,
                ..ConnectionPreset::default()
            },
            ConnectionPreset {
                source: 99,
                destination: 6,
                amount: 0.5,
                ..ConnectionPreset::default()
            },
            ConnectionPreset {
                source: 0,
                destination: -1,
                amount: 0.5,
                ..ConnectionPreset::default()
            },
        ];
        let patch = preset.to_patch();
        assert_eq!(patch.routes.len(), 1);
        assert_eq!(patch.routes[0].source, ModSourceId::Lfo1);
        assert_eq!(patch.routes[0].destination, ModDestination::FilterCutoff);
    }

    #[test]
    fn unknown_waveform_falls_back() {
        let mut preset = Preset::new("Odd");
        preset.vcos[0].waveform_type = 42;
        assert_eq!(preset.to_patch().oscillators[0].waveform, Waveform::default());
    }
}
