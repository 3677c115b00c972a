//! Owned snapshots of every voice parameter.
//!
//! A [`Patch`] is built off the audio thread (usually from a preset), then
//! published to the engine and applied to every voice at a block boundary.
//! Applying a patch only writes parameters; it never allocates.

use alloc::string::String;
use alloc::vec::Vec;

use vasynth_core::{AmpResponse, FilterResponse, FilterTopology, Waveform};

use crate::block::{BlockKind, Param};
use crate::mod_matrix::ModulationRoute;
use crate::path::SignalPath;

/// One VCO.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OscillatorSettings {
    /// Waveform.
    pub waveform: Waveform,
    /// Tuning of A4 in Hz.
    pub reference: f32,
    /// Detune in semitones.
    pub detune: f32,
    /// Output level.
    pub level: f32,
    /// Pulse duty cycle.
    pub pulse_width: f32,
    /// FM depth.
    pub fm_depth: f32,
    /// Sample-and-hold trigger rate in Hz.
    pub sample_hold_rate: f32,
}

impl Default for OscillatorSettings {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sawtooth,
            reference: 440.0,
            detune: 0.0,
            level: 1.0,
            pulse_width: 0.5,
            fm_depth: 0.0,
            sample_hold_rate: 100.0,
        }
    }
}

/// The VCF.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSettings {
    /// Topology.
    pub topology: FilterTopology,
    /// Response.
    pub response: FilterResponse,
    /// Base cutoff in Hz.
    pub cutoff: f32,
    /// Resonance, 0..=1.
    pub resonance: f32,
    /// Filter envelope amount.
    pub env_amount: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            topology: FilterTopology::StateVariable,
            response: FilterResponse::Lowpass,
            cutoff: 2000.0,
            resonance: 0.1,
            env_amount: 0.0,
        }
    }
}

/// The VCA.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmpSettings {
    /// Response curve.
    pub response: AmpResponse,
    /// Base gain.
    pub gain: f32,
}

impl Default for AmpSettings {
    fn default() -> Self {
        Self {
            response: AmpResponse::Linear,
            gain: 1.0,
        }
    }
}

/// One ADSR. Times in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeSettings {
    /// Attack time.
    pub attack: f32,
    /// Decay time.
    pub decay: f32,
    /// Sustain level.
    pub sustain: f32,
    /// Release time.
    pub release: f32,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.2,
        }
    }
}

/// One LFO.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LfoSettings {
    /// Waveform.
    pub waveform: Waveform,
    /// Rate in Hz.
    pub rate: f32,
    /// Depth, 0..=1.
    pub depth: f32,
}

impl Default for LfoSettings {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            rate: 5.0,
            depth: 1.0,
        }
    }
}

/// Every voice parameter plus the matrix links and master volume.
#[derive(Clone, Debug, PartialEq)]
pub struct Patch {
    /// Display name.
    pub name: String,
    /// VCO settings in path order. Extra entries are ignored by paths with
    /// fewer oscillators.
    pub oscillators: Vec<OscillatorSettings>,
    /// VCF settings.
    pub filter: FilterSettings,
    /// VCA settings.
    pub amp: AmpSettings,
    /// Amplitude envelope.
    pub amp_envelope: EnvelopeSettings,
    /// Filter envelope.
    pub filter_envelope: EnvelopeSettings,
    /// LFO1 and LFO2.
    pub lfos: [LfoSettings; 2],
    /// Modulation links.
    pub routes: Vec<ModulationRoute>,
    /// Output scale, 0..=1.
    pub master_volume: f32,
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            name: String::from("Init"),
            oscillators: alloc::vec![OscillatorSettings::default()],
            filter: FilterSettings::default(),
            amp: AmpSettings::default(),
            amp_envelope: EnvelopeSettings::default(),
            filter_envelope: EnvelopeSettings::default(),
            lfos: [LfoSettings::default(); 2],
            routes: Vec::new(),
            master_volume: 1.0,
        }
    }
}

impl Patch {
    /// Write every parameter into `path`.
    ///
    /// Blocks the path lacks are skipped. Returns how many values were
    /// clamped. Routes and master volume are applied by the pool.
    pub fn apply(&self, path: &mut SignalPath) -> u32 {
        let mut clamps = 0;
        let mut set = |path: &mut SignalPath, node: usize, param: Param, value: f32| {
            if matches!(path.set_param(node, param, value), Ok(true)) {
                clamps += 1;
            }
        };

        for (i, osc) in self.oscillators.iter().enumerate() {
            let Some(node) = path.node(BlockKind::Vco, i) else {
                break;
            };
            set(path, node, Param::Waveform, f32::from(osc.waveform.index()));
            set(path, node, Param::Reference, osc.reference);
            set(path, node, Param::Detune, osc.detune);
            set(path, node, Param::Level, osc.level);
            set(path, node, Param::PulseWidth, osc.pulse_width);
            set(path, node, Param::FmDepth, osc.fm_depth);
            set(path, node, Param::SampleHoldRate, osc.sample_hold_rate);
        }

        if let Some(node) = path.node(BlockKind::Vcf, 0) {
            let f = &self.filter;
            set(path, node, Param::Topology, f32::from(f.topology.index()));
            set(path, node, Param::Response, f32::from(f.response.index()));
            set(path, node, Param::Cutoff, f.cutoff);
            set(path, node, Param::Resonance, f.resonance);
            set(path, node, Param::EnvAmount, f.env_amount);
        }

        if let Some(node) = path.node(BlockKind::Vca, 0) {
            set(path, node, Param::AmpResponse, f32::from(self.amp.response.index()));
            set(path, node, Param::Gain, self.amp.gain);
        }

        for (i, env) in [&self.amp_envelope, &self.filter_envelope].into_iter().enumerate() {
            if let Some(node) = path.node(BlockKind::Adsr, i) {
                set(path, node, Param::Attack, env.attack);
                set(path, node, Param::Decay, env.decay);
                set(path, node, Param::Sustain, env.sustain);
                set(path, node, Param::Release, env.release);
            }
        }

        for (i, lfo) in self.lfos.iter().enumerate() {
            if let Some(node) = path.node(BlockKind::Lfo, i) {
                set(path, node, Param::Waveform, f32::from(lfo.waveform.index()));
                set(path, node, Param::Rate, lfo.rate);
                set(path, node, Param::Depth, lfo.depth);
            }
        }

        clamps
    }

    /// Snapshot the current unmodulated parameters of `path`.
    pub fn capture(path: &SignalPath, name: &str) -> Self {
        let value = |node: usize, param: Param| {
            path.base_param(node, param)
                .or_else(|| path.param(node, param).ok())
                .unwrap_or(0.0)
        };
        let index = |node: usize, param: Param| libm::roundf(value(node, param)) as i64;

        let mut patch = Patch {
            name: String::from(name),
            oscillators: Vec::new(),
            ..Patch::default()
        };

        let mut i = 0;
        while let Some(node) = path.node(BlockKind::Vco, i) {
            patch.oscillators.push(OscillatorSettings {
                waveform: Waveform::from_index(index(node, Param::Waveform)).unwrap_or_default(),
                reference: value(node, Param::Reference),
                detune: value(node, Param::Detune),
                level: value(node, Param::Level),
                pulse_width: value(node, Param::PulseWidth),
                fm_depth: value(node, Param::FmDepth),
                sample_hold_rate: value(node, Param::SampleHoldRate),
            });
            i += 1;
        }

        if let Some(node) = path.node(BlockKind::Vcf, 0) {
            patch.filter = FilterSettings {
                topology: FilterTopology::from_index(index(node, Param::Topology))
                    .unwrap_or_default(),
                response: FilterResponse::from_index(index(node, Param::Response))
                    .unwrap_or_default(),
                cutoff: value(node, Param::Cutoff),
                resonance: value(node, Param::Resonance),
                env_amount: value(node, Param::EnvAmount),
            };
        }

        if let Some(node) = path.node(BlockKind::Vca, 0) {
            patch.amp = AmpSettings {
                response: AmpResponse::from_index(index(node, Param::AmpResponse))
                    .unwrap_or_default(),
                gain: value(node, Param::Gain),
            };
        }

        for (i, env) in [&mut patch.amp_envelope, &mut patch.filter_envelope]
            .into_iter()
            .enumerate()
        {
            if let Some(node) = path.node(BlockKind::Adsr, i) {
                *env = EnvelopeSettings {
                    attack: value(node, Param::Attack),
                    decay: value(node, Param::Decay),
                    sustain: value(node, Param::Sustain),
                    release: value(node, Param::Release),
                };
            }
        }

        for (i, lfo) in patch.lfos.iter_mut().enumerate() {
            if let Some(node) = path.node(BlockKind::Lfo, i) {
                *lfo = LfoSettings {
                    waveform: Waveform::from_index(index(node, Param::Waveform))
                        .unwrap_or_default(),
                    rate: value(node, Param::Rate),
                    depth: value(node, Param::Depth),
                };
            }
        }

        patch.master_volume = path.master_volume();
        patch
    }
}
