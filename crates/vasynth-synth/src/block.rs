//! Typed block storage with small index handles.
//!
//! Blocks live in one `Vec` per kind inside a [`BlockStore`]; a
//! [`BlockHandle`] is a `(kind, index)` pair into those arrays. Dispatch is a
//! `match` on the kind, so a tick never goes through a pointer or a vtable and
//! each voice's blocks stay contiguous.
//!
//! # Ports
//!
//! | Kind | Inputs | Output |
//! |------|--------|--------|
//! | `Vco` | 0 pitch CV (octaves), 1 FM | audio |
//! | `Vcf` | 0 audio, 1 cutoff CV (octaves), 2 envelope | audio |
//! | `Vca` | 0 audio, 1 gain CV (1.0 when unconnected) | audio |
//! | `Lfo` | none | control, -1 to 1 |
//! | `Adsr` | none | control, 0 to 1 |

use alloc::vec::Vec;

use vasynth_core::{
    AdsrEnvelope, AmpResponse, Amplifier, Filter, FilterResponse, FilterTopology, Lfo,
    Oscillator, ParamRange, Waveform, A4_FREQUENCY,
};

use crate::error::PathError;

/// Largest number of input ports on any block.
pub const MAX_INPUTS: usize = 3;

/// Block kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockKind {
    /// Voltage-controlled oscillator
    Vco,
    /// Voltage-controlled filter
    Vcf,
    /// Voltage-controlled amplifier
    Vca,
    /// Low frequency oscillator
    Lfo,
    /// ADSR envelope
    Adsr,
}

impl BlockKind {
    /// Number of input ports.
    pub fn input_count(self) -> usize {
        match self {
            BlockKind::Vco | BlockKind::Vca => 2,
            BlockKind::Vcf => 3,
            BlockKind::Lfo | BlockKind::Adsr => 0,
        }
    }

    /// Number of output ports.
    pub fn output_count(self) -> usize {
        1
    }

    /// Control blocks tick before audio blocks and feed the modulation sources.
    pub fn is_control(self) -> bool {
        matches!(self, BlockKind::Lfo | BlockKind::Adsr)
    }

    /// Value an input port reads when nothing is connected to it.
    pub fn default_input(self, port: usize) -> f32 {
        match (self, port) {
            (BlockKind::Vca, 1) => 1.0,
            _ => 0.0,
        }
    }
}

/// Handle to a block inside a [`BlockStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockHandle {
    kind: BlockKind,
    index: u32,
}

impl BlockHandle {
    /// Block kind.
    pub fn kind(self) -> BlockKind {
        self.kind
    }

    /// Index within the kind's array.
    pub fn index(self) -> u32 {
        self.index
    }
}

/// Scalar block parameters.
///
/// Enumerated settings (waveform, topology, response) are set by their
/// numeric index and rounded to the nearest valid value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Param {
    /// VCO/LFO waveform index
    Waveform,
    /// VCO base frequency in Hz
    Frequency,
    /// VCO tuning reference for A4 in Hz
    Reference,
    /// VCO detune in semitones
    Detune,
    /// VCO output level
    Level,
    /// VCO pulse width
    PulseWidth,
    /// VCO FM depth
    FmDepth,
    /// VCO/VCF/VCA control-input sensitivity
    CvSensitivity,
    /// VCO sample-and-hold rate in Hz
    SampleHoldRate,
    /// VCF topology index
    Topology,
    /// VCF response index
    Response,
    /// VCF cutoff in Hz
    Cutoff,
    /// VCF resonance
    Resonance,
    /// VCF envelope amount
    EnvAmount,
    /// VCA gain
    Gain,
    /// VCA maximum effective gain
    GainMax,
    /// VCA response index
    AmpResponse,
    /// LFO rate in Hz
    Rate,
    /// LFO depth
    Depth,
    /// ADSR attack in seconds
    Attack,
    /// ADSR decay in seconds
    Decay,
    /// ADSR sustain level
    Sustain,
    /// ADSR release in seconds
    Release,
}

/// Range of the VCO tuning reference.
pub const REFERENCE_RANGE: ParamRange = ParamRange::new(110.0, 880.0, A4_FREQUENCY);

/// Declared range of `param` on `kind`, or `None` if the kind lacks it.
pub fn param_range(kind: BlockKind, param: Param) -> Option<ParamRange> {
    let range = match (kind, param) {
        (BlockKind::Vco | BlockKind::Lfo, Param::Waveform) => {
            ParamRange::new(0.0, (Waveform::ALL.len() - 1) as f32, 0.0)
        }
        (BlockKind::Vco, Param::Frequency) => Oscillator::FREQUENCY,
        (BlockKind::Vco, Param::Reference) => REFERENCE_RANGE,
        (BlockKind::Vco, Param::Detune) => Oscillator::DETUNE,
        (BlockKind::Vco, Param::Level) => Oscillator::LEVEL,
        (BlockKind::Vco, Param::PulseWidth) => Oscillator::PULSE_WIDTH,
        (BlockKind::Vco, Param::FmDepth) => Oscillator::FM_DEPTH,
        (BlockKind::Vco, Param::CvSensitivity) => Oscillator::CV_SENSITIVITY,
        (BlockKind::Vco, Param::SampleHoldRate) => Oscillator::SAMPLE_HOLD_RATE,
        (BlockKind::Vcf, Param::Topology) => {
            ParamRange::new(0.0, (FilterTopology::ALL.len() - 1) as f32, 1.0)
        }
        (BlockKind::Vcf, Param::Response) => {
            ParamRange::new(0.0, (FilterResponse::ALL.len() - 1) as f32, 0.0)
        }
        (BlockKind::Vcf, Param::Cutoff) => Filter::CUTOFF,
        (BlockKind::Vcf, Param::Resonance) => Filter::RESONANCE,
        (BlockKind::Vcf, Param::EnvAmount) => Filter::ENV_AMOUNT,
        (BlockKind::Vcf, Param::CvSensitivity) => Filter::CV_SENSITIVITY,
        (BlockKind::Vca, Param::Gain) => Amplifier::GAIN,
        (BlockKind::Vca, Param::GainMax) => Amplifier::GAIN_MAX,
        (BlockKind::Vca, Param::CvSensitivity) => Amplifier::CV_SENSITIVITY,
        (BlockKind::Vca, Param::AmpResponse) => {
            ParamRange::new(0.0, (AmpResponse::ALL.len() - 1) as f32, 0.0)
        }
        (BlockKind::Lfo, Param::Rate) => Lfo::RATE,
        (BlockKind::Lfo, Param::Depth) => Lfo::DEPTH,
        (BlockKind::Adsr, Param::Attack) => {
            ParamRange::new(AdsrEnvelope::TIME.min, AdsrEnvelope::TIME.max, AdsrEnvelope::DEFAULT_ATTACK)
        }
        (BlockKind::Adsr, Param::Decay) => {
            ParamRange::new(AdsrEnvelope::TIME.min, AdsrEnvelope::TIME.max, AdsrEnvelope::DEFAULT_DECAY)
        }
        (BlockKind::Adsr, Param::Sustain) => AdsrEnvelope::SUSTAIN,
        (BlockKind::Adsr, Param::Release) => {
            ParamRange::new(AdsrEnvelope::TIME.min, AdsrEnvelope::TIME.max, AdsrEnvelope::DEFAULT_RELEASE)
        }
        _ => return None,
    };
    Some(range)
}

/// Oscillator plus its tuning reference.
#[derive(Debug, Clone)]
pub struct Vco {
    osc: Oscillator,
    reference: f32,
}

impl Vco {
    fn new(sample_rate: f32) -> Self {
        Self {
            osc: Oscillator::new(sample_rate),
            reference: A4_FREQUENCY,
        }
    }

    /// The oscillator.
    pub fn oscillator(&self) -> &Oscillator {
        &self.osc
    }

    /// Tuning reference for A4 in Hz.
    pub fn reference(&self) -> f32 {
        self.reference
    }

    /// Base frequency for an equal-tempered frequency at A4 = 440 Hz.
    pub fn tuned(&self, frequency: f32) -> f32 {
        frequency * self.reference / A4_FREQUENCY
    }
}

/// Owns every block of one signal path, one array per kind.
#[derive(Debug, Clone)]
pub struct BlockStore {
    sample_rate: f32,
    vcos: Vec<Vco>,
    vcfs: Vec<Filter>,
    vcas: Vec<Amplifier>,
    lfos: Vec<Lfo>,
    adsrs: Vec<AdsrEnvelope>,
}

impl BlockStore {
    /// Create an empty store at `sample_rate` Hz.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            vcos: Vec::new(),
            vcfs: Vec::new(),
            vcas: Vec::new(),
            lfos: Vec::new(),
            adsrs: Vec::new(),
        }
    }

    /// Sample rate the blocks were built for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Add a default-initialized block.
    pub fn add(&mut self, kind: BlockKind) -> BlockHandle {
        let sr = self.sample_rate;
        let index = match kind {
            BlockKind::Vco => push(&mut self.vcos, Vco::new(sr)),
            BlockKind::Vcf => push(&mut self.vcfs, Filter::new(sr)),
            BlockKind::Vca => push(&mut self.vcas, Amplifier::new()),
            BlockKind::Lfo => push(&mut self.lfos, Lfo::new(sr)),
            BlockKind::Adsr => push(&mut self.adsrs, AdsrEnvelope::new(sr)),
        };
        BlockHandle { kind, index }
    }

    /// Number of blocks of `kind`.
    pub fn count(&self, kind: BlockKind) -> usize {
        match kind {
            BlockKind::Vco => self.vcos.len(),
            BlockKind::Vcf => self.vcfs.len(),
            BlockKind::Vca => self.vcas.len(),
            BlockKind::Lfo => self.lfos.len(),
            BlockKind::Adsr => self.adsrs.len(),
        }
    }

    /// Whether `handle` refers to a block in this store.
    pub fn contains(&self, handle: BlockHandle) -> bool {
        (handle.index as usize) < self.count(handle.kind)
    }

    /// VCO by index.
    pub fn vco(&self, index: usize) -> Option<&Vco> {
        self.vcos.get(index)
    }

    /// VCF by index.
    pub fn vcf(&self, index: usize) -> Option<&Filter> {
        self.vcfs.get(index)
    }

    /// Mutable VCF by index.
    pub fn vcf_mut(&mut self, index: usize) -> Option<&mut Filter> {
        self.vcfs.get_mut(index)
    }

    /// VCA by index.
    pub fn vca(&self, index: usize) -> Option<&Amplifier> {
        self.vcas.get(index)
    }

    /// LFO by index.
    pub fn lfo(&self, index: usize) -> Option<&Lfo> {
        self.lfos.get(index)
    }

    /// ADSR by index.
    pub fn adsr(&self, index: usize) -> Option<&AdsrEnvelope> {
        self.adsrs.get(index)
    }

    /// Set a parameter, clamped to its declared range.
    ///
    /// Returns `Ok(true)` when the value had to be clamped.
    pub fn set_param(
        &mut self,
        handle: BlockHandle,
        param: Param,
        value: f32,
    ) -> Result<bool, PathError> {
        if !self.contains(handle) {
            return Err(PathError::UnknownBlock(handle.index as usize));
        }
        let range = param_range(handle.kind, param).ok_or(PathError::InvalidParam {
            kind: handle.kind,
            param,
        })?;
        let (value, clamped) = range.clamp_checked(value);
        self.write_param(handle, param, value);
        Ok(clamped)
    }

    /// Current value of a parameter.
    pub fn param(&self, handle: BlockHandle, param: Param) -> Result<f32, PathError> {
        if !self.contains(handle) {
            return Err(PathError::UnknownBlock(handle.index as usize));
        }
        let invalid = PathError::InvalidParam {
            kind: handle.kind,
            param,
        };
        let i = handle.index as usize;
        let value = match handle.kind {
            BlockKind::Vco => {
                let vco = &self.vcos[i];
                let osc = &vco.osc;
                match param {
                    Param::Waveform => f32::from(osc.waveform().index()),
                    Param::Frequency => osc.frequency(),
                    Param::Reference => vco.reference,
                    Param::Detune => osc.detune(),
                    Param::Level => osc.level(),
                    Param::PulseWidth => osc.pulse_width(),
                    Param::FmDepth => osc.fm_depth(),
                    Param::CvSensitivity => osc.cv_sensitivity(),
                    Param::SampleHoldRate => osc.sample_hold_rate(),
                    _ => return Err(invalid),
                }
            }
            BlockKind::Vcf => {
                let vcf = &self.vcfs[i];
                match param {
                    Param::Topology => f32::from(vcf.topology().index()),
                    Param::Response => f32::from(vcf.response().index()),
                    Param::Cutoff => vcf.cutoff(),
                    Param::Resonance => vcf.resonance(),
                    Param::EnvAmount => vcf.env_amount(),
                    Param::CvSensitivity => vcf.cv_sensitivity(),
                    _ => return Err(invalid),
                }
            }
            BlockKind::Vca => {
                let vca = &self.vcas[i];
                match param {
                    Param::Gain => vca.gain(),
                    Param::GainMax => vca.gain_max(),
                    Param::CvSensitivity => vca.cv_sensitivity(),
                    Param::AmpResponse => f32::from(vca.response().index()),
                    _ => return Err(invalid),
                }
            }
            BlockKind::Lfo => {
                let lfo = &self.lfos[i];
                match param {
                    Param::Waveform => f32::from(lfo.waveform().index()),
                    Param::Rate => lfo.rate(),
                    Param::Depth => lfo.depth(),
                    _ => return Err(invalid),
                }
            }
            BlockKind::Adsr => {
                let env = &self.adsrs[i];
                match param {
                    Param::Attack => env.attack(),
                    Param::Decay => env.decay(),
                    Param::Sustain => env.sustain(),
                    Param::Release => env.release(),
                    _ => return Err(invalid),
                }
            }
        };
        Ok(value)
    }

    /// Write a parameter without range checks or clamp accounting.
    ///
    /// Used for per-sample modulation; the block setters still clamp.
    /// Parameters the kind lacks are ignored.
    #[inline]
    pub(crate) fn write_param(&mut self, handle: BlockHandle, param: Param, value: f32) {
        let i = handle.index as usize;
        match handle.kind {
            BlockKind::Vco => {
                let vco = &mut self.vcos[i];
                let osc = &mut vco.osc;
                match param {
                    Param::Waveform => {
                        if let Some(w) = Waveform::from_index(round_index(value)) {
                            osc.set_waveform(w);
                        }
                    }
                    Param::Frequency => osc.set_frequency(value),
                    Param::Reference => vco.reference = REFERENCE_RANGE.clamp(value),
                    Param::Detune => osc.set_detune(value),
                    Param::Level => osc.set_level(value),
                    Param::PulseWidth => osc.set_pulse_width(value),
                    Param::FmDepth => osc.set_fm_depth(value),
                    Param::CvSensitivity => osc.set_cv_sensitivity(value),
                    Param::SampleHoldRate => osc.set_sample_hold_rate(value),
                    _ => {}
                }
            }
            BlockKind::Vcf => {
                let vcf = &mut self.vcfs[i];
                match param {
                    Param::Topology => {
                        if let Some(t) = FilterTopology::from_index(round_index(value)) {
                            vcf.set_topology(t);
                        }
                    }
                    Param::Response => {
                        if let Some(r) = FilterResponse::from_index(round_index(value)) {
                            vcf.set_response(r);
                        }
                    }
                    Param::Cutoff => vcf.set_cutoff(value),
                    Param::Resonance => vcf.set_resonance(value),
                    Param::EnvAmount => vcf.set_env_amount(value),
                    Param::CvSensitivity => vcf.set_cv_sensitivity(value),
                    _ => {}
                }
            }
            BlockKind::Vca => {
                let vca = &mut self.vcas[i];
                match param {
                    Param::Gain => vca.set_gain(value),
                    Param::GainMax => vca.set_gain_max(value),
                    Param::CvSensitivity => vca.set_cv_sensitivity(value),
                    Param::AmpResponse => {
                        if let Some(r) = AmpResponse::from_index(round_index(value)) {
                            vca.set_response(r);
                        }
                    }
                    _ => {}
                }
            }
            BlockKind::Lfo => {
                let lfo = &mut self.lfos[i];
                match param {
                    Param::Waveform => {
                        if let Some(w) = Waveform::from_index(round_index(value)) {
                            lfo.set_waveform(w);
                        }
                    }
                    Param::Rate => lfo.set_rate(value),
                    Param::Depth => lfo.set_depth(value),
                    _ => {}
                }
            }
            BlockKind::Adsr => {
                let env = &mut self.adsrs[i];
                match param {
                    Param::Attack => env.set_attack(value),
                    Param::Decay => env.set_decay(value),
                    Param::Sustain => env.set_sustain(value),
                    Param::Release => env.set_release(value),
                    _ => {}
                }
            }
        }
    }

    /// Tick one block.
    #[inline]
    pub(crate) fn tick(&mut self, handle: BlockHandle, inputs: &[f32; MAX_INPUTS]) -> f32 {
        let i = handle.index as usize;
        match handle.kind {
            BlockKind::Vco => self.vcos[i].osc.tick(inputs[0], inputs[1]),
            BlockKind::Vcf => self.vcfs[i].tick(inputs[0], inputs[1], inputs[2]),
            BlockKind::Vca => self.vcas[i].tick(inputs[0], inputs[1]),
            BlockKind::Lfo => self.lfos[i].tick(),
            BlockKind::Adsr => self.adsrs[i].tick(),
        }
    }

    /// Open every envelope gate.
    pub fn gate_on(&mut self) {
        self.adsrs.iter_mut().for_each(AdsrEnvelope::gate_on);
    }

    /// Close every envelope gate.
    pub fn gate_off(&mut self) {
        self.adsrs.iter_mut().for_each(AdsrEnvelope::gate_off);
    }

    /// Set every VCO's base frequency from an equal-tempered frequency.
    pub fn set_note_frequency(&mut self, frequency: f32) {
        for vco in &mut self.vcos {
            let f = vco.tuned(frequency);
            vco.osc.set_frequency(f);
        }
    }

    /// Apply cutoff limits to every VCF.
    pub fn set_cutoff_limits(&mut self, min_hz: f32, max_hz: f32) {
        for vcf in &mut self.vcfs {
            vcf.set_cutoff_limits(min_hz, max_hz);
        }
    }

    /// Clear all state: phases, filter memory, envelopes.
    pub fn reset(&mut self) {
        self.vcos.iter_mut().for_each(|v| v.osc.reset());
        self.vcfs.iter_mut().for_each(Filter::reset);
        self.lfos.iter_mut().for_each(Lfo::reset);
        self.adsrs.iter_mut().for_each(AdsrEnvelope::reset);
    }
}

fn push<T>(blocks: &mut Vec<T>, block: T) -> u32 {
    blocks.push(block);
    (blocks.len() - 1) as u32
}

fn round_index(value: f32) -> i64 {
    libm::roundf(value) as i64
}
