//! Per-voice signal path: an ordered block list plus a routing table.
//!
//! A path is built in two phases. While unfrozen, blocks are added with
//! [`SignalPath::add_block`], routed with [`SignalPath::connect`] and
//! [`SignalPath::connect_output`], and parameters are bound to modulation
//! destinations with [`SignalPath::bind`]. [`SignalPath::freeze`] then runs
//! Kahn's algorithm over the routing graph, rejects cycles, and precomputes
//! the audio-block order and the incoming-edge lists so that
//! [`SignalPath::tick`] only walks flat arrays.
//!
//! # Tick order
//!
//! 1. Control blocks (LFO, ADSR) tick in declared order and publish their
//!    outputs into the voice's [`ModulationValues`]: the first two LFOs are
//!    `Lfo1`/`Lfo2`, the first two ADSRs are `AmpEnv`/`FilterEnv`.
//! 2. The matrix sums are taken from that snapshot and every bound
//!    parameter is rewritten as `apply(destination, base, sum)`.
//! 3. Audio blocks tick in topological order, each input port reading the
//!    gain-weighted sum of its incoming edges.
//! 4. The output-edge sum times `master_volume` is returned.

use alloc::vec;
use alloc::vec::Vec;

use vasynth_core::AdsrEnvelope;

use crate::block::{BlockHandle, BlockKind, BlockStore, MAX_INPUTS, Param};
use crate::error::PathError;
use crate::mod_matrix::{ModDestination, ModulationMatrix, ModulationValues};

/// A directed connection between two block ports.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    /// Source node index.
    pub src: usize,
    /// Source output port.
    pub src_port: usize,
    /// Destination node index.
    pub dst: usize,
    /// Destination input port.
    pub dst_port: usize,
    /// Gain applied to the source output.
    pub gain: f32,
}

/// A connection from a block output to the path output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutputEdge {
    /// Source node index.
    pub src: usize,
    /// Gain applied to the source output.
    pub gain: f32,
}

/// A block parameter driven by a modulation destination.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ModBinding {
    node: usize,
    param: Param,
    destination: ModDestination,
    base: f32,
}

/// Canonical voice layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PathKind {
    /// One VCO into a state-variable low-pass and a VCA.
    #[default]
    SingleOscillator,
    /// Two saw VCOs, the second detuned and FM-able from the first, mixed 50/50.
    DualOscillator,
    /// Saw plus a sub-octave pulse into a resonant ladder low-pass.
    VintageMono,
}

impl PathKind {
    /// Every kind.
    pub const ALL: [PathKind; 3] = [
        PathKind::SingleOscillator,
        PathKind::DualOscillator,
        PathKind::VintageMono,
    ];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            PathKind::SingleOscillator => "single_oscillator",
            PathKind::DualOscillator => "dual_oscillator",
            PathKind::VintageMono => "vintage_mono",
        }
    }

    /// Build and freeze the canonical path at `sample_rate` Hz.
    pub fn build(self, sample_rate: f32) -> Result<SignalPath, PathError> {
        let mut p = SignalPath::new(sample_rate);

        let lfo1 = p.add_block(BlockKind::Lfo)?;
        let lfo2 = p.add_block(BlockKind::Lfo)?;
        let amp_env = p.add_block(BlockKind::Adsr)?;
        let filter_env = p.add_block(BlockKind::Adsr)?;
        let vco1 = p.add_block(BlockKind::Vco)?;
        let vco2 = match self {
            PathKind::SingleOscillator => None,
            PathKind::DualOscillator | PathKind::VintageMono => Some(p.add_block(BlockKind::Vco)?),
        };
        let vcf = p.add_block(BlockKind::Vcf)?;
        let vca = p.add_block(BlockKind::Vca)?;

        p.set_param(vco1, Param::Waveform, 1.0)?;
        if let Some(vco2) = vco2 {
            p.connect(vco1, 0, vcf, 0, 0.5)?;
            p.connect(vco2, 0, vcf, 0, 0.5)?;
            p.connect(vco1, 0, vco2, 1, 1.0)?;
        } else {
            p.connect(vco1, 0, vcf, 0, 1.0)?;
        }
        p.connect(vcf, 0, vca, 0, 1.0)?;
        p.connect(amp_env, 0, vca, 1, 1.0)?;
        p.connect(filter_env, 0, vcf, 2, 1.0)?;
        p.connect_output(vca, 1.0)?;

        match (self, vco2) {
            (PathKind::DualOscillator, Some(vco2)) => {
                p.set_param(vco2, Param::Waveform, 1.0)?;
                p.set_param(vco2, Param::Detune, 0.07)?;
            }
            (PathKind::VintageMono, Some(vco2)) => {
                p.set_param(vco2, Param::Waveform, 3.0)?;
                p.set_param(vco2, Param::Detune, -12.0)?;
                p.set_param(vcf, Param::Topology, 2.0)?;
                p.set_param(vcf, Param::Resonance, 0.3)?;
                p.set_param(vcf, Param::Cutoff, 1200.0)?;
            }
            _ => {
                p.set_param(vcf, Param::Cutoff, 2000.0)?;
            }
        }

        p.bind(vco1, Param::Frequency, ModDestination::Osc1Pitch)?;
        p.bind(vco1, Param::Level, ModDestination::Osc1Level)?;
        p.bind(vco1, Param::PulseWidth, ModDestination::PulseWidth)?;
        p.bind(vco1, Param::FmDepth, ModDestination::FmDepth)?;
        if let Some(vco2) = vco2 {
            p.bind(vco2, Param::Frequency, ModDestination::Osc2Pitch)?;
            p.bind(vco2, Param::Level, ModDestination::Osc2Level)?;
            p.bind(vco2, Param::PulseWidth, ModDestination::PulseWidth)?;
            p.bind(vco2, Param::FmDepth, ModDestination::FmDepth)?;
        }
        p.bind(vcf, Param::Cutoff, ModDestination::FilterCutoff)?;
        p.bind(vcf, Param::Resonance, ModDestination::FilterResonance)?;
        p.bind(vca, Param::Gain, ModDestination::Amplitude)?;
        p.bind(lfo1, Param::Rate, ModDestination::Lfo1Rate)?;
        p.bind(lfo2, Param::Rate, ModDestination::Lfo2Rate)?;

        p.freeze()?;
        Ok(p)
    }
}

/// Ordered blocks, routing and modulation bindings for one voice.
///
/// # Example
///
/// ```rust
/// use vasynth_synth::{BlockKind, ModulationMatrix, ModulationValues, SignalPath};
///
/// let mut path = SignalPath::new(48000.0);
/// let vco = path.add_block(BlockKind::Vco).unwrap();
/// let vca = path.add_block(BlockKind::Vca).unwrap();
/// path.connect(vco, 0, vca, 0, 1.0).unwrap();
/// path.connect_output(vca, 1.0).unwrap();
/// path.freeze().unwrap();
///
/// let matrix = ModulationMatrix::new(4);
/// let mut sources = ModulationValues::new();
/// let sample = path.tick(&matrix, &mut sources);
/// assert!(sample.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct SignalPath {
    store: BlockStore,
    nodes: Vec<BlockHandle>,
    edges: Vec<Edge>,
    output_edges: Vec<OutputEdge>,
    bindings: Vec<ModBinding>,
    master_volume: f32,
    frozen: bool,
    // Filled by freeze().
    order: Vec<usize>,
    control_order: Vec<usize>,
    audio_order: Vec<usize>,
    sorted_edges: Vec<Edge>,
    incoming: Vec<(usize, usize)>,
    connected: Vec<[bool; MAX_INPUTS]>,
    outputs: Vec<f32>,
}

impl SignalPath {
    /// Create an empty, unfrozen path.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            store: BlockStore::new(sample_rate),
            nodes: Vec::new(),
            edges: Vec::new(),
            output_edges: Vec::new(),
            bindings: Vec::new(),
            master_volume: 1.0,
            frozen: false,
            order: Vec::new(),
            control_order: Vec::new(),
            audio_order: Vec::new(),
            sorted_edges: Vec::new(),
            incoming: Vec::new(),
            connected: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Sample rate of every block in the path.
    pub fn sample_rate(&self) -> f32 {
        self.store.sample_rate()
    }

    /// Append a block and return its node index.
    pub fn add_block(&mut self, kind: BlockKind) -> Result<usize, PathError> {
        if self.frozen {
            return Err(PathError::Frozen);
        }
        let handle = self.store.add(kind);
        self.nodes.push(handle);
        Ok(self.nodes.len() - 1)
    }

    /// Route `src`'s output port into `dst`'s input port.
    pub fn connect(
        &mut self,
        src: usize,
        src_port: usize,
        dst: usize,
        dst_port: usize,
        gain: f32,
    ) -> Result<(), PathError> {
        if self.frozen {
            return Err(PathError::Frozen);
        }
        let src_kind = self.kind(src)?;
        let dst_kind = self.kind(dst)?;
        if src_port >= src_kind.output_count() {
            return Err(PathError::InvalidPort {
                kind: src_kind,
                port: src_port,
            });
        }
        if dst_port >= dst_kind.input_count() {
            return Err(PathError::InvalidPort {
                kind: dst_kind,
                port: dst_port,
            });
        }
        self.edges.push(Edge {
            src,
            src_port,
            dst,
            dst_port,
            gain,
        });
        Ok(())
    }

    /// Route `src`'s output into the path output.
    pub fn connect_output(&mut self, src: usize, gain: f32) -> Result<(), PathError> {
        if self.frozen {
            return Err(PathError::Frozen);
        }
        self.kind(src)?;
        self.output_edges.push(OutputEdge { src, gain });
        Ok(())
    }

    /// Drive `param` of `node` from `destination` every tick.
    ///
    /// The parameter's current value becomes the unmodulated base.
    pub fn bind(
        &mut self,
        node: usize,
        param: Param,
        destination: ModDestination,
    ) -> Result<(), PathError> {
        if self.frozen {
            return Err(PathError::Frozen);
        }
        let base = self.store.param(self.handle(node)?, param)?;
        self.bindings.push(ModBinding {
            node,
            param,
            destination,
            base,
        });
        Ok(())
    }

    /// Sort the routing topologically and lock it.
    ///
    /// Fails with [`PathError::CycleDetected`] if the routing has a cycle and
    /// [`PathError::NoOutput`] if nothing reaches the path output.
    pub fn freeze(&mut self) -> Result<(), PathError> {
        if self.frozen {
            return Ok(());
        }
        if self.output_edges.is_empty() {
            return Err(PathError::NoOutput);
        }
        let order = self.kahn_sort()?;
        let n = self.nodes.len();

        let mut sorted_edges = self.edges.clone();
        sorted_edges.sort_by_key(|e| e.dst);
        let mut incoming = vec![(0, 0); n];
        let mut connected = vec![[false; MAX_INPUTS]; n];
        let mut start = 0;
        for (node, range) in incoming.iter_mut().enumerate() {
            let end = start + sorted_edges[start..].iter().take_while(|e| e.dst == node).count();
            *range = (start, end);
            for edge in &sorted_edges[start..end] {
                connected[node][edge.dst_port] = true;
            }
            start = end;
        }

        self.control_order = (0..n)
            .filter(|&i| self.nodes[i].kind().is_control())
            .collect();
        self.audio_order = order
            .iter()
            .copied()
            .filter(|&i| !self.nodes[i].kind().is_control())
            .collect();
        self.order = order;
        self.sorted_edges = sorted_edges;
        self.incoming = incoming;
        self.connected = connected;
        self.outputs = vec![0.0; n];
        self.frozen = true;
        Ok(())
    }

    /// Kahn's algorithm over the routing graph.
    ///
    /// Ties are broken by declared order, so an already-sorted list is kept.
    fn kahn_sort(&self) -> Result<Vec<usize>, PathError> {
        let n = self.nodes.len();
        let mut in_degree = vec![0u32; n];
        for edge in &self.edges {
            in_degree[edge.dst] += 1;
        }

        // Reversed so that pop() yields the lowest index first.
        let mut queue: Vec<usize> = (0..n).rev().filter(|&i| in_degree[i] == 0).collect();
        let mut sorted = Vec::with_capacity(n);

        while let Some(idx) = queue.pop() {
            sorted.push(idx);
            let mut ready = Vec::new();
            for edge in self.edges.iter().filter(|e| e.src == idx) {
                in_degree[edge.dst] -= 1;
                if in_degree[edge.dst] == 0 {
                    ready.push(edge.dst);
                }
            }
            ready.sort_unstable_by(|a, b| b.cmp(a));
            ready.dedup();
            queue.extend(ready);
        }

        if sorted.len() != n {
            return Err(PathError::CycleDetected);
        }
        Ok(sorted)
    }

    /// Whether the routing is frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Topological order of every node. Empty until frozen.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the path has no blocks.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Routing edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Output edges in insertion order.
    pub fn output_edges(&self) -> &[OutputEdge] {
        &self.output_edges
    }

    /// Handle of the block at `node`.
    pub fn handle(&self, node: usize) -> Result<BlockHandle, PathError> {
        self.nodes
            .get(node)
            .copied()
            .ok_or(PathError::UnknownBlock(node))
    }

    fn kind(&self, node: usize) -> Result<BlockKind, PathError> {
        self.handle(node).map(BlockHandle::kind)
    }

    /// Node index of the `nth` block of `kind`, in declared order.
    pub fn node(&self, kind: BlockKind, nth: usize) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, h)| h.kind() == kind)
            .nth(nth)
            .map(|(i, _)| i)
    }

    /// The block storage.
    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    /// Set a block parameter, clamped to its range.
    ///
    /// Also moves the unmodulated base of any binding on that parameter.
    /// Returns `Ok(true)` when the value was clamped.
    pub fn set_param(&mut self, node: usize, param: Param, value: f32) -> Result<bool, PathError> {
        let handle = self.handle(node)?;
        let clamped = self.store.set_param(handle, param, value)?;
        self.sync_binding_base(node, param);
        Ok(clamped)
    }

    /// Current value of a block parameter.
    ///
    /// For a bound parameter this is the value written by the last tick.
    pub fn param(&self, node: usize, param: Param) -> Result<f32, PathError> {
        self.store.param(self.handle(node)?, param)
    }

    /// Unmodulated base of a bound parameter.
    pub fn base_param(&self, node: usize, param: Param) -> Option<f32> {
        self.bindings
            .iter()
            .find(|b| b.node == node && b.param == param)
            .map(|b| b.base)
    }

    fn sync_binding_base(&mut self, node: usize, param: Param) {
        let Ok(handle) = self.handle(node) else {
            return;
        };
        if let Ok(value) = self.store.param(handle, param) {
            for binding in self
                .bindings
                .iter_mut()
                .filter(|b| b.node == node && b.param == param)
            {
                binding.base = value;
            }
        }
    }

    /// Set every VCO's frequency for a note at equal temperament (A4 = 440 Hz).
    ///
    /// Each VCO rescales by its own tuning reference.
    pub fn set_note_frequency(&mut self, frequency: f32) {
        self.store.set_note_frequency(frequency);
        for i in 0..self.nodes.len() {
            if self.nodes[i].kind() == BlockKind::Vco {
                self.sync_binding_base(i, Param::Frequency);
            }
        }
    }

    /// Apply absolute cutoff limits to every filter.
    pub fn set_cutoff_limits(&mut self, min_hz: f32, max_hz: f32) {
        self.store.set_cutoff_limits(min_hz, max_hz);
    }

    /// Set the output scale.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    /// Output scale.
    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Open every envelope.
    pub fn gate_on(&mut self) {
        self.store.gate_on();
    }

    /// Close every envelope.
    pub fn gate_off(&mut self) {
        self.store.gate_off();
    }

    /// The amplitude envelope: the first ADSR in declared order.
    pub fn amp_envelope(&self) -> Option<&AdsrEnvelope> {
        self.store.adsr(0)
    }

    /// Output of `node` from the most recent tick.
    pub fn last_output(&self, node: usize) -> f32 {
        self.outputs.get(node).copied().unwrap_or(0.0)
    }

    /// Clear all block state and cached outputs.
    pub fn reset(&mut self) {
        self.store.reset();
        self.outputs.iter_mut().for_each(|o| *o = 0.0);
    }

    /// Produce one output sample.
    ///
    /// `sources` is this voice's modulation table. Globals must already be
    /// copied in; the control blocks fill in the per-voice entries. An
    /// unfrozen path outputs silence.
    #[inline]
    pub fn tick(&mut self, matrix: &ModulationMatrix, sources: &mut ModulationValues) -> f32 {
        if !self.frozen {
            return 0.0;
        }

        let mut lfos = 0;
        let mut envs = 0;
        for &node in &self.control_order {
            let handle = self.nodes[node];
            let out = self.store.tick(handle, &[0.0; MAX_INPUTS]);
            self.outputs[node] = out;
            match handle.kind() {
                BlockKind::Lfo => {
                    match lfos {
                        0 => sources.lfo1 = out,
                        1 => sources.lfo2 = out,
                        _ => {}
                    }
                    lfos += 1;
                }
                BlockKind::Adsr => {
                    match envs {
                        0 => sources.amp_env = out,
                        1 => sources.filter_env = out,
                        _ => {}
                    }
                    envs += 1;
                }
                _ => {}
            }
        }

        let sums = matrix.sums(sources);
        for binding in &self.bindings {
            let mut sum = sums.get(binding.destination);
            if binding.destination.is_pitch() {
                sum += sources.pitch_bend;
            }
            let value = matrix.apply(binding.destination, binding.base, sum);
            self.store
                .write_param(self.nodes[binding.node], binding.param, value);
        }

        for &node in &self.audio_order {
            let handle = self.nodes[node];
            let kind = handle.kind();
            let mut inputs = [0.0; MAX_INPUTS];
            for (port, input) in inputs.iter_mut().enumerate() {
                if !self.connected[node][port] {
                    *input = kind.default_input(port);
                }
            }
            let (start, end) = self.incoming[node];
            for edge in &self.sorted_edges[start..end] {
                inputs[edge.dst_port] += self.outputs[edge.src] * edge.gain;
            }
            self.outputs[node] = self.store.tick(handle, &inputs);
        }

        let mut out = 0.0;
        for edge in &self.output_edges {
            out += self.outputs[edge.src] * edge.gain;
        }
        out * self.master_volume
    }
}
