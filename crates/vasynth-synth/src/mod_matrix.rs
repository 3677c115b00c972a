//! Modulation matrix for per-sample parameter routing.
//!
//! A matrix holds up to `capacity` routes `{source, destination, amount,
//! active}`. Each sample, [`ModulationMatrix::sums`] makes one pass over the
//! routes and reads each active route's source exactly once, producing the
//! summed modulation for every destination. [`ModulationMatrix::apply`] then
//! composes a sum into a base value according to the destination:
//!
//! | Destination | Composition |
//! |-------------|-------------|
//! | oscillator pitch | `base · 2^sum` (sum in octaves) |
//! | filter cutoff | `clamp(base · (1 + sum), f_min, f_max)` |
//! | LFO rate | `base · (1 + sum)` |
//! | levels, gain, resonance, pulse width, FM depth | `base + sum` |
//!
//! Blocks clamp the composed value to their own parameter ranges.

use alloc::vec::Vec;

use crate::error::SynthError;

/// Modulation source identifiers.
///
/// The numeric index is the value stored in preset files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModSourceId {
    /// LFO 1 (per voice, -1 to 1)
    Lfo1,
    /// LFO 2 (per voice, -1 to 1)
    Lfo2,
    /// Amplitude envelope (per voice, 0 to 1)
    AmpEnv,
    /// Filter envelope (per voice, 0 to 1)
    FilterEnv,
    /// Note-on velocity (per voice, 0 to 1)
    Velocity,
    /// Polyphonic aftertouch (per voice, 0 to 1)
    Aftertouch,
    /// Mod wheel, CC1 (global, 0 to 1)
    ModWheel,
    /// Pitch bend in octaves (global)
    PitchBend,
    /// 1 while the voice's key is held (per voice)
    Gate,
    /// Channel pressure or breath, CC2 (global, 0 to 1)
    Pressure,
    /// Expression, CC11 (global, 0 to 1)
    Expression,
    /// Channel volume, CC7 (global, 0 to 1)
    Volume,
    /// Note number relative to middle C (per voice, -1 to 1)
    KeyTrack,
}

impl ModSourceId {
    /// Every source, in index order.
    pub const ALL: [ModSourceId; 13] = [
        ModSourceId::Lfo1,
        ModSourceId::Lfo2,
        ModSourceId::AmpEnv,
        ModSourceId::FilterEnv,
        ModSourceId::Velocity,
        ModSourceId::Aftertouch,
        ModSourceId::ModWheel,
        ModSourceId::PitchBend,
        ModSourceId::Gate,
        ModSourceId::Pressure,
        ModSourceId::Expression,
        ModSourceId::Volume,
        ModSourceId::KeyTrack,
    ];

    /// Numeric index used by preset files.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Source for a preset index, if known.
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Modulation destination identifiers.
///
/// The numeric index is the value stored in preset files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModDestination {
    /// Oscillator 1 pitch
    Osc1Pitch,
    /// Oscillator 2 pitch
    Osc2Pitch,
    /// Oscillator 1 level
    Osc1Level,
    /// Oscillator 2 level
    Osc2Level,
    /// Pulse width of every oscillator
    PulseWidth,
    /// FM depth of every oscillator
    FmDepth,
    /// Filter cutoff frequency
    FilterCutoff,
    /// Filter resonance
    FilterResonance,
    /// Amplifier gain
    Amplitude,
    /// LFO 1 rate
    Lfo1Rate,
    /// LFO 2 rate
    Lfo2Rate,
}

impl ModDestination {
    /// Number of destinations.
    pub const COUNT: usize = 11;

    /// Every destination, in index order.
    pub const ALL: [ModDestination; Self::COUNT] = [
        ModDestination::Osc1Pitch,
        ModDestination::Osc2Pitch,
        ModDestination::Osc1Level,
        ModDestination::Osc2Level,
        ModDestination::PulseWidth,
        ModDestination::FmDepth,
        ModDestination::FilterCutoff,
        ModDestination::FilterResonance,
        ModDestination::Amplitude,
        ModDestination::Lfo1Rate,
        ModDestination::Lfo2Rate,
    ];

    /// Numeric index used by preset files.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Destination for a preset index, if known.
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Whether the destination composes in octaves.
    pub fn is_pitch(self) -> bool {
        matches!(self, ModDestination::Osc1Pitch | ModDestination::Osc2Pitch)
    }

    #[inline]
    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// A single modulation route.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModulationRoute {
    /// Source of modulation
    pub source: ModSourceId,
    /// Destination parameter
    pub destination: ModDestination,
    /// Modulation amount (-1.0 to 1.0, negative inverts)
    pub amount: f32,
    /// Inactive routes contribute nothing
    pub active: bool,
}

impl ModulationRoute {
    /// Create an active route. The amount is clamped to [-1, 1].
    pub fn new(source: ModSourceId, destination: ModDestination, amount: f32) -> Self {
        Self {
            source,
            destination,
            amount: clamp_amount(amount).0,
            active: true,
        }
    }

    /// Builder-style activity flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Clamp a route amount to [-1, 1]; NaN becomes 0. Returns `(value, clamped)`.
pub(crate) fn clamp_amount(amount: f32) -> (f32, bool) {
    if amount.is_nan() {
        (0.0, true)
    } else {
        let clamped = amount.clamp(-1.0, 1.0);
        (clamped, clamped != amount)
    }
}

/// Current modulation source values.
///
/// Global fields are written by the event frontend; per-voice fields are
/// written by each voice before its blocks tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModulationValues {
    /// LFO 1 value (-1 to 1)
    pub lfo1: f32,
    /// LFO 2 value (-1 to 1)
    pub lfo2: f32,
    /// Amplitude envelope value (0 to 1)
    pub amp_env: f32,
    /// Filter envelope value (0 to 1)
    pub filter_env: f32,
    /// Velocity (0 to 1)
    pub velocity: f32,
    /// Polyphonic aftertouch (0 to 1)
    pub aftertouch: f32,
    /// Mod wheel (0 to 1)
    pub mod_wheel: f32,
    /// Pitch bend in octaves
    pub pitch_bend: f32,
    /// Gate (0 or 1)
    pub gate: f32,
    /// Channel pressure or breath (0 to 1)
    pub pressure: f32,
    /// Expression (0 to 1)
    pub expression: f32,
    /// Channel volume (0 to 1)
    pub volume: f32,
    /// Key tracking (-1 to 1, centered at middle C)
    pub key_track: f32,
}

impl ModulationValues {
    /// Create new modulation values with all sources at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get value for a specific source.
    pub fn get(&self, source: ModSourceId) -> f32 {
        match source {
            ModSourceId::Lfo1 => self.lfo1,
            ModSourceId::Lfo2 => self.lfo2,
            ModSourceId::AmpEnv => self.amp_env,
            ModSourceId::FilterEnv => self.filter_env,
            ModSourceId::Velocity => self.velocity,
            ModSourceId::Aftertouch => self.aftertouch,
            ModSourceId::ModWheel => self.mod_wheel,
            ModSourceId::PitchBend => self.pitch_bend,
            ModSourceId::Gate => self.gate,
            ModSourceId::Pressure => self.pressure,
            ModSourceId::Expression => self.expression,
            ModSourceId::Volume => self.volume,
            ModSourceId::KeyTrack => self.key_track,
        }
    }

    /// Set value for a specific source.
    pub fn set(&mut self, source: ModSourceId, value: f32) {
        match source {
            ModSourceId::Lfo1 => self.lfo1 = value,
            ModSourceId::Lfo2 => self.lfo2 = value,
            ModSourceId::AmpEnv => self.amp_env = value,
            ModSourceId::FilterEnv => self.filter_env = value,
            ModSourceId::Velocity => self.velocity = value,
            ModSourceId::Aftertouch => self.aftertouch = value,
            ModSourceId::ModWheel => self.mod_wheel = value,
            ModSourceId::PitchBend => self.pitch_bend = value,
            ModSourceId::Gate => self.gate = value,
            ModSourceId::Pressure => self.pressure = value,
            ModSourceId::Expression => self.expression = value,
            ModSourceId::Volume => self.volume = value,
            ModSourceId::KeyTrack => self.key_track = value,
        }
    }

    /// Copy the global (frontend-written) sources from `globals`.
    #[inline]
    pub fn copy_globals(&mut self, globals: &ModulationValues) {
        self.mod_wheel = globals.mod_wheel;
        self.pitch_bend = globals.pitch_bend;
        self.pressure = globals.pressure;
        self.expression = globals.expression;
        self.volume = globals.volume;
    }

    /// Set key tracking from MIDI note number.
    ///
    /// Centers at middle C (note 60), ranges from -1 to 1.
    pub fn set_key_track_from_note(&mut self, note: u8) {
        self.key_track = ((note as f32 - 60.0) / 60.0).clamp(-1.0, 1.0);
    }
}

/// Summed modulation per destination for one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModulationSums([f32; ModDestination::COUNT]);

impl ModulationSums {
    /// Sum for `destination`.
    #[inline]
    pub fn get(&self, destination: ModDestination) -> f32 {
        self.0[destination as usize]
    }
}

/// Modulation matrix with a fixed number of routing slots.
///
/// The capacity is set at construction; routes are stored inline in a
/// preallocated buffer that never grows.
///
/// # Example
///
/// ```rust
/// use vasynth_synth::{ModDestination, ModSourceId, ModulationMatrix, ModulationRoute, ModulationValues};
///
/// let mut matrix = ModulationMatrix::new(8);
/// matrix
///     .add_route(ModulationRoute::new(ModSourceId::Lfo1, ModDestination::FilterCutoff, 0.3))
///     .unwrap();
///
/// let mut values = ModulationValues::new();
/// values.lfo1 = 1.0;
/// let cutoff = matrix.evaluate(ModDestination::FilterCutoff, 2000.0, &values);
/// assert!((cutoff - 2600.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct ModulationMatrix {
    routes: Vec<ModulationRoute>,
    capacity: usize,
    /// Destinations with at least one active route.
    active_mask: u32,
    cutoff_min: f32,
    cutoff_max: f32,
}

impl ModulationMatrix {
    /// Default absolute cutoff limits in Hz.
    pub const DEFAULT_CUTOFF_LIMITS: (f32, f32) = (20.0, 20000.0);

    /// Create an empty matrix holding at most `capacity` routes.
    pub fn new(capacity: usize) -> Self {
        Self {
            routes: Vec::with_capacity(capacity),
            capacity,
            active_mask: 0,
            cutoff_min: Self::DEFAULT_CUTOFF_LIMITS.0,
            cutoff_max: Self::DEFAULT_CUTOFF_LIMITS.1,
        }
    }

    /// Set the absolute limits applied to modulated cutoff.
    pub fn set_cutoff_limits(&mut self, min_hz: f32, max_hz: f32) {
        self.cutoff_min = min_hz.min(max_hz);
        self.cutoff_max = max_hz.max(min_hz);
    }

    /// Absolute cutoff limits `(min, max)` in Hz.
    pub fn cutoff_limits(&self) -> (f32, f32) {
        (self.cutoff_min, self.cutoff_max)
    }

    /// Add a route, returning its index.
    pub fn add_route(&mut self, route: ModulationRoute) -> Result<usize, SynthError> {
        if self.routes.len() >= self.capacity {
            return Err(SynthError::MatrixFull {
                capacity: self.capacity,
            });
        }
        let route = ModulationRoute {
            amount: clamp_amount(route.amount).0,
            ..route
        };
        self.routes.push(route);
        self.update_mask();
        Ok(self.routes.len() - 1)
    }

    /// Remove a route by index. Later routes shift down.
    pub fn remove_route(&mut self, index: usize) -> Option<ModulationRoute> {
        if index >= self.routes.len() {
            return None;
        }
        let route = self.routes.remove(index);
        self.update_mask();
        Some(route)
    }

    /// Clear all routes.
    pub fn clear(&mut self) {
        self.routes.clear();
        self.active_mask = 0;
    }

    /// Replace every route with `routes`, keeping at most `capacity`.
    ///
    /// Returns the number of routes that did not fit.
    pub fn replace_routes(&mut self, routes: &[ModulationRoute]) -> usize {
        self.routes.clear();
        let fit = routes.len().min(self.capacity);
        for route in &routes[..fit] {
            self.routes.push(ModulationRoute {
                amount: clamp_amount(route.amount).0,
                ..*route
            });
        }
        self.update_mask();
        routes.len() - fit
    }

    /// Set a route's amount, clamped to [-1, 1].
    ///
    /// Returns `Some(true)` if the amount was clamped, `None` for a bad index.
    pub fn set_amount(&mut self, index: usize, amount: f32) -> Option<bool> {
        let route = self.routes.get_mut(index)?;
        let (value, clamped) = clamp_amount(amount);
        route.amount = value;
        Some(clamped)
    }

    /// Enable or disable a route. Returns `false` for a bad index.
    pub fn set_active(&mut self, index: usize, active: bool) -> bool {
        let Some(route) = self.routes.get_mut(index) else {
            return false;
        };
        route.active = active;
        self.update_mask();
        true
    }

    /// Get number of routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Number of active routes.
    pub fn active_route_count(&self) -> usize {
        self.routes.iter().filter(|r| r.active).count()
    }

    /// Get maximum number of routes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get a route by index.
    pub fn get_route(&self, index: usize) -> Option<&ModulationRoute> {
        self.routes.get(index)
    }

    /// Iterate over all routes.
    pub fn iter(&self) -> impl Iterator<Item = &ModulationRoute> {
        self.routes.iter()
    }

    /// Whether any active route targets `destination`.
    #[inline]
    pub fn is_modulated(&self, destination: ModDestination) -> bool {
        self.active_mask & destination.bit() != 0
    }

    /// Sum of `amount · source` over active routes targeting `destination`.
    pub fn modulation(&self, destination: ModDestination, sources: &ModulationValues) -> f32 {
        if !self.is_modulated(destination) {
            return 0.0;
        }
        self.routes
            .iter()
            .filter(|r| r.active && r.destination == destination)
            .map(|r| r.amount * sources.get(r.source))
            .sum()
    }

    /// Sums for every destination in one pass over the routes.
    #[inline]
    pub fn sums(&self, sources: &ModulationValues) -> ModulationSums {
        let mut sums = ModulationSums::default();
        if self.active_mask == 0 {
            return sums;
        }
        for route in &self.routes {
            if route.active {
                sums.0[route.destination as usize] += route.amount * sources.get(route.source);
            }
        }
        sums
    }

    /// Compose a summed modulation into `base` for `destination`.
    #[inline]
    pub fn apply(&self, destination: ModDestination, base: f32, sum: f32) -> f32 {
        match destination {
            ModDestination::Osc1Pitch | ModDestination::Osc2Pitch => {
                if sum == 0.0 {
                    base
                } else {
                    base * libm::exp2f(sum)
                }
            }
            ModDestination::FilterCutoff => {
                (base * (1.0 + sum)).clamp(self.cutoff_min, self.cutoff_max)
            }
            ModDestination::Lfo1Rate | ModDestination::Lfo2Rate => base * (1.0 + sum),
            ModDestination::Osc1Level
            | ModDestination::Osc2Level
            | ModDestination::PulseWidth
            | ModDestination::FmDepth
            | ModDestination::FilterResonance
            | ModDestination::Amplitude => base + sum,
        }
    }

    /// Modulated value of `destination` for base value `base`.
    pub fn evaluate(
        &self,
        destination: ModDestination,
        base: f32,
        sources: &ModulationValues,
    ) -> f32 {
        self.apply(destination, base, self.modulation(destination, sources))
    }

    fn update_mask(&mut self) {
        self.active_mask = self
            .routes
            .iter()
            .filter(|r| r.active)
            .fold(0, |mask, r| mask | r.destination.bit());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lfo_to_cutoff(amount: f32) -> ModulationRoute {
        ModulationRoute::new(ModSourceId::Lfo1, ModDestination::FilterCutoff, amount)
    }

    #[test]
    fn route_amount_is_clamped() {
        assert_eq!(lfo_to_cutoff(3.0).amount, 1.0);
        assert_eq!(lfo_to_cutoff(-3.0).amount, -1.0);
        assert_eq!(clamp_amount(f32::NAN), (0.0, true));
    }

    #[test]
    fn add_route_respects_capacity() {
        let mut matrix = ModulationMatrix::new(2);
        assert_eq!(matrix.add_route(lfo_to_cutoff(0.1)), Ok(0));
        assert_eq!(matrix.add_route(lfo_to_cutoff(0.2)), Ok(1));
        assert_eq!(
            matrix.add_route(lfo_to_cutoff(0.3)),
            Err(SynthError::MatrixFull { capacity: 2 })
        );
        assert_eq!(matrix.route_count(), 2);
    }

    #[test]
    fn remove_route_shifts_down() {
        let mut matrix = ModulationMatrix::new(4);
        matrix.add_route(lfo_to_cutoff(0.5)).unwrap();
        matrix
            .add_route(ModulationRoute::new(ModSourceId::Lfo2, ModDestination::Osc2Pitch, 0.3))
            .unwrap();

        let removed = matrix.remove_route(0).unwrap();
        assert_eq!(removed.source, ModSourceId::Lfo1);
        assert_eq!(matrix.get_route(0).unwrap().source, ModSourceId::Lfo2);
        assert!(!matrix.is_modulated(ModDestination::FilterCutoff));
        assert!(matrix.remove_route(5).is_none());
    }

    #[test]
    fn modulation_sums_active_routes() {
        let mut matrix = ModulationMatrix::new(4);
        matrix.add_route(lfo_to_cutoff(0.5)).unwrap();
        matrix
            .add_route(ModulationRoute::new(ModSourceId::FilterEnv, ModDestination::FilterCutoff, 0.3))
            .unwrap();

        let mut values = ModulationValues::new();
        values.lfo1 = 1.0;
        values.filter_env = 0.5;

        let sum = matrix.modulation(ModDestination::FilterCutoff, &values);
        assert!((sum - 0.65).abs() < 1e-6, "Expected 0.65, got {sum}");
        assert_eq!(matrix.sums(&values).get(ModDestination::FilterCutoff), sum);

        matrix.set_active(1, false);
        let sum = matrix.modulation(ModDestination::FilterCutoff, &values);
        assert!((sum - 0.5).abs() < 1e-6);
    }

    #[test]
    fn set_amount_reports_clamp() {
        let mut matrix = ModulationMatrix::new(1);
        matrix.add_route(lfo_to_cutoff(0.5)).unwrap();
        assert_eq!(matrix.set_amount(0, 0.25), Some(false));
        assert_eq!(matrix.set_amount(0, 1.5), Some(true));
        assert_eq!(matrix.get_route(0).unwrap().amount, 1.0);
        assert_eq!(matrix.set_amount(3, 0.0), None);
    }

    #[test]
    fn pitch_composes_in_octaves() {
        let matrix = ModulationMatrix::new(1);
        assert_eq!(matrix.apply(ModDestination::Osc1Pitch, 440.0, 0.0), 440.0);
        assert!((matrix.apply(ModDestination::Osc1Pitch, 440.0, 1.0) - 880.0).abs() < 1e-3);
        assert!((matrix.apply(ModDestination::Osc2Pitch, 440.0, -1.0) - 220.0).abs() < 1e-3);
    }

    #[test]
    fn cutoff_composes_linearly_with_clamp() {
        let mut matrix = ModulationMatrix::new(1);
        matrix.set_cutoff_limits(100.0, 5000.0);
        assert!((matrix.apply(ModDestination::FilterCutoff, 2000.0, 0.3) - 2600.0).abs() < 1e-3);
        assert!((matrix.apply(ModDestination::FilterCutoff, 2000.0, -0.3) - 1400.0).abs() < 1e-3);
        assert_eq!(matrix.apply(ModDestination::FilterCutoff, 2000.0, 4.0), 5000.0);
        assert_eq!(matrix.apply(ModDestination::FilterCutoff, 2000.0, -1.0), 100.0);
    }

    #[test]
    fn gain_composes_additively() {
        let matrix = ModulationMatrix::new(1);
        assert!((matrix.apply(ModDestination::Amplitude, 0.5, 0.25) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn unmodulated_destination_is_untouched() {
        let matrix = ModulationMatrix::new(4);
        let values = ModulationValues::new();
        assert_eq!(matrix.evaluate(ModDestination::FilterCutoff, 1234.0, &values), 1234.0);
        assert_eq!(matrix.sums(&values), ModulationSums::default());
    }

    #[test]
    fn replace_routes_truncates_to_capacity() {
        let mut matrix = ModulationMatrix::new(2);
        let routes = [lfo_to_cutoff(0.1), lfo_to_cutoff(0.2), lfo_to_cutoff(0.3)];
        assert_eq!(matrix.replace_routes(&routes), 1);
        assert_eq!(matrix.route_count(), 2);
    }

    #[test]
    fn index_round_trip() {
        for s in ModSourceId::ALL {
            assert_eq!(ModSourceId::from_index(i64::from(s.index())), Some(s));
        }
        for d in ModDestination::ALL {
            assert_eq!(ModDestination::from_index(i64::from(d.index())), Some(d));
        }
        assert_eq!(ModSourceId::from_index(99), None);
    }

    #[test]
    fn key_track_centers_on_middle_c() {
        let mut values = ModulationValues::new();
        values.set_key_track_from_note(60);
        assert_eq!(values.key_track, 0.0);
        values.set_key_track_from_note(72);
        assert!(values.key_track > 0.0);
    }
}
