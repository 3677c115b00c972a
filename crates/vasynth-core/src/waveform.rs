//! Waveform selection shared by the oscillator and the LFO.

/// Waveform produced by an [`Oscillator`](crate::Oscillator) or [`Lfo`](crate::Lfo).
///
/// The numeric index is the value stored in preset files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    /// Pure sine, no harmonics.
    #[default]
    Sine,
    /// Rising sawtooth, all harmonics.
    Sawtooth,
    /// Triangle, odd harmonics falling at 12 dB/oct.
    Triangle,
    /// Square or pulse, duty set by the pulse width parameter.
    Square,
    /// White noise from a seeded generator.
    Noise,
    /// Noise re-sampled and held at a trigger rate.
    SampleAndHold,
}

impl Waveform {
    /// Every waveform, in index order.
    pub const ALL: [Waveform; 6] = [
        Waveform::Sine,
        Waveform::Sawtooth,
        Waveform::Triangle,
        Waveform::Square,
        Waveform::Noise,
        Waveform::SampleAndHold,
    ];

    /// Numeric index used by preset files.
    pub fn index(self) -> u8 {
        match self {
            Waveform::Sine => 0,
            Waveform::Sawtooth => 1,
            Waveform::Triangle => 2,
            Waveform::Square => 3,
            Waveform::Noise => 4,
            Waveform::SampleAndHold => 5,
        }
    }

    /// Waveform for a preset index, if known.
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Canonical upper-case name (`SINE`, `SAWTOOTH`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "SINE",
            Waveform::Sawtooth => "SAWTOOTH",
            Waveform::Triangle => "TRIANGLE",
            Waveform::Square => "SQUARE",
            Waveform::Noise => "NOISE",
            Waveform::SampleAndHold => "SAMPLE_HOLD",
        }
    }

    /// Parse a name, case-insensitively. Accepts a few common aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let matches = |s: &str| name.eq_ignore_ascii_case(s);
        if matches("SINE") || matches("SIN") {
            Some(Waveform::Sine)
        } else if matches("SAWTOOTH") || matches("SAW") {
            Some(Waveform::Sawtooth)
        } else if matches("TRIANGLE") || matches("TRI") {
            Some(Waveform::Triangle)
        } else if matches("SQUARE") || matches("PULSE") {
            Some(Waveform::Square)
        } else if matches("NOISE") {
            Some(Waveform::Noise)
        } else if matches("SAMPLE_HOLD") || matches("SAMPLE_AND_HOLD") || matches("S&H") {
            Some(Waveform::SampleAndHold)
        } else {
            None
        }
    }
}

/// Default seed for the noise generators.
pub const DEFAULT_NOISE_SEED: u32 = 0x1234_5678;

/// Xorshift32 pseudo-random generator.
///
/// Deterministic for a given seed; the state never reaches zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoiseGenerator {
    state: u32,
    seed: u32,
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_SEED)
    }
}

impl NoiseGenerator {
    /// Create a generator. A zero seed is replaced by [`DEFAULT_NOISE_SEED`].
    pub fn new(seed: u32) -> Self {
        let seed = if seed == 0 { DEFAULT_NOISE_SEED } else { seed };
        Self { state: seed, seed }
    }

    /// Seed the generator was created with.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Restart the sequence from the seed.
    pub fn reset(&mut self) {
        self.state = self.seed;
    }

    /// Next value in [-1.0, 1.0].
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trip() {
        for w in Waveform::ALL {
            assert_eq!(Waveform::from_index(w.index() as i64), Some(w));
        }
        assert_eq!(Waveform::from_index(6), None);
        assert_eq!(Waveform::from_index(-1), None);
    }

    #[test]
    fn names_and_aliases() {
        for w in Waveform::ALL {
            assert_eq!(Waveform::from_name(w.name()), Some(w));
        }
        assert_eq!(Waveform::from_name("saw"), Some(Waveform::Sawtooth));
        assert_eq!(Waveform::from_name("Pulse"), Some(Waveform::Square));
        assert_eq!(Waveform::from_name("wobble"), None);
    }

    #[test]
    fn noise_is_deterministic_and_bounded() {
        let mut a = NoiseGenerator::new(42);
        let mut b = NoiseGenerator::new(42);
        for _ in 0..1000 {
            let x = a.next_bipolar();
            assert_eq!(x, b.next_bipolar());
            assert!((-1.0..=1.0).contains(&x));
        }
    }

    #[test]
    fn zero_seed_is_replaced() {
        let mut noise = NoiseGenerator::new(0);
        assert_eq!(noise.seed(), DEFAULT_NOISE_SEED);
        assert_ne!(noise.next_bipolar(), noise.next_bipolar());
    }
}
