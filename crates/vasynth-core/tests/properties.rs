//! Property-based tests for vasynth-core blocks.
//!
//! Filter boundedness for arbitrary parameter sequences, ADSR monotonicity
//! per stage, oscillator phase law, and tick determinism.

use proptest::prelude::*;
use vasynth_core::{
    AdsrEnvelope, EnvelopeState, Filter, FilterResponse, FilterTopology, Oscillator, Waveform,
};

const SR: f32 = 48000.0;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any topology and response, any cutoff and resonance changed every
    /// 32 samples, stays finite and bounded for bounded input.
    #[test]
    fn filter_bounded_under_parameter_sweeps(
        topology in 0i64..4,
        response in 0i64..5,
        cutoffs in prop::collection::vec(1.0f32..30000.0, 8),
        resonances in prop::collection::vec(0.0f32..=1.0, 8),
        input in prop::array::uniform32(-1.0f32..=1.0),
    ) {
        let mut filter = Filter::new(SR);
        filter.set_topology(FilterTopology::from_index(topology).unwrap());
        filter.set_response(FilterResponse::from_index(response).unwrap());

        for (cutoff, resonance) in cutoffs.iter().zip(&resonances) {
            filter.set_cutoff(*cutoff);
            filter.set_resonance(*resonance);
            for &x in &input {
                let y = filter.tick(x, 0.0, 0.0);
                prop_assert!(y.is_finite(), "non-finite output at fc={cutoff} res={resonance}");
                prop_assert!(y.abs() < 100.0, "unbounded output {y} at fc={cutoff} res={resonance}");
            }
        }
    }

    /// Level never decreases in ATTACK, never increases in DECAY or
    /// RELEASE, and equals the sustain level in SUSTAIN.
    #[test]
    fn adsr_is_monotone_per_stage(
        attack in 0.001f32..0.05,
        decay in 0.001f32..0.05,
        sustain in 0.0f32..=1.0,
        release in 0.001f32..0.05,
        hold in 0usize..3000,
    ) {
        let mut env = AdsrEnvelope::new(SR);
        env.set_attack(attack);
        env.set_decay(decay);
        env.set_sustain(sustain);
        env.set_release(release);

        env.gate_on();
        let mut prev = env.level();
        let total = hold + 3 * 2400 + 10;
        for n in 0..total {
            if n == hold {
                env.gate_off();
                prev = env.level();
            }
            let state = env.state();
            let level = env.tick();
            prop_assert!((0.0..=1.0).contains(&level), "level {level} out of range");
            match state {
                EnvelopeState::Attack => prop_assert!(level >= prev - 1e-6, "attack fell {prev} -> {level}"),
                EnvelopeState::Decay | EnvelopeState::Release => {
                    prop_assert!(level <= prev + 1e-6, "{state:?} rose {prev} -> {level}");
                }
                EnvelopeState::Sustain => prop_assert_eq!(level, sustain),
                EnvelopeState::Idle => prop_assert_eq!(level, 0.0),
            }
            prev = level;
        }
        prop_assert_eq!(env.state(), EnvelopeState::Idle);
    }

    /// Phase after N ticks equals 2π·f·N/f_s mod 2π.
    #[test]
    fn oscillator_phase_law(freq in 1.0f32..5000.0, n in 1usize..4000) {
        let mut osc = Oscillator::new(SR);
        osc.set_frequency(freq);
        for _ in 0..n {
            osc.tick(0.0, 0.0);
        }
        let tau = core::f64::consts::TAU;
        let expected = (tau * f64::from(freq) * n as f64 / f64::from(SR)).rem_euclid(tau);
        let got = f64::from(osc.phase());
        let diff = (got - expected).abs();
        let err = diff.min(tau - diff);
        prop_assert!(err < 1e-3 * (1.0 + n as f64 / 1000.0), "phase {got} expected {expected}");
    }

    /// Two oscillators with identical state and parameters produce identical
    /// output for identical inputs.
    #[test]
    fn oscillator_tick_is_deterministic(
        waveform in 0i64..6,
        freq in 20.0f32..8000.0,
        seed in any::<u32>(),
        cv in prop::collection::vec(-1.0f32..1.0, 64),
    ) {
        let mut a = Oscillator::new(SR);
        a.set_waveform(Waveform::from_index(waveform).unwrap());
        a.set_frequency(freq);
        a.set_noise_seed(seed);
        let mut b = a.clone();
        for &c in &cv {
            prop_assert_eq!(a.tick(c, 0.0).to_bits(), b.tick(c, 0.0).to_bits());
        }
        prop_assert_eq!(a.phase().to_bits(), b.phase().to_bits());
    }
}
