//! Integration tests for vasynth-core blocks.
//!
//! Signal-level measurements across blocks: filter magnitude responses per
//! topology, oscillator pitch from zero crossings, and an oscillator, filter,
//! amplifier and envelope chain played through a full note.

use vasynth_core::{
    AdsrEnvelope, AmpResponse, Amplifier, EnvelopeState, Filter, FilterResponse, FilterTopology,
    Lfo, Oscillator, Waveform,
};

const SAMPLE_RATE: f32 = 48000.0;
const TAU: f32 = core::f32::consts::TAU;

fn generate_sine(freq_hz: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|n| 0.5 * libm::sinf(TAU * freq_hz * n as f32 / SAMPLE_RATE))
        .collect()
}

fn rms(signal: &[f32]) -> f32 {
    let sum_sq: f32 = signal.iter().map(|&s| s * s).sum();
    libm::sqrtf(sum_sq / signal.len() as f32)
}

fn to_db(linear: f32) -> f32 {
    20.0 * libm::log10f(linear.max(1e-10))
}

/// Gain in dB of `filter` at `freq_hz`, measured after the filter settles.
fn measure_response(filter: &mut Filter, freq_hz: f32) -> f32 {
    let num_samples = 9600;
    let settle = 4800;
    let input = generate_sine(freq_hz, num_samples);
    filter.reset();
    let output: Vec<f32> = input.iter().map(|&s| filter.tick(s, 0.0, 0.0)).collect();
    to_db(rms(&output[settle..]) / rms(&input[settle..]))
}

fn filter(topology: FilterTopology, response: FilterResponse, cutoff: f32) -> Filter {
    let mut f = Filter::new(SAMPLE_RATE);
    f.set_topology(topology);
    f.set_response(response);
    f.set_cutoff(cutoff);
    f.set_resonance(0.0);
    f
}

fn zero_crossings(signal: &[f32]) -> usize {
    signal
        .windows(2)
        .filter(|w| w[0] <= 0.0 && w[1] > 0.0)
        .count()
}

// ============================================================================
// Filter magnitude responses
// ============================================================================

#[test]
fn lowpass_passband_and_stopband_per_topology() {
    // (topology, minimum stopband attenuation at 8 kHz with a 1 kHz cutoff)
    let cases = [
        (FilterTopology::OnePole, -12.0),
        (FilterTopology::StateVariable, -30.0),
        (FilterTopology::Ladder, -40.0),
        (FilterTopology::Butterworth, -50.0),
    ];
    for (topology, stop_db) in cases {
        let mut f = filter(topology, FilterResponse::Lowpass, 1000.0);
        let pass = measure_response(&mut f, 100.0);
        let stop = measure_response(&mut f, 8000.0);
        assert!(pass > -1.5, "{topology:?} passband at 100 Hz: {pass:.1} dB");
        assert!(stop < stop_db, "{topology:?} stopband at 8 kHz: {stop:.1} dB");
    }
}

#[test]
fn highpass_rejects_low_frequencies() {
    for topology in [
        FilterTopology::OnePole,
        FilterTopology::StateVariable,
        FilterTopology::Butterworth,
    ] {
        let mut f = filter(topology, FilterResponse::Highpass, 2000.0);
        let low = measure_response(&mut f, 100.0);
        let high = measure_response(&mut f, 15000.0);
        assert!(low < -20.0, "{topology:?} HP at 100 Hz: {low:.1} dB");
        assert!(high > -2.0, "{topology:?} HP at 15 kHz: {high:.1} dB");
    }
}

#[test]
fn bandpass_peaks_near_cutoff() {
    let mut f = filter(FilterTopology::StateVariable, FilterResponse::Bandpass, 1000.0);
    let center = measure_response(&mut f, 1000.0);
    let below = measure_response(&mut f, 100.0);
    let above = measure_response(&mut f, 10000.0);
    assert!(center > below + 10.0, "center {center:.1} vs below {below:.1}");
    assert!(center > above + 10.0, "center {center:.1} vs above {above:.1}");
}

#[test]
fn resonant_ladder_stays_bounded_under_full_scale_input() {
    let mut f = filter(FilterTopology::Ladder, FilterResponse::Lowpass, 500.0);
    f.set_resonance(1.0);
    let mut osc = Oscillator::new(SAMPLE_RATE);
    osc.set_waveform(Waveform::Square);
    osc.set_frequency(110.0);
    for _ in 0..48000 {
        let y = f.tick(osc.tick(0.0, 0.0), 0.0, 0.0);
        assert!(y.is_finite() && y.abs() < 10.0, "ladder output {y}");
    }
}

// ============================================================================
// Oscillator pitch
// ============================================================================

#[test]
fn oscillator_pitch_matches_frequency() {
    for waveform in [Waveform::Sine, Waveform::Sawtooth, Waveform::Triangle] {
        let mut osc = Oscillator::new(SAMPLE_RATE);
        osc.set_waveform(waveform);
        osc.set_frequency(500.0);
        // Start mid-cycle so the first crossing is not on sample zero.
        osc.set_phase(1.0);
        let out: Vec<f32> = (0..48000).map(|_| osc.tick(0.0, 0.0)).collect();
        let crossings = zero_crossings(&out);
        assert!(
            (498..=502).contains(&crossings),
            "{waveform:?}: {crossings} rising crossings for 500 Hz"
        );
    }
}

#[test]
fn pitch_cv_of_one_raises_an_octave() {
    let mut osc = Oscillator::new(SAMPLE_RATE);
    osc.set_frequency(200.0);
    osc.set_phase(1.0);
    let out: Vec<f32> = (0..48000).map(|_| osc.tick(1.0, 0.0)).collect();
    let crossings = zero_crossings(&out);
    assert!((398..=402).contains(&crossings), "crossings: {crossings}");
}

#[test]
fn lfo_vibrato_keeps_oscillator_finite() {
    let mut lfo = Lfo::new(SAMPLE_RATE);
    lfo.set_rate(6.0);
    let mut osc = Oscillator::new(SAMPLE_RATE);
    osc.set_waveform(Waveform::Sawtooth);
    osc.set_frequency(440.0);
    for _ in 0..48000 {
        let cv = lfo.tick() * 0.1;
        let s = osc.tick(cv, 0.0);
        assert!(s.is_finite() && s.abs() <= Oscillator::PEAK);
    }
}

// ============================================================================
// Voice-like chain
// ============================================================================

#[test]
fn envelope_gated_chain_plays_and_falls_silent() {
    let mut osc = Oscillator::new(SAMPLE_RATE);
    let mut vcf = Filter::new(SAMPLE_RATE);
    let mut vca = Amplifier::new();
    let mut env = AdsrEnvelope::new(SAMPLE_RATE);
    osc.set_waveform(Waveform::Sawtooth);
    osc.set_frequency(220.0);
    vcf.set_cutoff(2000.0);
    env.set_attack(0.01);
    env.set_decay(0.05);
    env.set_sustain(0.6);
    env.set_release(0.1);

    let mut tick = |env: &mut AdsrEnvelope| {
        let level = env.tick();
        vca.tick(vcf.tick(osc.tick(0.0, 0.0), 0.0, level), level)
    };

    env.gate_on();
    let held: Vec<f32> = (0..9600).map(|_| tick(&mut env)).collect();
    assert_eq!(env.state(), EnvelopeState::Sustain);
    assert!(rms(&held[4800..]) > 0.05, "sustained note too quiet");

    env.gate_off();
    // release = 4800 samples
    for _ in 0..4800 {
        tick(&mut env);
    }
    assert_eq!(env.state(), EnvelopeState::Idle);
    let tail: Vec<f32> = (0..480).map(|_| tick(&mut env)).collect();
    assert!(tail.iter().all(|&s| s == 0.0), "idle chain must be silent");
}

#[test]
fn exponential_amplifier_is_quiet_at_negative_cv() {
    let mut vca = Amplifier::new();
    vca.set_response(AmpResponse::Exponential);
    let out = vca.tick(1.0, -1.0);
    assert!(to_db(out) < -59.0, "gain at -1 CV: {:.1} dB", to_db(out));
}
