//! Criterion benchmarks for vasynth-core blocks
//!
//! Run with: cargo bench -p vasynth-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use vasynth_core::{AdsrEnvelope, Filter, FilterTopology, Lfo, Oscillator, Waveform};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 256, 1024];

fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("Oscillator");

    for waveform in [Waveform::Sine, Waveform::Sawtooth, Waveform::Square] {
        for &block_size in BLOCK_SIZES {
            group.bench_with_input(
                BenchmarkId::new(waveform.name(), block_size),
                &block_size,
                |b, &n| {
                    let mut osc = Oscillator::new(SAMPLE_RATE);
                    osc.set_waveform(waveform);
                    // Low enough that all 20 harmonics are summed.
                    osc.set_frequency(110.0);
                    b.iter(|| {
                        for _ in 0..n {
                            black_box(osc.tick(black_box(0.0), 0.0));
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("Filter");

    for topology in FilterTopology::ALL {
        group.bench_function(format!("{topology:?}/256"), |b| {
            let mut vcf = Filter::new(SAMPLE_RATE);
            vcf.set_topology(topology);
            vcf.set_cutoff(1200.0);
            vcf.set_resonance(0.7);
            let mut lfo = Lfo::new(SAMPLE_RATE);
            b.iter(|| {
                for _ in 0..256 {
                    // Modulated cutoff forces the coefficient update every sample.
                    let cv = lfo.tick();
                    black_box(vcf.tick(black_box(0.3), cv, 0.0));
                }
            });
        });
    }

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    c.bench_function("AdsrEnvelope/1024", |b| {
        let mut env = AdsrEnvelope::new(SAMPLE_RATE);
        b.iter(|| {
            env.gate_on();
            for _ in 0..1024 {
                black_box(env.tick());
            }
            env.gate_off();
        });
    });
}

criterion_group!(benches, bench_oscillator, bench_filter, bench_envelope);
criterion_main!(benches);
