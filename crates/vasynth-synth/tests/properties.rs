//! Property tests for pool, matrix and routing invariants.

use std::sync::Arc;

use proptest::prelude::*;
use vasynth_synth::{
    AllocationMode, BlockKind, Diagnostics, EngineConfig, MidiDecoder, ModDestination,
    ModSourceId, ModulationMatrix, ModulationRoute, ModulationValues, PathError, SignalPath,
    StealingMode, VoicePool,
};

const SR: f32 = 48000.0;

#[derive(Debug, Clone)]
enum NoteEvent {
    On(u8, u8, f32),
    Off(u8, u8),
    Run(usize),
}

fn note_event() -> impl Strategy<Value = NoteEvent> {
    prop_oneof![
        (0u8..2, 48u8..72, 0.0f32..=1.0).prop_map(|(c, n, v)| NoteEvent::On(c, n, v)),
        (0u8..2, 48u8..72).prop_map(|(c, n)| NoteEvent::Off(c, n)),
        (1usize..2000).prop_map(NoteEvent::Run),
    ]
}

fn allocation() -> impl Strategy<Value = AllocationMode> {
    prop_oneof![
        Just(AllocationMode::Poly),
        Just(AllocationMode::Mono),
        Just(AllocationMode::Legato),
        Just(AllocationMode::MultiTimbral),
    ]
}

fn stealing() -> impl Strategy<Value = StealingMode> {
    prop_oneof![
        Just(StealingMode::OldestFirst),
        Just(StealingMode::QuietestFirst),
        Just(StealingMode::LastPlayed),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Active voices never exceed capacity and the mix stays in [-1, 1].
    #[test]
    fn pool_respects_capacity_and_bounds(
        voices in 1usize..6,
        allocation in allocation(),
        stealing in stealing(),
        events in prop::collection::vec(note_event(), 1..40),
    ) {
        let config = EngineConfig {
            sample_rate: SR,
            max_voices: voices,
            allocation_mode: allocation,
            stealing_mode: stealing,
            ..EngineConfig::default()
        };
        let mut pool = VoicePool::from_config(&config, Arc::new(Diagnostics::new())).unwrap();
        for event in events {
            match event {
                NoteEvent::On(c, n, v) => pool.note_on(c, n, v),
                NoteEvent::Off(c, n) => pool.note_off(c, n),
                NoteEvent::Run(samples) => {
                    for _ in 0..samples {
                        let s = pool.tick();
                        prop_assert!(s.is_finite() && s.abs() <= 1.0);
                    }
                }
            }
            prop_assert!(pool.active_voice_count() <= pool.capacity());
            if allocation.is_monophonic() {
                prop_assert!(pool.voices()[1..].iter().all(|v| !v.is_active()));
            }
        }
    }

    /// Route amounts are clamped to [-1, 1] and the sum is bounded by the
    /// number of active routes.
    #[test]
    fn matrix_sums_are_bounded(
        routes in prop::collection::vec((0i64..13, 0i64..11, -4.0f32..4.0, any::<bool>()), 0..16),
        values in prop::collection::vec(-1.0f32..=1.0, 13),
    ) {
        let mut matrix = ModulationMatrix::new(16);
        for (s, d, amount, active) in routes {
            let route = ModulationRoute::new(
                ModSourceId::from_index(s).unwrap(),
                ModDestination::from_index(d).unwrap(),
                amount,
            )
            .with_active(active);
            matrix.add_route(route).unwrap();
        }
        prop_assert!(matrix.iter().all(|r| (-1.0..=1.0).contains(&r.amount)));

        let mut sources = ModulationValues::new();
        for (source, value) in ModSourceId::ALL.iter().zip(values) {
            sources.set(*source, value);
        }
        let sums = matrix.sums(&sources);
        let active = matrix.active_route_count() as f32;
        for dest in ModDestination::ALL {
            prop_assert!(sums.get(dest).abs() <= active + 1e-4);
        }
    }

    /// Any chain of filters freezes; closing it into a loop is rejected.
    #[test]
    fn chains_freeze_and_loops_do_not(len in 1usize..8, back in 0usize..8) {
        let mut path = SignalPath::new(SR);
        let nodes: Vec<usize> = (0..len)
            .map(|_| path.add_block(BlockKind::Vcf).unwrap())
            .collect();
        for pair in nodes.windows(2) {
            path.connect(pair[0], 0, pair[1], 0, 1.0).unwrap();
        }
        path.connect_output(nodes[len - 1], 1.0).unwrap();

        let mut looped = path.clone();
        prop_assert_eq!(path.freeze(), Ok(()));
        prop_assert_eq!(path.order(), nodes.as_slice());

        let target = back % len;
        looped.connect(nodes[len - 1], 0, nodes[target], 1, 0.5).unwrap();
        prop_assert_eq!(looped.freeze(), Err(PathError::CycleDetected));
    }

    /// Decoding never panics and only yields channel messages.
    #[test]
    fn decoder_accepts_any_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut decoder = MidiDecoder::new();
        for msg in decoder.decode(&bytes) {
            prop_assert!(msg.channel() < 16);
        }
    }
}
