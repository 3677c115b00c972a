//! Live playback through an audio device.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Args;
use vasynth_io::{
    AudioBackend, BackendStreamConfig, CpalBackend, MidiInput, NullBackend, WavRecorder,
    start_playback,
};
use vasynth_synth::{Engine, EngineHandle, EventFrontend};

use super::common::{EngineArgs, NoteSpec, initial_patch, load_bank};

/// Recorder ring length in device buffers.
const RECORD_RING_BUFFERS: usize = 64;
/// Control loop poll interval.
const POLL: Duration = Duration::from_millis(5);
/// Release tail after the last scheduled note.
const TAIL_SECONDS: f64 = 1.0;

#[derive(Args)]
pub struct PlayArgs {
    /// Note as NOTE[:VELOCITY[:START[:LENGTH]]] (repeatable)
    #[arg(short, long = "note", value_name = "NOTE", conflicts_with = "midi")]
    notes: Vec<NoteSpec>,

    /// MIDI input port (index or part of the name)
    #[arg(short, long)]
    midi: Option<String>,

    /// Output device (part of the name)
    #[arg(long)]
    device: Option<String>,

    /// Render to a silent clock instead of an audio device
    #[arg(long)]
    null: bool,

    /// Also record the output to this WAV file
    #[arg(short, long, value_name = "FILE")]
    record: Option<PathBuf>,

    /// Preset to load before playing
    #[arg(short, long)]
    preset: Option<String>,

    /// Preset file merged over the factory bank
    #[arg(long, value_name = "FILE")]
    presets: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(short, long)]
    duration: Option<f64>,

    /// Device buffer size in frames
    #[arg(long, default_value = "256")]
    buffer_size: u32,

    #[command(flatten)]
    engine: EngineArgs,
}

/// A note edge due at `at` seconds after start.
struct Cue {
    at: f64,
    note: u8,
    velocity: Option<u8>,
}

fn cues(notes: &[NoteSpec]) -> Vec<Cue> {
    let mut cues: Vec<Cue> = notes
        .iter()
        .flat_map(|n| {
            [
                Cue {
                    at: n.start,
                    note: n.note,
                    velocity: Some(n.velocity),
                },
                Cue {
                    at: n.end(),
                    note: n.note,
                    velocity: None,
                },
            ]
        })
        .collect();
    cues.sort_by(|a, b| a.at.total_cmp(&b.at));
    cues
}

fn fire(handle: &mut EngineHandle, cue: &Cue) {
    let sent = match cue.velocity {
        Some(velocity) => handle.note_on(0, cue.note, velocity),
        None => handle.note_off(0, cue.note),
    };
    if !sent {
        tracing::warn!(note = cue.note, "event queue full, note event dropped");
    }
}

pub fn run(args: PlayArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let engine_config = args.engine.resolve(config)?;
    let bank = load_bank(args.presets.as_deref())?;
    let patch = initial_patch(&bank, args.preset.as_deref())?;

    let sample_rate = engine_config.sample_rate.round() as u32;
    let channels = u16::try_from(engine_config.channel_count)
        .with_context(|| format!("too many channels: {}", engine_config.channel_count))?;
    let midi_channel = engine_config.midi_channel;
    let bend_range = engine_config.pitch_bend_range;

    let (engine, mut handle) = Engine::new(engine_config)?;
    if let Some(patch) = patch {
        handle.publish_patch(patch);
    }
    let diagnostics = Arc::clone(engine.diagnostics());

    let recording = match &args.record {
        Some(path) => Some(
            WavRecorder::create(
                path,
                channels,
                sample_rate,
                args.buffer_size as usize * usize::from(channels) * RECORD_RING_BUFFERS,
                Arc::clone(&diagnostics),
            )
            .with_context(|| format!("creating {}", path.display()))?,
        ),
        None => None,
    };
    let (recorder, tap) = match recording {
        Some((recorder, tap)) => (Some(recorder), Some(tap)),
        None => (None, None),
    };

    let backend: Box<dyn AudioBackend> = if args.null {
        Box::new(NullBackend::new())
    } else {
        Box::new(CpalBackend::new())
    };
    let stream_config = BackendStreamConfig {
        sample_rate,
        buffer_size: args.buffer_size,
        channels,
        device_name: args.device.clone(),
    };
    let stream = start_playback(backend.as_ref(), &stream_config, engine, tap)?;

    let mut cues = cues(&args.notes);
    let limit = match args.duration {
        Some(d) if d.is_finite() && d > 0.0 => Some(d),
        Some(d) => anyhow::bail!("invalid duration {d} (expected seconds > 0)"),
        None if args.midi.is_none() => Some(cues.last().map_or(0.0, |c| c.at) + TAIL_SECONDS),
        None => None,
    };

    // The MIDI connection owns the handle while it is open.
    let mut control = match &args.midi {
        Some(port) => {
            let frontend = EventFrontend::new(handle, midi_channel, bend_range);
            let input = MidiInput::connect(
                port,
                frontend,
                Box::new(move |_channel, program| {
                    let patch = bank.patch_for_program(program);
                    if patch.is_none() {
                        tracing::warn!(program, "no preset for program change");
                    }
                    patch
                }),
            )?;
            println!("Listening on MIDI port: {}", input.port_name());
            Control::Midi(input)
        }
        None => Control::Handle(handle),
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    println!(
        "Playing on {} ({sample_rate} Hz, {channels} ch). Press Ctrl+C to stop.",
        backend.name()
    );

    let started = Instant::now();
    cues.reverse();
    while running.load(Ordering::SeqCst) {
        let elapsed = started.elapsed().as_secs_f64();
        if let Control::Handle(handle) = &mut control {
            while cues.last().is_some_and(|c| c.at <= elapsed) {
                if let Some(cue) = cues.pop() {
                    fire(handle, &cue);
                }
            }
        }
        if limit.is_some_and(|l| elapsed >= l) {
            break;
        }
        std::thread::sleep(POLL);
    }

    if let Control::Midi(input) = control {
        drop(input.close());
    }
    drop(stream);

    if let Some(recorder) = recorder {
        let path = recorder.path().to_path_buf();
        let frames = recorder.finish()?;
        println!("Recorded {frames} frames to {}", path.display());
    }

    let snapshot = diagnostics.snapshot();
    println!("\nDiagnostics");
    println!("===========");
    println!("  voice steals:      {}", snapshot.voice_steals);
    println!("  parameter clamps:  {}", snapshot.param_clamps);
    println!("  dropped events:    {}", snapshot.dropped_events);
    println!("  ring overflows:    {}", snapshot.ring_overflows);
    println!("  stream underflows: {}", snapshot.stream_underflows);
    Ok(())
}

/// Who feeds the engine during playback.
enum Control {
    Handle(EngineHandle),
    Midi(MidiInput),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cues_are_time_ordered() {
        let notes: Vec<NoteSpec> = ["60:100:0.5:1", "64:90:0:0.25"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let cues = cues(&notes);
        let times: Vec<f64> = cues.iter().map(|c| c.at).collect();
        assert_eq!(times, [0.0, 0.25, 0.5, 1.5]);
        assert_eq!(cues[0].velocity, Some(90));
        assert_eq!(cues[1].velocity, None);
        assert_eq!(cues[3].note, 60);
    }
}
