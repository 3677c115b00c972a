//! Offline rendering of notes to a WAV file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use vasynth_io::{Schedule, read_wav_info, render_to_wav_with_progress};
use vasynth_synth::Engine;

use super::common::{EngineArgs, NoteSpec, display_path, initial_patch, load_bank, seconds_to_frames};

/// Release tail added after the last note when no duration is given.
const DEFAULT_TAIL_SECONDS: f64 = 1.0;

#[derive(Args)]
pub struct RenderArgs {
    /// Output WAV file
    output: PathBuf,

    /// Note as NOTE[:VELOCITY[:START[:LENGTH]]] (repeatable)
    #[arg(short, long = "note", value_name = "NOTE", default_value = "A4")]
    notes: Vec<NoteSpec>,

    /// Total length in seconds (default: last note off plus one second)
    #[arg(short, long)]
    duration: Option<f64>,

    /// Preset to load before rendering
    #[arg(short, long)]
    preset: Option<String>,

    /// Preset file merged over the factory bank
    #[arg(long, value_name = "FILE")]
    presets: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

pub fn run(args: RenderArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let engine_config = args.engine.resolve(config)?;
    let bank = load_bank(args.presets.as_deref())?;
    let patch = initial_patch(&bank, args.preset.as_deref())?;

    let sample_rate = engine_config.sample_rate;
    let (mut engine, handle) = Engine::new(engine_config)?;
    if let Some(patch) = patch {
        handle.publish_patch(patch);
    }

    let mut schedule = Schedule::new();
    for spec in &args.notes {
        schedule.note(
            spec.start_frame(sample_rate),
            spec.length_frames(sample_rate),
            0,
            spec.note,
            f32::from(spec.velocity) / 127.0,
        );
    }

    let seconds = match args.duration {
        Some(d) if d.is_finite() && d > 0.0 => d,
        Some(d) => anyhow::bail!("invalid duration {d} (expected seconds > 0)"),
        None => {
            let last = args.notes.iter().map(NoteSpec::end).fold(0.0, f64::max);
            last + DEFAULT_TAIL_SECONDS
        }
    };
    let frames = seconds_to_frames(seconds, sample_rate);

    println!("Rendering {} note(s), {seconds:.2}s", args.notes.len());
    if let Some(name) = &args.preset {
        println!("Preset: {name}");
    }

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(frames)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .context("progress bar template")?
            .progress_chars("##-"),
    );

    let written = render_to_wav_with_progress(
        &mut engine,
        &schedule,
        frames,
        &args.output,
        |position| pb.set_position(position),
    )
    .with_context(|| format!("rendering to {}", args.output.display()))?;
    pb.finish_with_message("Done");

    let info = read_wav_info(&args.output)?;
    println!(
        "Wrote {written} frames ({:.2}s, {} Hz, {} ch) to {}",
        info.duration_secs,
        info.sample_rate,
        info.channels,
        display_path(&args.output).display()
    );

    let snapshot = engine.diagnostics().snapshot();
    if snapshot.param_clamps > 0 || snapshot.voice_steals > 0 {
        tracing::info!(
            param_clamps = snapshot.param_clamps,
            voice_steals = snapshot.voice_steals,
            "render diagnostics"
        );
    }
    Ok(())
}
