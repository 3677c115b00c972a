//! Preset bank commands.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use vasynth_config::{PresetBank, is_factory_preset, write_preset};

use super::common::load_bank;

#[derive(Args)]
pub struct PresetsArgs {
    #[command(subcommand)]
    command: PresetsCommand,
}

#[derive(Subcommand)]
enum PresetsCommand {
    /// List presets with their program numbers
    List {
        /// Preset file merged over the factory bank
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Check that a preset file parses
    Validate {
        /// Preset file
        file: PathBuf,
    },

    /// Show one preset
    Show {
        /// Preset name
        name: String,

        /// Preset file merged over the factory bank
        #[arg(long)]
        file: Option<PathBuf>,

        /// Print as JSON instead of preset text
        #[arg(long)]
        json: bool,
    },

    /// Write the whole bank to a preset file
    Export {
        /// Destination file
        output: PathBuf,

        /// Preset file merged over the factory bank
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

pub fn run(args: PresetsArgs) -> anyhow::Result<()> {
    match args.command {
        PresetsCommand::List { file } => list_presets(file),
        PresetsCommand::Validate { file } => validate(file),
        PresetsCommand::Show { name, file, json } => show_preset(&name, file, json),
        PresetsCommand::Export { output, file } => export(output, file),
    }
}

fn list_presets(file: Option<PathBuf>) -> anyhow::Result<()> {
    let bank = load_bank(file.as_deref())?;
    println!("Presets:");
    println!("========");
    for (program, preset) in bank.iter().enumerate() {
        let origin = if is_factory_preset(&preset.name) {
            "factory"
        } else {
            "user"
        };
        println!(
            "  {program:3}  {:20} [{origin}] {}",
            preset.name, preset.description
        );
    }
    Ok(())
}

fn validate(file: PathBuf) -> anyhow::Result<()> {
    let bank = PresetBank::load(&file)
        .with_context(|| format!("validating {}", file.display()))?;
    println!("{}: {} preset(s) OK", file.display(), bank.len());
    for name in bank.names() {
        println!("  {name}");
    }
    Ok(())
}

fn show_preset(name: &str, file: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let bank = load_bank(file.as_deref())?;
    let preset = bank.require(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(preset)?);
    } else {
        let mut text = String::new();
        write_preset(preset, &mut text);
        print!("{text}");
    }
    Ok(())
}

fn export(output: PathBuf, file: Option<PathBuf>) -> anyhow::Result<()> {
    let bank = load_bank(file.as_deref())?;
    bank.save(&output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote {} preset(s) to {}", bank.len(), output.display());
    Ok(())
}
