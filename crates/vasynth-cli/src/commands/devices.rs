//! Audio output and MIDI input listing.

use vasynth_io::{list_devices, list_midi_ports};

pub fn run() -> anyhow::Result<()> {
    let devices = list_devices()?;

    println!("Audio Outputs");
    println!("=============\n");
    if devices.is_empty() {
        println!("  (none found)");
    }
    for (idx, device) in devices.iter().enumerate() {
        let marker = if device.is_default { " (default)" } else { "" };
        println!(
            "  [{idx}] {} ({} Hz, {} ch){marker}",
            device.name, device.default_sample_rate, device.channels
        );
    }

    println!("\nMIDI Inputs");
    println!("===========\n");
    match list_midi_ports() {
        Ok(ports) if ports.is_empty() => println!("  (none found)"),
        Ok(ports) => {
            for port in ports {
                println!("  [{}] {}", port.index, port.name);
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "MIDI unavailable");
            println!("  (MIDI unavailable)");
        }
    }

    println!("\nUse --device <name> and --midi <index|name> with 'vasynth play'.");
    Ok(())
}
