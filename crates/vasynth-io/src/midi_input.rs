//! Live MIDI input through midir.
//!
//! Incoming bytes go straight into an [`EventFrontend`] on midir's callback
//! thread, which queues events for the engine. Nothing here touches the
//! audio thread.

use midir::{Ignore, MidiInputConnection};
use vasynth_synth::{EventFrontend, Patch};

use crate::{Error, Result};

const CLIENT_NAME: &str = "vasynth";

/// An available MIDI input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiPort {
    /// Position in the host's port list.
    pub index: usize,
    /// Port name as reported by the host.
    pub name: String,
}

/// List MIDI input ports.
pub fn list_midi_ports() -> Result<Vec<MidiPort>> {
    let midi_in = midir::MidiInput::new(CLIENT_NAME).map_err(|e| Error::Midi(e.to_string()))?;
    Ok(midi_in
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| {
            midi_in
                .port_name(port)
                .ok()
                .map(|name| MidiPort { index, name })
        })
        .collect())
}

/// Program-change hook run on the MIDI thread.
pub type ProgramChangeFn = Box<dyn FnMut(u8, u8) -> Option<Patch> + Send>;

/// An open MIDI input connection. Dropping it disconnects.
pub struct MidiInput {
    connection: MidiInputConnection<EventFrontend>,
    port_name: String,
}

impl MidiInput {
    /// Connect to the port whose index equals `port`, or whose name contains
    /// it (case-insensitive), and forward everything to `frontend`.
    pub fn connect(
        port: &str,
        frontend: EventFrontend,
        mut on_program_change: ProgramChangeFn,
    ) -> Result<Self> {
        let mut midi_in =
            midir::MidiInput::new(CLIENT_NAME).map_err(|e| Error::Midi(e.to_string()))?;
        midi_in.ignore(Ignore::Sysex | Ignore::Time | Ignore::ActiveSense);

        let ports = midi_in.ports();
        let by_index = port.parse::<usize>().ok().and_then(|i| ports.get(i));
        let search = port.to_lowercase();
        let found = by_index.or_else(|| {
            ports.iter().find(|p| {
                midi_in
                    .port_name(p)
                    .is_ok_and(|n| n.to_lowercase().contains(&search))
            })
        });
        let Some(found) = found.cloned() else {
            return Err(Error::DeviceNotFound(format!(
                "no MIDI input matching '{port}'"
            )));
        };
        let port_name = midi_in
            .port_name(&found)
            .map_err(|e| Error::Midi(e.to_string()))?;

        let connection = midi_in
            .connect(
                &found,
                "vasynth-input",
                move |_timestamp, bytes, frontend: &mut EventFrontend| {
                    frontend.feed(bytes, &mut on_program_change);
                },
                frontend,
            )
            .map_err(|e| Error::Midi(e.to_string()))?;

        tracing::info!(port = %port_name, "MIDI input connected");
        Ok(Self {
            connection,
            port_name,
        })
    }

    /// Name of the connected port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Disconnect and return the frontend.
    pub fn close(self) -> EventFrontend {
        let (_, frontend) = self.connection.close();
        tracing::info!(port = %self.port_name, "MIDI input closed");
        frontend
    }
}

impl std::fmt::Debug for MidiInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiInput")
            .field("port_name", &self.port_name)
            .finish_non_exhaustive()
    }
}
