//! MIDI bytes in, engine events out.

use tracing::debug;

use crate::engine::{ControlEvent, EngineHandle};
use crate::midi::{MidiDecoder, MidiMessage, PITCH_BEND_CENTER};
use crate::patch::Patch;

/// Decodes a MIDI byte stream and forwards it to an [`EngineHandle`].
///
/// Runs in the control context. Program changes are handed to a callback
/// that may return a [`Patch`] to publish.
#[derive(Debug)]
pub struct EventFrontend {
    decoder: MidiDecoder,
    handle: EngineHandle,
    channel: Option<u8>,
    bend_range: f32,
}

impl EventFrontend {
    /// Wrap `handle`. `channel` filters input when set; `bend_range` is in
    /// semitones either side of center.
    pub fn new(handle: EngineHandle, channel: Option<u8>, bend_range: f32) -> Self {
        Self {
            decoder: MidiDecoder::new(),
            handle,
            channel: channel.map(|c| c & 0x0F),
            bend_range,
        }
    }

    /// The wrapped handle.
    pub fn handle(&self) -> &EngineHandle {
        &self.handle
    }

    /// Mutable access to the wrapped handle.
    pub fn handle_mut(&mut self) -> &mut EngineHandle {
        &mut self.handle
    }

    /// Give back the handle.
    pub fn into_handle(self) -> EngineHandle {
        self.handle
    }

    /// Change the channel filter.
    pub fn set_channel(&mut self, channel: Option<u8>) {
        self.channel = channel.map(|c| c & 0x0F);
    }

    /// Decode `bytes` and forward every complete message.
    ///
    /// `on_program_change(channel, program)` runs for program changes; a
    /// returned patch is published to the engine.
    pub fn feed<F>(&mut self, bytes: &[u8], mut on_program_change: F)
    where
        F: FnMut(u8, u8) -> Option<Patch>,
    {
        for &byte in bytes {
            if let Some(msg) = self.decoder.push(byte) {
                self.dispatch(msg, &mut on_program_change);
            }
        }
    }

    /// Forward one decoded message. Returns false if it was filtered out or
    /// the queue was full.
    pub fn dispatch<F>(&mut self, msg: MidiMessage, on_program_change: &mut F) -> bool
    where
        F: FnMut(u8, u8) -> Option<Patch>,
    {
        let channel = msg.channel();
        if self.channel.is_some_and(|c| c != channel) {
            return false;
        }
        debug!(?msg, "midi");

        let event = match msg {
            MidiMessage::NoteOn { note, velocity, .. } => ControlEvent::NoteOn {
                channel,
                note,
                velocity: f32::from(velocity) / 127.0,
            },
            MidiMessage::NoteOff { note, .. } => ControlEvent::NoteOff { channel, note },
            MidiMessage::PolyAftertouch { note, value, .. } => ControlEvent::PolyAftertouch {
                note,
                value: f32::from(value) / 127.0,
            },
            MidiMessage::ControlChange {
                controller, value, ..
            } => ControlEvent::ControlChange {
                channel,
                controller,
                value,
            },
            MidiMessage::ChannelPressure { value, .. } => ControlEvent::ChannelPressure {
                value: f32::from(value) / 127.0,
            },
            MidiMessage::PitchBend { value, .. } => ControlEvent::PitchBend {
                octaves: bend_to_octaves(value, self.bend_range),
            },
            MidiMessage::ProgramChange { program, .. } => {
                if let Some(patch) = on_program_change(channel, program) {
                    self.handle.publish_patch(patch);
                }
                return true;
            }
        };
        self.handle.send(event)
    }
}

/// Normalize a 14-bit bend to octaves for a range in semitones.
pub fn bend_to_octaves(value: u16, range_semitones: f32) -> f32 {
    let centered = f32::from(value.min(0x3FFF)) - f32::from(PITCH_BEND_CENTER);
    centered / f32::from(PITCH_BEND_CENTER) * range_semitones / 12.0
}
