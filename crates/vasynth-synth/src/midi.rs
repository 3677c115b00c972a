//! MIDI 1.0 byte-stream decoding.
//!
//! [`MidiMessage::from_bytes`] parses one complete message.
//! [`MidiDecoder`] consumes an arbitrary byte stream, tracking running
//! status and skipping real-time bytes, system common messages and SysEx.

/// A decoded channel voice message. Channels are 0-15.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    /// Key pressed. Never carries velocity 0.
    NoteOn {
        /// Channel.
        channel: u8,
        /// Note number.
        note: u8,
        /// Velocity, 1-127.
        velocity: u8,
    },
    /// Key released, including note-on with velocity 0.
    NoteOff {
        /// Channel.
        channel: u8,
        /// Note number.
        note: u8,
        /// Release velocity.
        velocity: u8,
    },
    /// Polyphonic key pressure.
    PolyAftertouch {
        /// Channel.
        channel: u8,
        /// Note number.
        note: u8,
        /// Pressure.
        value: u8,
    },
    /// Controller change.
    ControlChange {
        /// Channel.
        channel: u8,
        /// Controller number.
        controller: u8,
        /// Value.
        value: u8,
    },
    /// Program change.
    ProgramChange {
        /// Channel.
        channel: u8,
        /// Program number.
        program: u8,
    },
    /// Channel pressure.
    ChannelPressure {
        /// Channel.
        channel: u8,
        /// Pressure.
        value: u8,
    },
    /// Pitch bend, 14-bit with center 0x2000.
    PitchBend {
        /// Channel.
        channel: u8,
        /// Raw bend value, 0..=0x3FFF.
        value: u16,
    },
}

/// Pitch bend center value.
pub const PITCH_BEND_CENTER: u16 = 0x2000;

impl MidiMessage {
    /// Parse a complete message starting with a status byte.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        if !(0x80..0xF0).contains(&status) || data.len() < data_len(status) {
            return None;
        }
        if data[..data_len(status)].iter().any(|&b| b & 0x80 != 0) {
            return None;
        }
        let d1 = data[0];
        let d2 = data.get(1).copied().unwrap_or(0);
        Some(Self::build(status, d1, d2))
    }

    fn build(status: u8, d1: u8, d2: u8) -> Self {
        let channel = status & 0x0F;
        match status & 0xF0 {
            0x90 if d2 > 0 => Self::NoteOn {
                channel,
                note: d1,
                velocity: d2,
            },
            0x90 | 0x80 => Self::NoteOff {
                channel,
                note: d1,
                velocity: d2,
            },
            0xA0 => Self::PolyAftertouch {
                channel,
                note: d1,
                value: d2,
            },
            0xB0 => Self::ControlChange {
                channel,
                controller: d1,
                value: d2,
            },
            0xC0 => Self::ProgramChange {
                channel,
                program: d1,
            },
            0xD0 => Self::ChannelPressure { channel, value: d1 },
            _ => Self::PitchBend {
                channel,
                value: (u16::from(d2) << 7) | u16::from(d1),
            },
        }
    }

    /// Message channel.
    pub fn channel(&self) -> u8 {
        match *self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::PolyAftertouch { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::ProgramChange { channel, .. }
            | Self::ChannelPressure { channel, .. }
            | Self::PitchBend { channel, .. } => channel,
        }
    }
}

/// Data bytes following a channel status byte.
fn data_len(status: u8) -> usize {
    match status & 0xF0 {
        0xC0 | 0xD0 => 1,
        _ => 2,
    }
}

/// Streaming decoder with running status.
#[derive(Clone, Debug, Default)]
pub struct MidiDecoder {
    running_status: Option<u8>,
    data: [u8; 2],
    len: usize,
    in_sysex: bool,
}

impl MidiDecoder {
    /// Create a decoder with no running status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget running status and any partial message.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feed one byte, returning a message when one completes.
    pub fn push(&mut self, byte: u8) -> Option<MidiMessage> {
        match byte {
            // Real-time bytes may appear anywhere and leave state untouched.
            0xF8..=0xFF => None,
            0xF0 => {
                self.in_sysex = true;
                self.running_status = None;
                self.len = 0;
                None
            }
            0xF7 => {
                self.in_sysex = false;
                None
            }
            // System common cancels running status; its data is skipped.
            0xF1..=0xF6 => {
                self.in_sysex = false;
                self.running_status = None;
                self.len = 0;
                None
            }
            0x80..=0xEF => {
                self.in_sysex = false;
                self.running_status = Some(byte);
                self.len = 0;
                None
            }
            _ => {
                if self.in_sysex {
                    return None;
                }
                let status = self.running_status?;
                self.data[self.len] = byte;
                self.len += 1;
                if self.len < data_len(status) {
                    return None;
                }
                self.len = 0;
                Some(MidiMessage::build(status, self.data[0], self.data[1]))
            }
        }
    }

    /// Decode every complete message in `bytes`.
    pub fn decode<'a>(&'a mut self, bytes: &'a [u8]) -> impl Iterator<Item = MidiMessage> + 'a {
        bytes.iter().filter_map(move |&b| self.push(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn parses_channel_messages() {
        assert_eq!(
            MidiMessage::from_bytes(&[0x91, 60, 100]),
            Some(MidiMessage::NoteOn {
                channel: 1,
                note: 60,
                velocity: 100
            })
        );
        assert_eq!(
            MidiMessage::from_bytes(&[0x90, 60, 0]),
            Some(MidiMessage::NoteOff {
                channel: 0,
                note: 60,
                velocity: 0
            })
        );
        assert_eq!(
            MidiMessage::from_bytes(&[0xC3, 5]),
            Some(MidiMessage::ProgramChange {
                channel: 3,
                program: 5
            })
        );
        assert_eq!(
            MidiMessage::from_bytes(&[0xE0, 0x00, 0x40]),
            Some(MidiMessage::PitchBend {
                channel: 0,
                value: PITCH_BEND_CENTER
            })
        );
        assert_eq!(MidiMessage::from_bytes(&[0x90, 60]), None);
        assert_eq!(MidiMessage::from_bytes(&[0xF8]), None);
        assert_eq!(MidiMessage::from_bytes(&[]), None);
    }

    #[test]
    fn pitch_bend_extremes() {
        assert_eq!(
            MidiMessage::from_bytes(&[0xE0, 0x7F, 0x7F]),
            Some(MidiMessage::PitchBend {
                channel: 0,
                value: 0x3FFF
            })
        );
        assert_eq!(
            MidiMessage::from_bytes(&[0xE0, 0, 0]),
            Some(MidiMessage::PitchBend {
                channel: 0,
                value: 0
            })
        );
    }

    #[test]
    fn running_status() {
        let mut dec = MidiDecoder::new();
        let msgs: Vec<_> = dec.decode(&[0x90, 60, 100, 64, 90, 67, 0]).collect();
        assert_eq!(msgs.len(), 3);
        assert_eq!(
            msgs[2],
            MidiMessage::NoteOff {
                channel: 0,
                note: 67,
                velocity: 0
            }
        );
    }

    #[test]
    fn realtime_bytes_do_not_break_messages() {
        let mut dec = MidiDecoder::new();
        let msgs: Vec<_> = dec.decode(&[0xB0, 0xF8, 74, 0xFE, 127]).collect();
        assert_eq!(
            msgs,
            [MidiMessage::ControlChange {
                channel: 0,
                controller: 74,
                value: 127
            }]
        );
    }

    #[test]
    fn sysex_is_skipped() {
        let mut dec = MidiDecoder::new();
        let msgs: Vec<_> = dec
            .decode(&[0xF0, 0x7E, 0x01, 0x02, 0xF7, 0x80, 60, 0])
            .collect();
        assert_eq!(
            msgs,
            [MidiMessage::NoteOff {
                channel: 0,
                note: 60,
                velocity: 0
            }]
        );
    }

    #[test]
    fn data_without_status_is_ignored() {
        let mut dec = MidiDecoder::new();
        assert_eq!(dec.decode(&[60, 100]).count(), 0);
        // Song position pointer cancels running status.
        let msgs: Vec<_> = dec.decode(&[0x90, 60, 1, 0xF2, 0, 0, 62, 1]).collect();
        assert_eq!(msgs.len(), 1);
    }
}
