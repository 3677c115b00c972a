//! Audio and MIDI I/O for vasynth.
//!
//! This crate connects an [`Engine`](vasynth_synth::Engine) to the outside
//! world:
//!
//! - **Playback**: [`AudioBackend`] with [`CpalBackend`] for real devices and
//!   [`NullBackend`] for a paced render thread with no device, plus
//!   [`start_playback`] to move an engine into an output callback
//! - **Recording**: [`WavRecorder`] drains an SPSC ring filled from the audio
//!   thread and writes 16-bit PCM on its own thread
//! - **Offline render**: [`render_to_wav`] plays a [`Schedule`] of timed
//!   events through the same ring and writer
//! - **MIDI input**: [`MidiInput`] feeds live MIDI into an
//!   [`EventFrontend`](vasynth_synth::EventFrontend)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vasynth_io::{Schedule, render_to_wav};
//! use vasynth_synth::{Engine, EngineConfig};
//!
//! let (mut engine, _handle) = Engine::new(EngineConfig::default())?;
//! let mut schedule = Schedule::new();
//! schedule.note(0, 24000, 0, 69, 0.8);
//! let frames = render_to_wav(&mut engine, &schedule, 48000, "a440.wav")?;
//! ```

pub mod backend;
pub mod cpal_backend;
mod devices;
mod midi_input;
pub mod null_backend;
mod playback;
mod recorder;
mod render;
mod wav;

pub use backend::{AudioBackend, BackendStreamConfig, ErrorCallback, OutputCallback, StreamHandle};
pub use cpal_backend::CpalBackend;
pub use devices::{AudioDevice, default_output_device, list_devices};
pub use midi_input::{MidiInput, MidiPort, ProgramChangeFn, list_midi_ports};
pub use null_backend::NullBackend;
pub use playback::start_playback;
pub use recorder::{RecorderTap, WavRecorder};
pub use render::{Schedule, ScheduledEvent, render_to_wav, render_to_wav_with_progress};
pub use wav::{WavInfo, read_wav, read_wav_info, sample_to_i16};

/// Error types for audio and MIDI I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// MIDI port setup error.
    #[error("MIDI error: {0}")]
    Midi(String),

    /// Engine construction or reconfiguration failed.
    #[error("Engine error: {0}")]
    Engine(#[from] vasynth_synth::SynthError),

    /// The writer thread panicked or disappeared.
    #[error("Recorder thread failed")]
    RecorderThread,

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
