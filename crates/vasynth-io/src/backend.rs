//! Pluggable audio output abstraction.
//!
//! [`AudioBackend`] keeps the synth independent of any platform audio API.
//! Two implementations ship with the crate:
//!
//! - [`CpalBackend`](crate::CpalBackend) for real devices (ALSA, CoreAudio, WASAPI)
//! - [`NullBackend`](crate::NullBackend) for a paced thread with no device
//!
//! ```text
//!   Engine::render ──► OutputCallback ──► AudioBackend ──► device / nowhere
//!                                            │
//!                                            └─► StreamHandle (drop = stop)
//! ```
//!
//! Callbacks are boxed closures so the trait stays object-safe and the CLI can
//! choose a backend at runtime.

use crate::{AudioDevice, Result};

/// Configuration for building an output stream.
#[derive(Debug, Clone)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of interleaved output channels.
    pub channels: u16,
    /// Case-insensitive substring of the device name; `None` is the default device.
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            channels: 2,
            device_name: None,
        }
    }
}

/// Type-erased running stream.
///
/// The stream stays active while the handle exists; dropping it stops output.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wrap a backend-specific stream object, keeping it alive until drop.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Fills one interleaved output buffer (`frames * channels` samples).
///
/// Runs on the audio thread: no allocation, no locks, no I/O.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Receives a human-readable message when the stream reports an error.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Audio output backend.
pub trait AudioBackend: Send {
    /// Short backend name, e.g. `"cpal"`.
    fn name(&self) -> &str;

    /// All output-capable devices.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// The system default output device, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Start an output stream. `callback` runs once per device buffer.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// The sample rate the backend will actually run `config` at.
    fn actual_sample_rate(&self, config: &BackendStreamConfig) -> u32 {
        config.sample_rate
    }
}
