//! Device-less output backend.
//!
//! [`NullBackend`] drives the output callback from a plain thread, paced to
//! real time (or as fast as possible when pacing is off). The rendered audio
//! goes nowhere unless the callback records it. Used for headless runs and
//! tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::backend::{AudioBackend, BackendStreamConfig, ErrorCallback, OutputCallback, StreamHandle};
use crate::{AudioDevice, Error, Result};

/// Backend that renders on its own thread without a device.
#[derive(Debug, Clone)]
pub struct NullBackend {
    paced: bool,
    buffers: Arc<AtomicU64>,
}

impl NullBackend {
    /// A backend that sleeps between buffers to run at real time.
    pub fn new() -> Self {
        Self {
            paced: true,
            buffers: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A backend that renders buffers back to back.
    pub fn unpaced() -> Self {
        Self {
            paced: false,
            ..Self::new()
        }
    }

    /// Total buffers rendered by streams built from this backend.
    pub fn buffers_rendered(&self) -> u64 {
        self.buffers.load(Ordering::Relaxed)
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

struct NullStream {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for NullStream {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("null output thread panicked");
        }
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        Ok(Vec::new())
    }

    fn default_output_device(&self) -> Result<Option<AudioDevice>> {
        Ok(None)
    }

    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        mut callback: OutputCallback,
        _error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        if config.sample_rate == 0 || config.buffer_size == 0 || config.channels == 0 {
            return Err(Error::Stream(format!(
                "invalid null stream: {} Hz, {} frames, {} channels",
                config.sample_rate, config.buffer_size, config.channels
            )));
        }

        let period =
            Duration::from_secs_f64(f64::from(config.buffer_size) / f64::from(config.sample_rate));
        let len = config.buffer_size as usize * usize::from(config.channels);
        let paced = self.paced;
        let stop = Arc::new(AtomicBool::new(false));
        let buffers = Arc::clone(&self.buffers);

        let thread_stop = Arc::clone(&stop);
        let thread = std::thread::Builder::new()
            .name("vasynth-null-output".into())
            .spawn(move || {
                let mut buffer = vec![0.0f32; len];
                let mut deadline = Instant::now();
                while !thread_stop.load(Ordering::Relaxed) {
                    callback(&mut buffer);
                    buffers.fetch_add(1, Ordering::Relaxed);
                    if paced {
                        deadline += period;
                        if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
                            std::thread::sleep(wait);
                        }
                    }
                }
            })?;

        tracing::info!(
            sample_rate = config.sample_rate,
            buffer = config.buffer_size,
            paced,
            "null output stream started"
        );
        Ok(StreamHandle::new(NullStream {
            stop,
            thread: Some(thread),
        }))
    }
}
