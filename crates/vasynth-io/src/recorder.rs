//! WAV recording off the audio thread.
//!
//! The audio side holds a [`RecorderTap`] and pushes interleaved samples into
//! an `rtrb` ring without blocking. A writer thread drains the ring and writes
//! 16-bit PCM through `hound`. When the ring is full the whole buffer is
//! dropped, so channels never drift out of alignment, and the loss is counted
//! in [`Diagnostics`].

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use rtrb::{Consumer, Producer, RingBuffer};
use vasynth_synth::Diagnostics;

use crate::wav::sample_to_i16;
use crate::{Error, Result};

const IDLE_WAIT: Duration = Duration::from_millis(2);

/// Audio-thread end of a recording.
pub struct RecorderTap {
    producer: Producer<f32>,
    diagnostics: Arc<Diagnostics>,
}

impl RecorderTap {
    /// Queue one interleaved buffer. Returns false if it was dropped.
    pub fn push(&mut self, samples: &[f32]) -> bool {
        if self.producer.slots() < samples.len() {
            self.diagnostics.record_ring_overflow(samples.len() as u64);
            return false;
        }
        for &sample in samples {
            // Capacity checked above; a failure here is a lost sample, not a stall.
            if self.producer.push(sample).is_err() {
                self.diagnostics.record_ring_overflow(1);
            }
        }
        true
    }

    /// Free space in samples.
    pub fn available(&self) -> usize {
        self.producer.slots()
    }

    /// Whether the writer thread has stopped draining, usually because a
    /// write failed. [`WavRecorder::finish`] returns the cause.
    pub fn is_abandoned(&self) -> bool {
        self.producer.is_abandoned()
    }
}

impl std::fmt::Debug for RecorderTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecorderTap")
            .field("available", &self.producer.slots())
            .finish_non_exhaustive()
    }
}

/// Control-side end of a recording: owns the writer thread.
#[derive(Debug)]
pub struct WavRecorder {
    path: PathBuf,
    done: Arc<AtomicBool>,
    writer: Option<JoinHandle<Result<u64>>>,
}

impl WavRecorder {
    /// Create `path` and start the writer thread.
    ///
    /// The file is opened before this returns, so a bad path fails here
    /// rather than on the writer thread. `ring_capacity` is in samples.
    pub fn create<P: AsRef<Path>>(
        path: P,
        channels: u16,
        sample_rate: u32,
        ring_capacity: usize,
        diagnostics: Arc<Diagnostics>,
    ) -> Result<(Self, RecorderTap)> {
        if channels == 0 || sample_rate == 0 || ring_capacity == 0 {
            return Err(Error::Stream(format!(
                "invalid recording format: {channels} channels, {sample_rate} Hz, ring {ring_capacity}"
            )));
        }
        let path = path.as_ref().to_path_buf();
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(&path, spec)?;
        let (producer, consumer) = RingBuffer::new(ring_capacity);

        let done = Arc::new(AtomicBool::new(false));
        let thread_done = Arc::clone(&done);
        let handle = std::thread::Builder::new()
            .name("vasynth-wav-writer".into())
            .spawn(move || drain(consumer, writer, channels, &thread_done))?;

        tracing::info!(
            path = %path.display(),
            channels,
            sample_rate,
            ring_capacity,
            "recording started"
        );
        Ok((
            Self {
                path,
                done,
                writer: Some(handle),
            },
            RecorderTap {
                producer,
                diagnostics,
            },
        ))
    }

    /// File being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush everything queued so far, finalize the header and return the
    /// number of frames written.
    pub fn finish(mut self) -> Result<u64> {
        self.done.store(true, Ordering::Release);
        let frames = self
            .writer
            .take()
            .ok_or(Error::RecorderThread)?
            .join()
            .map_err(|_| Error::RecorderThread)??;
        tracing::info!(path = %self.path.display(), frames, "recording finished");
        Ok(frames)
    }
}

impl Drop for WavRecorder {
    fn drop(&mut self) {
        self.done.store(true, Ordering::Release);
        if let Some(handle) = self.writer.take()
            && let Ok(Err(err)) = handle.join()
        {
            tracing::warn!(path = %self.path.display(), %err, "recording failed");
        }
    }
}

fn drain(
    mut consumer: Consumer<f32>,
    mut writer: WavWriter<BufWriter<File>>,
    channels: u16,
    done: &AtomicBool,
) -> Result<u64> {
    let mut samples = 0u64;
    loop {
        // Read the flag before draining so nothing pushed ahead of it is lost.
        let finished = done.load(Ordering::Acquire) || consumer.is_abandoned();
        let mut wrote = false;
        while let Ok(sample) = consumer.pop() {
            writer.write_sample(sample_to_i16(sample))?;
            samples += 1;
            wrote = true;
        }
        if finished {
            break;
        }
        if !wrote {
            std::thread::sleep(IDLE_WAIT);
        }
    }
    writer.finalize()?;
    Ok(samples / u64::from(channels))
}
