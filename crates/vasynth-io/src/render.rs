//! Offline rendering of a timed event schedule to a WAV file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use vasynth_synth::{ControlEvent, Engine};

use crate::recorder::WavRecorder;
use crate::{Error, Result};

/// Frames rendered per block when no event falls inside it.
const BLOCK_FRAMES: usize = 256;
/// Ring capacity in blocks.
const RING_BLOCKS: usize = 16;

/// An event applied when the render reaches `frame`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    /// Frame index at which the event takes effect.
    pub frame: u64,
    /// The event.
    pub event: ControlEvent,
}

/// Events sorted by frame. Events at the same frame keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    events: Vec<ScheduledEvent>,
}

impl Schedule {
    /// An empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `event` at `frame`.
    pub fn push(&mut self, frame: u64, event: ControlEvent) {
        let at = self.events.partition_point(|e| e.frame <= frame);
        self.events.insert(at, ScheduledEvent { frame, event });
    }

    /// Add a note-on at `start` and its note-off `length` frames later.
    pub fn note(&mut self, start: u64, length: u64, channel: u8, note: u8, velocity: f32) {
        self.push(
            start,
            ControlEvent::NoteOn {
                channel,
                note,
                velocity,
            },
        );
        self.push(
            start.saturating_add(length),
            ControlEvent::NoteOff { channel, note },
        );
    }

    /// Events in render order.
    pub fn events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether there are no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Frame of the last event, 0 when empty.
    pub fn end_frame(&self) -> u64 {
        self.events.last().map_or(0, |e| e.frame)
    }
}

/// Render `frames` frames of `engine` into a 16-bit WAV at `path`.
///
/// Blocks are split at event frames so every event lands on its exact
/// sample. Audio goes through the same ring and writer thread as live
/// recording; the render waits for ring space instead of dropping.
/// Returns the number of frames written.
pub fn render_to_wav<P: AsRef<Path>>(
    engine: &mut Engine,
    schedule: &Schedule,
    frames: u64,
    path: P,
) -> Result<u64> {
    render_to_wav_with_progress(engine, schedule, frames, path, |_| {})
}

/// [`render_to_wav`] that reports the rendered frame count after each block.
pub fn render_to_wav_with_progress<P, F>(
    engine: &mut Engine,
    schedule: &Schedule,
    frames: u64,
    path: P,
    mut progress: F,
) -> Result<u64>
where
    P: AsRef<Path>,
    F: FnMut(u64),
{
    let channels = engine.channel_count().max(1);
    let channel_count = u16::try_from(channels)
        .map_err(|_| Error::Stream(format!("too many channels: {channels}")))?;
    let sample_rate = engine.sample_rate().round() as u32;

    let (recorder, mut tap) = WavRecorder::create(
        path,
        channel_count,
        sample_rate,
        BLOCK_FRAMES * channels * RING_BLOCKS,
        Arc::clone(engine.diagnostics()),
    )?;

    tracing::info!(
        frames,
        events = schedule.len(),
        sample_rate,
        channels,
        "offline render started"
    );

    let mut buffer = vec![0.0f32; BLOCK_FRAMES * channels];
    let mut pending = schedule.events().iter().peekable();
    let mut position = 0u64;
    engine.start();

    'render: while position < frames {
        while let Some(scheduled) = pending.next_if(|e| e.frame <= position) {
            engine.handle_event(scheduled.event);
        }
        let next_event = pending.peek().map_or(frames, |e| e.frame.min(frames));
        let block = (next_event - position).min(BLOCK_FRAMES as u64) as usize;
        let out = &mut buffer[..block * channels];
        engine.render(out, channels);

        while tap.available() < out.len() {
            if tap.is_abandoned() {
                tracing::warn!(frames = position, "WAV writer stopped, aborting render");
                break 'render;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        tap.push(out);
        position += block as u64;
        progress(position);
    }

    engine.stop();
    let abandoned = tap.is_abandoned();
    drop(tap);
    let written = recorder.finish()?;
    if abandoned {
        return Err(Error::RecorderThread);
    }
    tracing::info!(frames = written, "offline render finished");
    Ok(written)
}
