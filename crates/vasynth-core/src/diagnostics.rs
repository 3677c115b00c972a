//! Monotonic diagnostic counters.
//!
//! Counters are plain relaxed atomics, so the audio thread can bump them
//! without locking and any thread can read them. They only ever increase.

use core::sync::atomic::{AtomicU64, Ordering};

/// Per-engine diagnostic counters.
#[derive(Debug, Default)]
pub struct Diagnostics {
    param_clamps: AtomicU64,
    dropped_events: AtomicU64,
    ring_overflows: AtomicU64,
    stream_underflows: AtomicU64,
    voice_steals: AtomicU64,
}

/// Point-in-time copy of [`Diagnostics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    /// Parameter writes that were clamped to their declared range.
    pub param_clamps: u64,
    /// Control events discarded because the event queue was full.
    pub dropped_events: u64,
    /// Recorded samples lost because the recorder ring was full.
    pub ring_overflows: u64,
    /// Underruns or errors reported by the audio device.
    pub stream_underflows: u64,
    /// Active voices reused for a new note.
    pub voice_steals: u64,
}

impl Diagnostics {
    /// Create a zeroed counter set.
    pub const fn new() -> Self {
        Self {
            param_clamps: AtomicU64::new(0),
            dropped_events: AtomicU64::new(0),
            ring_overflows: AtomicU64::new(0),
            stream_underflows: AtomicU64::new(0),
            voice_steals: AtomicU64::new(0),
        }
    }

    /// Count one clamped parameter write.
    #[inline]
    pub fn record_clamp(&self) {
        self.param_clamps.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one dropped control event.
    #[inline]
    pub fn record_dropped_event(&self) {
        self.dropped_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Count `samples` lost to a full recorder ring.
    #[inline]
    pub fn record_ring_overflow(&self, samples: u64) {
        self.ring_overflows.fetch_add(samples, Ordering::Relaxed);
    }

    /// Count one device underrun or stream error.
    #[inline]
    pub fn record_stream_underflow(&self) {
        self.stream_underflows.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one stolen voice.
    #[inline]
    pub fn record_voice_steal(&self) {
        self.voice_steals.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter.
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            param_clamps: self.param_clamps.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
            ring_overflows: self.ring_overflows.load(Ordering::Relaxed),
            stream_underflows: self.stream_underflows.load(Ordering::Relaxed),
            voice_steals: self.voice_steals.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        assert_eq!(Diagnostics::new().snapshot(), DiagnosticsSnapshot::default());
    }

    #[test]
    fn counters_accumulate() {
        let diag = Diagnostics::new();
        diag.record_clamp();
        diag.record_clamp();
        diag.record_dropped_event();
        diag.record_ring_overflow(64);
        diag.record_voice_steal();
        diag.record_stream_underflow();

        let snap = diag.snapshot();
        assert_eq!(snap.param_clamps, 2);
        assert_eq!(snap.dropped_events, 1);
        assert_eq!(snap.ring_overflows, 64);
        assert_eq!(snap.voice_steals, 1);
        assert_eq!(snap.stream_underflows, 1);
    }
}
