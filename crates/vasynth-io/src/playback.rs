//! Wiring an engine into a live output stream.

use std::sync::Arc;

use vasynth_synth::Engine;

use crate::backend::{AudioBackend, BackendStreamConfig, StreamHandle};
use crate::recorder::RecorderTap;
use crate::Result;

/// Move `engine` into an output callback on `backend` and start it.
///
/// Every device buffer is rendered by the engine and, when `tap` is given,
/// copied to the recorder. Stream errors are counted as underflows and
/// logged; the engine keeps rendering.
pub fn start_playback(
    backend: &dyn AudioBackend,
    config: &BackendStreamConfig,
    mut engine: Engine,
    mut tap: Option<RecorderTap>,
) -> Result<StreamHandle> {
    let channels = usize::from(config.channels.max(1));
    let diagnostics = Arc::clone(engine.diagnostics());
    engine.start();

    tracing::info!(
        backend = backend.name(),
        voices = engine.pool().capacity(),
        recording = tap.is_some(),
        "starting playback"
    );
    backend.build_output_stream(
        config,
        Box::new(move |buffer: &mut [f32]| {
            engine.render(buffer, channels);
            if let Some(tap) = tap.as_mut() {
                tap.push(buffer);
            }
        }),
        Box::new(move |err: &str| {
            diagnostics.record_stream_underflow();
            tracing::warn!(error = err, "audio stream error");
        }),
    )
}
