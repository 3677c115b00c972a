//! `EngineConfig` as a TOML file.
//!
//! ```toml
//! sample_rate = 48000.0
//! max_voices = 8
//! allocation_mode = "poly"
//! stealing_mode = "oldest_first"
//! path_kind = "dual_oscillator"
//! midi_channel = 0
//! ```
//!
//! Missing keys take their defaults. Loaded configs are validated before
//! they are returned.

use std::path::Path;

use vasynth_synth::EngineConfig;

use crate::error::ConfigError;

/// Parse and validate a config from TOML text.
pub fn parse_engine_config(text: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(text)?;
    config
        .validate()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    Ok(config)
}

/// Load and validate a config file.
pub fn load_engine_config(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let config = parse_engine_config(&text)?;
    tracing::info!(path = %path.display(), voices = config.max_voices, "engine config loaded");
    Ok(config)
}

/// Save a config as pretty TOML. Invalid configs are refused.
pub fn save_engine_config(
    config: &EngineConfig,
    path: impl AsRef<Path>,
) -> Result<(), ConfigError> {
    let path = path.as_ref();
    config
        .validate()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    let text = toml::to_string_pretty(config)?;
    std::fs::write(path, text).map_err(|e| ConfigError::write_file(path, e))
}
