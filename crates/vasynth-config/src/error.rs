//! Error types for configuration and preset operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading, parsing or saving configuration and presets.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Malformed preset text. Nothing from the input is kept.
    #[error("preset parse error at line {line}: {message}")]
    PresetParse {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        message: String,
    },

    /// Preset not found
    #[error("preset not found: {0}")]
    PresetNotFound(String),

    /// A loaded value failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a preset parse error.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        ConfigError::PresetParse {
            line,
            message: message.into(),
        }
    }

    /// Whether this error came from malformed input rather than I/O.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            ConfigError::TomlParse(_) | ConfigError::PresetParse { .. } | ConfigError::Invalid(_)
        )
    }
}
