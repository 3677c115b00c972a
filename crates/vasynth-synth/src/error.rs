//! Construction and control-path errors.
//!
//! The audio context never returns errors; everything here is raised while
//! building an engine, editing a path before it is frozen, or reconfiguring
//! a stopped engine.

use crate::block::{BlockKind, Param};

/// Errors raised while building or freezing a [`SignalPath`](crate::SignalPath).
#[derive(Debug, Clone, PartialEq)]
pub enum PathError {
    /// The node index does not exist in this path.
    UnknownBlock(usize),
    /// The port does not exist on the block.
    InvalidPort {
        /// Block kind.
        kind: BlockKind,
        /// Requested port.
        port: usize,
    },
    /// The block kind has no such parameter.
    InvalidParam {
        /// Block kind.
        kind: BlockKind,
        /// Requested parameter.
        param: Param,
    },
    /// The routing is frozen; connections can no longer change.
    Frozen,
    /// The path has not been frozen yet.
    NotFrozen,
    /// The routing graph contains a cycle.
    CycleDetected,
    /// The path has no output edge.
    NoOutput,
}

impl core::fmt::Display for PathError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownBlock(idx) => write!(f, "block {idx} not found"),
            Self::InvalidPort { kind, port } => write!(f, "{kind:?} has no port {port}"),
            Self::InvalidParam { kind, param } => write!(f, "{kind:?} has no parameter {param:?}"),
            Self::Frozen => write!(f, "routing is frozen"),
            Self::NotFrozen => write!(f, "routing has not been frozen"),
            Self::CycleDetected => write!(f, "routing contains a cycle"),
            Self::NoOutput => write!(f, "path has no output edge"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PathError {}

/// Errors raised while building or reconfiguring an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthError {
    /// Sample rate is not finite or outside 8 kHz..=192 kHz.
    InvalidSampleRate(f32),
    /// A count or capacity that must be non-zero is zero.
    ZeroCapacity(&'static str),
    /// A configuration value is out of range.
    InvalidConfig(&'static str),
    /// A voice path failed to build or freeze.
    Path(PathError),
    /// The modulation matrix is at capacity.
    MatrixFull {
        /// Matrix capacity.
        capacity: usize,
    },
    /// The operation is not allowed while the engine is rendering.
    EngineBusy,
}

impl core::fmt::Display for SynthError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSampleRate(sr) => {
                write!(f, "invalid sample rate {sr} Hz (expected 8000..=192000)")
            }
            Self::ZeroCapacity(what) => write!(f, "{what} must be greater than zero"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Path(err) => write!(f, "signal path error: {err}"),
            Self::MatrixFull { capacity } => {
                write!(f, "modulation matrix is full ({capacity} links)")
            }
            Self::EngineBusy => write!(f, "engine is rendering; stop it first"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SynthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Path(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PathError> for SynthError {
    fn from(err: PathError) -> Self {
        Self::Path(err)
    }
}
