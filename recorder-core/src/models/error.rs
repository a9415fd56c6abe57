use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while enumerating, capturing, or persisting takes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("device enumeration failed: {0}")]
    DeviceEnumeration(String),

    #[error("input device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to open input stream on '{device}': {reason}")]
    StreamOpen { device: String, reason: String },

    #[error("read failure: {0}")]
    ReadFailure(String),

    #[error("failed to write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    #[error("{} file(s) of take failed to write", .0.len())]
    TracksNotWritten(Vec<TrackWriteFailure>),

    #[error("cannot start recording: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("remote control error: {0}")]
    Remote(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("settings error: {0}")]
    Settings(String),

    #[error("configuration failed: {0}")]
    Configuration(String),
}

/// Precondition failures for `Monitoring -> Recording`, checked before any
/// device interaction.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no save directory selected")]
    MissingSaveDirectory,

    #[error("custom name is empty")]
    EmptyCustomName,

    #[error("no tracks selected")]
    NoTracksSelected,

    #[error("track {track} is out of range for a {channels}-channel device")]
    TrackOutOfRange { track: usize, channels: u16 },
}

/// One file of a take that could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackWriteFailure {
    /// Zero-based channel index, or `None` for the metadata sidecar.
    pub track_index: Option<usize>,
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for TrackWriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.track_index {
            Some(track) => write!(f, "track {} ({}): {}", track + 1, self.path.display(), self.reason),
            None => write!(f, "metadata ({}): {}", self.path.display(), self.reason),
        }
    }
}

impl RecorderError {
    /// Whether the error leaves the recorder state untouched.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidState(_))
    }
}
