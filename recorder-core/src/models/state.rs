use std::fmt;

use serde::{Deserialize, Serialize};

/// Recording state machine.
///
/// State transitions:
/// ```text
/// idle ──select device──→ monitoring ──start──→ recording
///   ↑                      ↑    │                  │
///   └──── read failure ────┘    └←── stop / read failure
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    Idle,
    Monitoring,
    Recording,
}

impl RecorderState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_monitoring(&self) -> bool {
        matches!(self, Self::Monitoring)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    /// The status reported to remote listeners for this state.
    pub fn status(&self) -> StatusBroadcast {
        if self.is_recording() {
            StatusBroadcast::Recording
        } else {
            StatusBroadcast::Idle
        }
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Monitoring => f.write_str("monitoring"),
            Self::Recording => f.write_str("recording"),
        }
    }
}

/// Status sent to remote listeners as `/recorder_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusBroadcast {
    Idle,
    Recording,
}

impl StatusBroadcast {
    /// The string argument carried on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_recording_reports_recording() {
        assert_eq!(RecorderState::Idle.status(), StatusBroadcast::Idle);
        assert_eq!(RecorderState::Monitoring.status(), StatusBroadcast::Idle);
        assert_eq!(RecorderState::Recording.status(), StatusBroadcast::Recording);
    }

    #[test]
    fn wire_strings() {
        assert_eq!(StatusBroadcast::Idle.as_str(), "idle");
        assert_eq!(StatusBroadcast::Recording.as_str(), "recording");
    }
}
