use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{RecorderError, TrackWriteFailure};

/// One recording attempt, created at `start` and consumed once at `stop`.
///
/// Holds everything the stop transition needs, so later changes to the
/// user's selections never affect a take in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Take {
    pub custom_name: String,
    pub take_number: u32,
    /// Zero-based channel indices to persist.
    pub selected_tracks: BTreeSet<usize>,
    pub save_directory: PathBuf,
    pub device_name: String,
    pub channel_count: u16,
    pub sample_rate: u32,
}

impl Take {
    /// `<name>_<take:04d>`, the stem shared by every file of this take.
    pub fn file_stem(&self) -> String {
        format!("{}_{:04}", self.custom_name, self.take_number)
    }
}

/// Outcome of the `Recording -> Monitoring` transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TakeResult {
    pub take: Take,
    /// Track files written successfully, in track order.
    pub files: Vec<PathBuf>,
    pub metadata_file: Option<PathBuf>,
    /// Per-file persistence failures, aggregated across the take.
    pub failures: Vec<TrackWriteFailure>,
    /// Mono frames written per track.
    pub frames: u64,
    /// Set when the take ended because the device stopped delivering audio.
    pub read_failure: Option<RecorderError>,
}

impl TakeResult {
    pub fn duration_secs(&self) -> f64 {
        if self.take.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.take.sample_rate as f64
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.read_failure.is_none()
    }

    /// The aggregated write error to report once, if any file failed.
    pub fn write_error(&self) -> Option<RecorderError> {
        if self.failures.is_empty() {
            None
        } else {
            Some(RecorderError::TracksNotWritten(self.failures.clone()))
        }
    }
}

/// JSON sidecar describing a take. Serialized next to the track files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeMetadata {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub custom_name: String,
    pub take_number: u32,
    pub device_name: String,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub frames: u64,
    pub duration_secs: f64,
    pub tracks: Vec<TrackMetadata>,
}

/// One written track file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// One-based, as it appears in the file name.
    pub track_number: usize,
    pub file_name: String,
    pub sha256: String,
}

impl TakeMetadata {
    pub fn new(take: &Take, frames: u64, tracks: Vec<TrackMetadata>) -> Self {
        let duration_secs = if take.sample_rate == 0 {
            0.0
        } else {
            frames as f64 / take.sample_rate as f64
        };
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            custom_name: take.custom_name.clone(),
            take_number: take.take_number,
            device_name: take.device_name.clone(),
            sample_rate: take.sample_rate,
            channel_count: take.channel_count,
            frames,
            duration_secs,
            tracks,
        }
    }
}
