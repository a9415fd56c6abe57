use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::RecorderError;
use crate::models::take::{Take, TakeMetadata};

/// Path of the JSON sidecar for `take`: `<dir>/<name>_<take:04d>.json`.
pub fn metadata_path(take: &Take) -> PathBuf {
    take.save_directory.join(format!("{}.json", take.file_stem()))
}

/// Write take metadata as a JSON sidecar file next to the track files.
pub fn write_metadata(metadata: &TakeMetadata, path: &Path) -> Result<(), RecorderError> {
    let json = serde_json::to_string_pretty(metadata).map_err(|e| RecorderError::Write {
        path: path.to_path_buf(),
        reason: format!("failed to serialize metadata: {}", e),
    })?;
    fs::write(path, json).map_err(|e| RecorderError::Write {
        path: path.to_path_buf(),
        reason: format!("failed to write metadata: {}", e),
    })
}

/// Read take metadata from a JSON sidecar file.
pub fn read_metadata(path: &Path) -> Result<TakeMetadata, RecorderError> {
    let json = fs::read_to_string(path)
        .map_err(|e| RecorderError::Storage(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| RecorderError::Storage(format!("failed to parse metadata: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::take::TrackMetadata;
    use std::collections::BTreeSet;

    #[test]
    fn sidecar_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let take = Take {
            custom_name: "Session".into(),
            take_number: 2,
            selected_tracks: BTreeSet::from([0]),
            save_directory: dir.path().to_path_buf(),
            device_name: "Interface".into(),
            channel_count: 2,
            sample_rate: 48000,
        };
        let metadata = TakeMetadata::new(
            &take,
            1024,
            vec![TrackMetadata {
                track_number: 1,
                file_name: "Session_0002_1.wav".into(),
                sha256: "00".repeat(32),
            }],
        );

        let path = metadata_path(&take);
        assert_eq!(path.file_name().unwrap(), "Session_0002.json");

        write_metadata(&metadata, &path).unwrap();
        assert_eq!(read_metadata(&path).unwrap(), metadata);
    }

    #[test]
    fn missing_sidecar_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_metadata(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, RecorderError::Storage(_)));
    }
}
