//! Take numbering derived from the files already in the save directory.
//!
//! Numbers are never stored anywhere else: the next take is always one past
//! the highest number found on disk for the custom name, so deleting older
//! takes leaves gaps that are never refilled.

use std::fs;
use std::path::Path;

use crate::models::error::RecorderError;

/// Scan `directory` for `<custom_name>_<NNNN>_<track>.wav` and return the
/// next take number.
///
/// The name match is exact and case-sensitive and the take number must be
/// exactly four digits. Fails if the directory cannot be read.
pub fn scan_take_number(directory: &Path, custom_name: &str) -> Result<u32, RecorderError> {
    let entries = fs::read_dir(directory).map_err(|e| {
        RecorderError::Storage(format!("cannot read {}: {}", directory.display(), e))
    })?;

    let max_take = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| parse_take_number(&name, custom_name))
        .max()
        .unwrap_or(0);

    Ok(max_take.saturating_add(1))
}

/// Like [`scan_take_number`], but a missing or unreadable directory counts
/// as zero matches and yields take 1 with a warning.
pub fn next_take_number(directory: &Path, custom_name: &str) -> u32 {
    scan_take_number(directory, custom_name).unwrap_or_else(|e| {
        log::warn!("take number scan failed, starting at 1: {}", e);
        1
    })
}

/// File name of one track of a take. `track_index` is zero-based.
pub fn track_file_name(custom_name: &str, take_number: u32, track_index: usize) -> String {
    format!("{}_{:04}_{}.wav", custom_name, take_number, track_index + 1)
}

/// Take number encoded in `file_name` if it belongs to `custom_name`.
fn parse_take_number(file_name: &str, custom_name: &str) -> Option<u32> {
    let rest = file_name
        .strip_prefix(custom_name)?
        .strip_prefix('_')?
        .strip_suffix(".wav")?;
    let (take, track) = rest.split_once('_')?;

    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if take.len() != 4 || !is_digits(take) || !is_digits(track) {
        return None;
    }
    take.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn empty_directory_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(scan_take_number(dir.path(), "Foo").unwrap(), 1);
    }

    #[test]
    fn next_is_max_plus_one_with_gaps() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Foo_0001_1.wav");
        touch(dir.path(), "Foo_0003_2.wav");
        assert_eq!(scan_take_number(dir.path(), "Foo").unwrap(), 4);
    }

    #[test]
    fn unrelated_files_and_other_names_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Foo_0002_1.wav");
        touch(dir.path(), "Bar_0042_1.wav");
        touch(dir.path(), "foo_0050_1.wav");
        touch(dir.path(), "Foo_Bar_0060_1.wav");
        touch(dir.path(), "Foo_0070_1.wav.bak");
        touch(dir.path(), "Foo_070_1.wav");
        touch(dir.path(), "Foo_00800_1.wav");
        touch(dir.path(), "Foo_0090_.wav");
        touch(dir.path(), "Foo_0002.json");
        touch(dir.path(), "notes.txt");
        assert_eq!(scan_take_number(dir.path(), "Foo").unwrap(), 3);
        assert_eq!(scan_take_number(dir.path(), "Bar").unwrap(), 43);
        assert_eq!(scan_take_number(dir.path(), "Foo_Bar").unwrap(), 61);
    }

    #[test]
    fn missing_directory_warns_and_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(matches!(
            scan_take_number(&missing, "Foo"),
            Err(RecorderError::Storage(_))
        ));
        assert_eq!(next_take_number(&missing, "Foo"), 1);
    }

    #[test]
    fn file_names_are_bit_exact() {
        assert_eq!(track_file_name("Take", 1, 0), "Take_0001_1.wav");
        assert_eq!(track_file_name("Take", 12, 9), "Take_0012_10.wav");
    }

    #[test]
    fn parse_matches_generated_names() {
        assert_eq!(parse_take_number(&track_file_name("A b", 37, 2), "A b"), Some(37));
        assert_eq!(parse_take_number("A b_0037_3.wav", "A"), None);
    }
}
