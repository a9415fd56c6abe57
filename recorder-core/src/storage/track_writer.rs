use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::BYTES_PER_SAMPLE;
use crate::models::error::RecorderError;
use crate::processing::wav_format;
use crate::storage::take_manager;

/// A track file that was written and finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenTrack {
    pub path: PathBuf,
    pub frames: u64,
    /// SHA-256 hex digest of the complete file.
    pub sha256: String,
}

/// Persist one channel of a take as `<name>_<take:04d>_<track+1>.wav`.
///
/// `samples` is the channel's little-endian 16-bit stream as produced by the
/// demultiplexer. The directory is created if it does not exist.
pub fn write_track(
    directory: &Path,
    custom_name: &str,
    take_number: u32,
    track_index: usize,
    samples: &[u8],
    sample_rate: u32,
) -> Result<WrittenTrack, RecorderError> {
    let path = directory.join(take_manager::track_file_name(custom_name, take_number, track_index));
    let mut writer = WavTrackWriter::create(path, sample_rate)?;
    writer.write_samples(samples)?;
    writer.finish()
}

/// Streaming mono 16-bit WAV writer.
///
/// ## File Format
///
/// ```text
/// [44-byte WAV header, sizes patched on finish]
/// [raw 16-bit LE PCM data...]
/// ```
pub struct WavTrackWriter {
    file_path: PathBuf,
    sample_rate: u32,
    file: Option<BufWriter<File>>,
    data_bytes: u64,
}

impl WavTrackWriter {
    /// Create the file and write a placeholder header.
    pub fn create(file_path: PathBuf, sample_rate: u32) -> Result<Self, RecorderError> {
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_error(parent, format!("failed to create directory: {}", e)))?;
        }

        let file = File::create(&file_path).map_err(|e| write_error(&file_path, e.to_string()))?;
        let mut writer = Self {
            file_path,
            sample_rate,
            file: Some(BufWriter::new(file)),
            data_bytes: 0,
        };

        let header = wav_format::mono_pcm16_header(sample_rate, 0);
        writer.write_raw(&header)?;
        Ok(writer)
    }

    /// Append little-endian 16-bit samples.
    pub fn write_samples(&mut self, samples: &[u8]) -> Result<(), RecorderError> {
        if self.data_bytes + samples.len() as u64 > wav_format::MAX_DATA_SIZE {
            return Err(write_error(&self.file_path, "take exceeds the 4 GiB WAV size limit".into()));
        }
        self.write_raw(samples)?;
        self.data_bytes += samples.len() as u64;
        Ok(())
    }

    /// Patch the header sizes, flush, and checksum the finished file.
    pub fn finish(mut self) -> Result<WrittenTrack, RecorderError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| write_error(&self.file_path, "file is not open".into()))?;

        // An odd trailing byte would leave a half sample in the data chunk.
        if self.data_bytes % BYTES_PER_SAMPLE as u64 != 0 {
            log::warn!("{}: odd data length {}", self.file_path.display(), self.data_bytes);
        }

        let header = wav_format::mono_pcm16_header(self.sample_rate, self.data_bytes as u32);
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(&header))
            .and_then(|_| file.flush())
            .map_err(|e| write_error(&self.file_path, e.to_string()))?;
        file.into_inner()
            .map_err(|e| write_error(&self.file_path, e.to_string()))?
            .sync_all()
            .map_err(|e| write_error(&self.file_path, e.to_string()))?;

        let sha256 = sha256_file(&self.file_path)?;
        Ok(WrittenTrack {
            path: self.file_path.clone(),
            frames: self.data_bytes / BYTES_PER_SAMPLE as u64,
            sha256,
        })
    }

    /// Sample bytes written so far, excluding the header.
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), RecorderError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| write_error(&self.file_path, "file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| write_error(&self.file_path, format!("write failed: {}", e)))
    }
}

fn write_error(path: &Path, reason: String) -> RecorderError {
    RecorderError::Write {
        path: path.to_path_buf(),
        reason,
    }
}

/// SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, RecorderError> {
    let data = fs::read(path).map_err(|e| write_error(path, format!("failed to read file for checksum: {}", e)))?;
    Ok(hex_encode(&Sha256::digest(&data)))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::wav_format::{encode_i16_le, WavInfo};

    #[test]
    fn writes_mono_pcm16_file() {
        let dir = tempfile::tempdir().unwrap();
        let samples = encode_i16_le(&[0, 1, -1, 32767]);

        let written = write_track(dir.path(), "Take", 1, 0, &samples, 44100).unwrap();

        assert_eq!(written.path, dir.path().join("Take_0001_1.wav"));
        assert_eq!(written.frames, 4);
        assert_eq!(written.sha256.len(), 64);

        let bytes = fs::read(&written.path).unwrap();
        assert_eq!(bytes.len(), 44 + 8);
        let info = WavInfo::parse(&bytes).unwrap();
        assert_eq!(info.channels, 1);
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.bit_depth, 16);
        assert_eq!(info.data_size, 8);
        assert_eq!(&bytes[44..], samples.as_slice());
    }

    #[test]
    fn track_number_is_one_based() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_track(dir.path(), "Foo", 23, 3, &[], 48000).unwrap();
        assert_eq!(written.path.file_name().unwrap(), "Foo_0023_4.wav");
        assert_eq!(written.frames, 0);
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let written = write_track(&nested, "Foo", 1, 0, &[0, 0], 48000).unwrap();
        assert!(written.path.exists());
    }

    #[test]
    fn unwritable_path_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        // A regular file in place of the directory.
        let err = write_track(&blocker, "Foo", 1, 0, &[0, 0], 48000).unwrap_err();
        assert!(matches!(err, RecorderError::Write { .. }));
    }

    #[test]
    fn checksum_matches_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_track(dir.path(), "Foo", 1, 0, &[1, 2, 3, 4], 8000).unwrap();
        assert_eq!(sha256_file(&written.path).unwrap(), written.sha256);
    }
}
