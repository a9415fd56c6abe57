use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed block size used by every capture stream, in frames per channel.
pub const DEFAULT_BLOCK_FRAMES: usize = 1024;

/// Bytes per sample of the only supported sample format (16-bit signed LE).
pub const BYTES_PER_SAMPLE: usize = 2;

/// An input device snapshot taken at enumeration time.
///
/// Becomes stale when the hardware changes; re-enumerate after device-list
/// changes rather than reusing old snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Position in the audio subsystem's full device list.
    pub index: usize,
    pub name: String,
    pub max_input_channels: u16,
    pub default_sample_rate: u32,
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} ch @ {} Hz)",
            self.index, self.name, self.max_input_channels, self.default_sample_rate
        )
    }
}

/// What a capture session does with the blocks it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Level metering only.
    Monitoring,
    /// Level metering plus raw frame accumulation.
    Recording,
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monitoring => f.write_str("monitoring"),
            Self::Recording => f.write_str("recording"),
        }
    }
}

/// Parameters an input stream is opened with. Samples are always i16 LE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub block_frames: usize,
}

impl StreamSpec {
    /// Full channel count at the device's default rate.
    pub fn for_device(device: &AudioDevice, block_frames: usize) -> Self {
        Self {
            sample_rate: device.default_sample_rate,
            channels: device.max_input_channels,
            block_frames,
        }
    }

    /// Number of interleaved samples in one block.
    pub fn block_samples(&self) -> usize {
        self.block_frames * self.channels as usize
    }

    /// Size of one block in bytes.
    pub fn block_bytes(&self) -> usize {
        self.block_samples() * BYTES_PER_SAMPLE
    }
}

/// Real-time per-channel level metering (RMS and peak, 0.0–1.0).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelSnapshot {
    pub levels: Vec<f32>,
    pub peaks: Vec<f32>,
}

impl LevelSnapshot {
    pub fn channel_count(&self) -> usize {
        self.levels.len()
    }

    /// RMS level of `channel`, or 0.0 if out of range.
    pub fn level(&self, channel: usize) -> f32 {
        self.levels.get(channel).copied().unwrap_or(0.0)
    }
}

/// Counters describing a finished capture loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureDiagnostics {
    pub blocks_read: u64,
    pub bytes_captured: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> AudioDevice {
        AudioDevice {
            index: 3,
            name: "Interface".into(),
            max_input_channels: 8,
            default_sample_rate: 48000,
        }
    }

    #[test]
    fn stream_spec_uses_full_channel_count() {
        let spec = StreamSpec::for_device(&device(), DEFAULT_BLOCK_FRAMES);
        assert_eq!(spec.channels, 8);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.block_samples(), 8192);
        assert_eq!(spec.block_bytes(), 16384);
    }

    #[test]
    fn level_out_of_range_is_silent() {
        let snapshot = LevelSnapshot {
            levels: vec![0.5],
            peaks: vec![0.9],
        };
        assert_eq!(snapshot.level(0), 0.5);
        assert_eq!(snapshot.level(4), 0.0);
    }

    #[test]
    fn device_display() {
        assert_eq!(device().to_string(), "[3] Interface (8 ch @ 48000 Hz)");
    }
}
