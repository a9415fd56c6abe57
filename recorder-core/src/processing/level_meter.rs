//! Per-channel loudness of one interleaved 16-bit block.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::LevelSnapshot;
use crate::processing::wav_format;

/// Full-scale magnitude of a signed 16-bit sample.
const FULL_SCALE: f64 = 32768.0;

/// Compute RMS and peak levels for each of `channel_count` interleaved channels.
///
/// Only whole frames are considered; a channel with no whole frame in the
/// block reports 0.0. Every value is normalized by 32768 and clamped to [0, 1].
pub fn compute_levels(block: &[u8], channel_count: usize) -> LevelSnapshot {
    if channel_count == 0 {
        return LevelSnapshot::default();
    }

    let samples = wav_format::decode_i16_le(block);
    let frames = samples.len() / channel_count;

    let mut sum_sq = vec![0.0f64; channel_count];
    let mut peak = vec![0i32; channel_count];
    for frame in samples.chunks_exact(channel_count) {
        for (ch, &sample) in frame.iter().enumerate() {
            let value = sample as f64;
            sum_sq[ch] += value * value;
            peak[ch] = peak[ch].max((sample as i32).abs());
        }
    }

    let levels = sum_sq
        .iter()
        .map(|&sum| {
            if frames == 0 {
                return 0.0;
            }
            let rms = (sum / frames as f64).sqrt();
            (rms / FULL_SCALE).clamp(0.0, 1.0) as f32
        })
        .collect();
    let peaks = peak
        .iter()
        .map(|&p| (p as f64 / FULL_SCALE).clamp(0.0, 1.0) as f32)
        .collect();

    LevelSnapshot { levels, peaks }
}

/// Latest-value-wins handoff of level snapshots from a capture loop to the UI.
///
/// Publishing replaces any snapshot the consumer has not picked up yet; the
/// capture loop never waits on the consumer.
#[derive(Debug, Clone, Default)]
pub struct LevelMonitor {
    slot: Arc<Mutex<Option<LevelSnapshot>>>,
}

impl LevelMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: LevelSnapshot) {
        *self.slot.lock() = Some(snapshot);
    }

    /// Take the pending snapshot, leaving the slot empty.
    pub fn take(&self) -> Option<LevelSnapshot> {
        self.slot.lock().take()
    }

    /// Copy of the pending snapshot without consuming it.
    pub fn latest(&self) -> Option<LevelSnapshot> {
        self.slot.lock().clone()
    }

    pub fn clear(&self) {
        self.slot.lock().take();
    }
}
