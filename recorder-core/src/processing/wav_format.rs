//! RIFF/WAVE container helpers and 16-bit PCM byte conversion.
//!
//! Track files are always mono, 16-bit signed little-endian PCM, so the
//! header is the canonical 44-byte form with a single `fmt ` and `data` chunk.

/// Size of the canonical WAV header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Bits per sample of every track file.
pub const PCM_BIT_DEPTH: u16 = 16;

/// Largest `data` chunk a RIFF size field can describe.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - (WAV_HEADER_SIZE as u64 - 8);

/// Build a 44-byte PCM header for `data_size` bytes of sample data.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16
/// [20-21]  1 (PCM)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  sample_rate * block_align
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn wav_header(sample_rate: u32, bit_depth: u16, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let block_align = channels * bit_depth / 8;
    let byte_rate = sample_rate * block_align as u32;

    let mut header = [0u8; WAV_HEADER_SIZE];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

/// Header for a mono 16-bit track.
pub fn mono_pcm16_header(sample_rate: u32, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    wav_header(sample_rate, PCM_BIT_DEPTH, 1, data_size)
}

/// Format fields read back from a canonical header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub data_size: u32,
}

impl WavInfo {
    /// Parse a canonical 44-byte PCM header. Returns `None` for anything else.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < WAV_HEADER_SIZE
            || &bytes[0..4] != b"RIFF"
            || &bytes[8..12] != b"WAVE"
            || &bytes[12..16] != b"fmt "
            || &bytes[36..40] != b"data"
            || u16::from_le_bytes([bytes[20], bytes[21]]) != 1
        {
            return None;
        }
        Some(Self {
            channels: u16::from_le_bytes([bytes[22], bytes[23]]),
            sample_rate: u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            bit_depth: u16::from_le_bytes([bytes[34], bytes[35]]),
            data_size: u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
        })
    }

    /// Frames described by the `data` chunk.
    pub fn frames(&self) -> u32 {
        let block_align = (self.channels as u32 * self.bit_depth as u32 / 8).max(1);
        self.data_size / block_align
    }
}

/// Decode little-endian signed 16-bit samples. A trailing odd byte is ignored.
pub fn decode_i16_le(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encode signed 16-bit samples as little-endian bytes.
pub fn encode_i16_le(samples: &[i16]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_magic() {
        let header = mono_pcm16_header(48000, 0);
        assert_eq!(header.len(), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn mono_header_fields() {
        let header = mono_pcm16_header(44100, 2048);

        let byte_rate = u32::from_le_bytes([header[28], header[29], header[30], header[31]]);
        assert_eq!(byte_rate, 88200);

        let block_align = u16::from_le_bytes([header[32], header[33]]);
        assert_eq!(block_align, 2);

        let chunk_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        assert_eq!(chunk_size, 36 + 2048);
    }

    #[test]
    fn parse_reads_back_format() {
        let header = wav_header(48000, 16, 2, 9600);
        let info = WavInfo::parse(&header).unwrap();
        assert_eq!(
            info,
            WavInfo {
                channels: 2,
                sample_rate: 48000,
                bit_depth: 16,
                data_size: 9600,
            }
        );
        assert_eq!(info.frames(), 2400);
    }

    #[test]
    fn parse_rejects_non_wav() {
        assert!(WavInfo::parse(b"not a wav file").is_none());
        let mut header = mono_pcm16_header(48000, 0);
        header[20] = 3; // IEEE float
        assert!(WavInfo::parse(&header).is_none());
    }

    #[test]
    fn pcm_byte_order() {
        assert_eq!(encode_i16_le(&[1, -2, i16::MIN]), vec![0x01, 0x00, 0xFE, 0xFF, 0x00, 0x80]);
        assert_eq!(decode_i16_le(&[0x01, 0x00, 0xFE, 0xFF, 0x7F]), vec![1, -2]);
    }
}
