use crate::models::audio_models::BYTES_PER_SAMPLE;

/// Split captured blocks into one little-endian 16-bit stream per channel.
///
/// The blocks are treated as one continuous interleaved stream, so a frame
/// may straddle a block boundary. A trailing partial frame is dropped, not
/// padded. Index `c` of the result holds channel `c`.
pub fn demux(raw_frames: &[Vec<u8>], channel_count: usize) -> Vec<Vec<u8>> {
    if channel_count == 0 {
        return Vec::new();
    }

    let frame_bytes = channel_count * BYTES_PER_SAMPLE;
    let total_bytes: usize = raw_frames.iter().map(Vec::len).sum();
    let per_channel = total_bytes / frame_bytes * BYTES_PER_SAMPLE;
    let mut channels: Vec<Vec<u8>> = (0..channel_count).map(|_| Vec::with_capacity(per_channel)).collect();

    let mut carry: Vec<u8> = Vec::with_capacity(frame_bytes);
    for block in raw_frames {
        let mut rest = block.as_slice();

        if !carry.is_empty() {
            let needed = (frame_bytes - carry.len()).min(rest.len());
            carry.extend_from_slice(&rest[..needed]);
            rest = &rest[needed..];
            if carry.len() < frame_bytes {
                continue;
            }
            split_frame(&carry, &mut channels);
            carry.clear();
        }

        let mut frames = rest.chunks_exact(frame_bytes);
        for frame in &mut frames {
            split_frame(frame, &mut channels);
        }
        carry.extend_from_slice(frames.remainder());
    }

    if !carry.is_empty() {
        log::debug!("demux dropped {} trailing byte(s) of a partial frame", carry.len());
    }
    channels
}

fn split_frame(frame: &[u8], channels: &mut [Vec<u8>]) {
    for (sample, channel) in frame.chunks_exact(BYTES_PER_SAMPLE).zip(channels.iter_mut()) {
        channel.extend_from_slice(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::wav_format::{decode_i16_le, encode_i16_le};

    fn interleaved(frames: usize, channels: usize) -> Vec<i16> {
        (0..frames)
            .flat_map(|f| (0..channels).map(move |c| (f * 10 + c) as i16))
            .collect()
    }

    #[test]
    fn splits_n_frames_into_c_sequences() {
        let block = encode_i16_le(&interleaved(1024, 4));
        let tracks = demux(&[block], 4);

        assert_eq!(tracks.len(), 4);
        for (c, track) in tracks.iter().enumerate() {
            let samples = decode_i16_le(track);
            assert_eq!(samples.len(), 1024);
            assert_eq!(samples[0], c as i16);
            assert_eq!(samples[5], (50 + c) as i16);
        }
    }

    #[test]
    fn trailing_partial_frame_is_dropped() {
        let mut samples = interleaved(3, 3);
        samples.extend_from_slice(&[99, 98]);
        let tracks = demux(&[encode_i16_le(&samples)], 3);

        for track in &tracks {
            assert_eq!(decode_i16_le(track).len(), 3);
        }
        assert!(!decode_i16_le(&tracks[0]).contains(&99));
    }

    #[test]
    fn frames_may_straddle_blocks() {
        let bytes = encode_i16_le(&interleaved(4, 2));
        // split mid-frame and mid-sample
        let blocks = vec![bytes[..5].to_vec(), bytes[5..11].to_vec(), bytes[11..].to_vec()];
        let tracks = demux(&blocks, 2);

        assert_eq!(decode_i16_le(&tracks[0]), vec![0, 10, 20, 30]);
        assert_eq!(decode_i16_le(&tracks[1]), vec![1, 11, 21, 31]);
    }

    #[test]
    fn empty_input() {
        let tracks = demux(&[], 2);
        assert_eq!(tracks, vec![Vec::<u8>::new(), Vec::new()]);
        assert!(demux(&[vec![0, 0]], 0).is_empty());
    }
}
