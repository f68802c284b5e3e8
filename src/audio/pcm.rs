//! 16-bit little-endian stereo PCM
//!
//! A frame is 4 bytes: left sample at offset 0, right sample at offset 2.
//! Samples are scaled by `1 / 32768` into `[-1, 1)`.

/// Bytes per interleaved stereo frame
pub const FRAME_BYTES: usize = 4;

const SCALE: f32 = 1.0 / 32768.0;

/// One decoded stereo frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

/// Iterator over the complete frames of a PCM16 byte buffer
///
/// Trailing bytes that do not fill a frame are left in [`remainder`].
///
/// [`remainder`]: Pcm16Frames::remainder
pub struct Pcm16Frames<'a> {
    chunks: std::slice::ChunksExact<'a, u8>,
}

impl<'a> Pcm16Frames<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            chunks: bytes.chunks_exact(FRAME_BYTES),
        }
    }

    /// Bytes after the last complete frame
    pub fn remainder(&self) -> &'a [u8] {
        self.chunks.remainder()
    }

    /// Left channel only
    pub fn left(self) -> impl Iterator<Item = f32> + 'a {
        self.map(|frame| frame.left)
    }
}

impl Iterator for Pcm16Frames<'_> {
    type Item = StereoFrame;

    fn next(&mut self) -> Option<StereoFrame> {
        self.chunks.next().map(|frame| StereoFrame {
            left: decode_sample([frame[0], frame[1]]),
            right: decode_sample([frame[2], frame[3]]),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Pcm16Frames<'_> {}

pub fn decode_sample(bytes: [u8; 2]) -> f32 {
    i16::from_le_bytes(bytes) as f32 * SCALE
}

pub fn encode_sample(sample: f32) -> [u8; 2] {
    let value = (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    value.to_le_bytes()
}

/// Decode complete frames into interleaved `[L, R, L, R, ...]` samples
pub fn decode_interleaved(bytes: &[u8]) -> Vec<f32> {
    Pcm16Frames::new(bytes)
        .flat_map(|frame| [frame.left, frame.right])
        .collect()
}

/// Encode interleaved stereo samples, clipping to the 16-bit range
pub fn encode_interleaved(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|&s| encode_sample(s)).collect()
}
