use std::path::Path;

use hound::{WavSpec, WavWriter};

use crate::audio::pcm;

/// Output sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum WavEncoding {
    /// 32-bit IEEE float
    #[default]
    Float,
    /// 16-bit signed PCM
    Pcm16,
}

/// Write interleaved samples to a WAV file
pub fn save_wav(
    path: impl AsRef<Path>,
    samples: &[f32],
    sample_rate: u32,
    channels: u16,
    encoding: WavEncoding,
) -> Result<(), hound::Error> {
    let (bits_per_sample, sample_format) = match encoding {
        WavEncoding::Float => (32, hound::SampleFormat::Float),
        WavEncoding::Pcm16 => (16, hound::SampleFormat::Int),
    };
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample,
        sample_format,
    };

    let mut writer = WavWriter::create(path, spec)?;

    for &sample in samples {
        match encoding {
            WavEncoding::Float => writer.write_sample(sample)?,
            WavEncoding::Pcm16 => {
                writer.write_sample(i16::from_le_bytes(pcm::encode_sample(sample)))?
            }
        }
    }

    writer.finalize()?;
    Ok(())
}
