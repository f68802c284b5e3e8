use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use anyhow::Context;
use crossbeam_channel::Receiver;
use hound::WavReader;

use super::AudioCapture;
use super::pcm::{self, FRAME_BYTES};
use crate::config::AudioConfig;

/// Producer of interleaved `f32` buffers
pub trait AudioSource: Send {
    /// Next interleaved buffer, `None` at end of stream
    fn next_buffer(&mut self) -> anyhow::Result<Option<Vec<f32>>>;
    fn sample_rate(&self) -> u32;
    fn channels(&self) -> usize;
}

/// Live input device
pub struct DeviceSource {
    rx: Receiver<Vec<f32>>,
    sample_rate: u32,
    channels: usize,
    _capture: AudioCapture,
}

impl DeviceSource {
    pub fn new(config: &AudioConfig, device_name: Option<&str>) -> anyhow::Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded(10);
        let capture = AudioCapture::new(config, tx, device_name)
            .context("failed to start audio capture")?;
        Ok(Self {
            rx,
            sample_rate: config.sample_rate,
            channels: config.channels as usize,
            _capture: capture,
        })
    }
}

impl AudioSource for DeviceSource {
    fn next_buffer(&mut self) -> anyhow::Result<Option<Vec<f32>>> {
        match self.rx.recv() {
            Ok(data) => Ok(Some(data)),
            Err(_) => Ok(None),
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }
}

/// WAV file read fully into memory and replayed in chunks
pub struct WavFileSource {
    samples: Vec<f32>,
    position: usize,
    chunk_size: usize,
    sample_rate: u32,
    channels: usize,
}

impl WavFileSource {
    /// `chunk_frames` frames are returned per buffer
    pub fn new<P: AsRef<Path>>(path: P, chunk_frames: usize) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            anyhow::bail!("{} has no channels", path.display());
        }

        let samples = Self::read_samples(reader, &spec)?;
        log::debug!(
            "Loaded {}: {} Hz, {} channels, {} frames",
            path.display(),
            spec.sample_rate,
            channels,
            samples.len() / channels
        );

        Ok(Self {
            samples,
            position: 0,
            chunk_size: chunk_frames.max(1) * channels,
            sample_rate: spec.sample_rate,
            channels,
        })
    }

    fn read_samples(
        mut reader: WavReader<BufReader<File>>,
        spec: &hound::WavSpec,
    ) -> anyhow::Result<Vec<f32>> {
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max_val = 2_i32.pow(spec.bits_per_sample as u32 - 1) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(samples)
    }

    /// All samples, interleaved
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// One channel of the whole file
    pub fn channel(&self, index: usize) -> Vec<f32> {
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels)
            .copied()
            .collect()
    }
}

impl AudioSource for WavFileSource {
    fn next_buffer(&mut self) -> anyhow::Result<Option<Vec<f32>>> {
        if self.position >= self.samples.len() {
            return Ok(None);
        }

        let end = (self.position + self.chunk_size).min(self.samples.len());
        let chunk = self.samples[self.position..end].to_vec();
        self.position = end;

        Ok(Some(chunk))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }
}

/// Raw 16-bit little-endian stereo PCM from any reader, e.g. stdin
pub struct Pcm16StreamSource<R> {
    reader: R,
    sample_rate: u32,
    buffer: Vec<u8>,
    /// Bytes of an incomplete frame carried into the next read
    carry: usize,
}

impl<R: Read + Send> Pcm16StreamSource<R> {
    pub fn new(reader: R, sample_rate: u32, chunk_frames: usize) -> Self {
        Self {
            reader,
            sample_rate,
            buffer: vec![0; chunk_frames.max(1) * FRAME_BYTES],
            carry: 0,
        }
    }
}

impl<R: Read + Send> AudioSource for Pcm16StreamSource<R> {
    fn next_buffer(&mut self) -> anyhow::Result<Option<Vec<f32>>> {
        loop {
            let read = match self.reader.read(&mut self.buffer[self.carry..]) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("failed to read PCM stream"),
            };
            if read == 0 {
                if self.carry > 0 {
                    log::warn!("Discarding {} bytes of a partial frame", self.carry);
                    self.carry = 0;
                }
                return Ok(None);
            }

            let filled = self.carry + read;
            let whole = filled - filled % FRAME_BYTES;
            if whole == 0 {
                self.carry = filled;
                continue;
            }

            let samples = pcm::decode_interleaved(&self.buffer[..whole]);
            self.buffer.copy_within(whole..filled, 0);
            self.carry = filled - whole;
            return Ok(Some(samples));
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        2
    }
}
