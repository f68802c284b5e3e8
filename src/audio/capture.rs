use crate::config::AudioConfig;
use crate::error::{Result, TempoError};
use audio_thread_priority::RtPriorityHandle;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

/// Live input stream feeding interleaved `f32` buffers into a channel
pub struct AudioCapture {
    stream: cpal::Stream,
    _rt_handle: Option<RtPriorityHandle>,
}

impl AudioCapture {
    /// Open an input device and start streaming
    ///
    /// `device_name` selects the first input whose name contains it; the
    /// default input device is used otherwise.
    pub fn new(
        config: &AudioConfig,
        tx: Sender<Vec<f32>>,
        device_name: Option<&str>,
    ) -> Result<Self> {
        let device = select_device(device_name)?;

        match device.description() {
            Ok(desc) => log::info!("Input device: {}", desc.name()),
            Err(_) => log::info!("Input device: Unknown"),
        }

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size as u32),
        };

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Drop the buffer rather than block the audio thread
                    if let Err(e) = tx.try_send(data.to_vec()) {
                        if e.is_disconnected() {
                            log::warn!("Audio receiver dropped");
                        } else {
                            log::warn!("Processing is falling behind, dropped audio buffer");
                        }
                    }
                },
                |err| log::error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| TempoError::AudioStream(format!("{}", e)))?;

        let rt_handle = match audio_thread_priority::promote_current_thread_to_real_time(
            config.buffer_size as u32,
            config.sample_rate,
        ) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Could not set real-time priority: {}", e);
                None
            }
        };

        stream
            .play()
            .map_err(|e| TempoError::AudioStream(format!("{}", e)))?;

        Ok(Self {
            stream,
            _rt_handle: rt_handle,
        })
    }
}

fn select_device(device_name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    let Some(wanted) = device_name else {
        return host
            .default_input_device()
            .ok_or_else(|| TempoError::AudioDevice("No input device found".into()));
    };

    let devices = host
        .input_devices()
        .map_err(|e| TempoError::AudioDevice(format!("{}", e)))?;
    for device in devices {
        if let Ok(desc) = device.description()
            && desc.name().contains(wanted)
        {
            return Ok(device);
        }
    }
    Err(TempoError::AudioDevice(format!("No input device matching '{}'", wanted)))
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        let _ = self.stream.pause();
    }
}
