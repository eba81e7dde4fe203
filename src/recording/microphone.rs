//! Microphone capture via the system audio host.
//!
//! Samples are captured at the device's native config, mixed to mono
//! and finalized as one 16-bit PCM WAV chunk on stop.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::capture::AudioCapture;
use super::codec;
use super::CaptureError;

pub struct CpalCapture {
    device: cpal::Device,
    stream: Option<cpal::Stream>,
    samples: Arc<Mutex<Vec<i16>>>,
    sample_rate: u32,
    channels: u16,
    sample_format: cpal::SampleFormat,
    config: cpal::StreamConfig,
}

impl CpalCapture {
    /// Open the default input device. Fails with `DeviceNotFound` when
    /// the host exposes no microphone.
    pub fn new() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::DeviceNotFound)?;

        let supported = device
            .default_input_config()
            .map_err(map_config_error)?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            stream: None,
            samples: Arc::new(Mutex::new(Vec::new())),
            sample_rate: config.sample_rate,
            channels: config.channels,
            sample_format,
            config,
        })
    }
}

impl AudioCapture for CpalCapture {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let channels = self.channels as usize;
        let stream = match self.sample_format {
            cpal::SampleFormat::I16 => {
                let buffer = Arc::clone(&self.samples);
                self.device.build_input_stream(
                    &self.config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let mono = mix_to_mono(data, channels);
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&mono);
                        }
                    },
                    log_stream_error,
                    None,
                )
            }
            cpal::SampleFormat::F32 => {
                let buffer = Arc::clone(&self.samples);
                self.device.build_input_stream(
                    &self.config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let pcm: Vec<i16> = data
                            .iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                            .collect();
                        let mono = mix_to_mono(&pcm, channels);
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&mono);
                        }
                    },
                    log_stream_error,
                    None,
                )
            }
            format => {
                return Err(CaptureError::Unsupported(format!(
                    "format d'échantillon natif {format:?}"
                )))
            }
        }
        .map_err(map_build_error)?;

        stream.play().map_err(map_play_error)?;
        self.stream = Some(stream);
        tracing::debug!(
            rate = self.sample_rate,
            channels = self.channels,
            "microphone stream started"
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<Vec<Vec<u8>>, CaptureError> {
        // Dropping the stream releases the capture device, whatever
        // happens to finalization below.
        self.stream = None;

        let samples = self
            .samples
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default();

        let wav = encode_wav(&samples, self.sample_rate)
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        Ok(vec![wav])
    }

    fn supports_codec(&self, mime: &str) -> bool {
        codec::essence(mime) == "audio/wav"
    }
}

fn log_stream_error(error: cpal::StreamError) {
    tracing::warn!(%error, "audio stream error");
}

/// Mix interleaved frames to mono by averaging channels.
fn mix_to_mono(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Encode mono 16-bit PCM samples as an in-memory WAV file.
fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buffer = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buffer);
        let mut writer = hound::WavWriter::new(cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(buffer)
}

fn map_config_error(error: cpal::DefaultStreamConfigError) -> CaptureError {
    match error {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::DeviceNotFound,
        cpal::DefaultStreamConfigError::StreamTypeNotSupported => {
            CaptureError::Unsupported("aucun format de capture disponible".into())
        }
        cpal::DefaultStreamConfigError::BackendSpecific { err } => {
            map_backend_description(err.description)
        }
    }
}

fn map_build_error(error: cpal::BuildStreamError) -> CaptureError {
    match error {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceNotFound,
        cpal::BuildStreamError::StreamConfigNotSupported => {
            CaptureError::Unsupported("configuration de capture refusée".into())
        }
        cpal::BuildStreamError::BackendSpecific { err } => map_backend_description(err.description),
        other => CaptureError::Backend(other.to_string()),
    }
}

fn map_play_error(error: cpal::PlayStreamError) -> CaptureError {
    match error {
        cpal::PlayStreamError::DeviceNotAvailable => CaptureError::DeviceNotFound,
        cpal::PlayStreamError::BackendSpecific { err } => map_backend_description(err.description),
    }
}

/// The audio hosts report permission denial only through their backend
/// message, so the denial reason is recovered from the description.
fn map_backend_description(description: String) -> CaptureError {
    let lower = description.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("access") {
        CaptureError::PermissionDenied
    } else {
        CaptureError::Backend(description)
    }
}
