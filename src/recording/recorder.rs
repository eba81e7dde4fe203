use super::capture::AudioCapture;
use super::codec::negotiate_codec;
use super::{AudioPayload, CaptureError};

/// Accumulates audio chunks from a capture backend and finalizes them
/// into a single payload tagged with the negotiated codec.
///
/// Only one recording may be in flight at a time; the guard is local
/// state, not a queue — a second `start` is simply rejected.
pub struct Recorder<C: AudioCapture> {
    capture: C,
    mime_type: &'static str,
    recording: bool,
}

impl<C: AudioCapture> Recorder<C> {
    /// The codec is negotiated once, when the recorder is created.
    pub fn new(capture: C) -> Self {
        let mime_type = negotiate_codec(|codec| capture.supports_codec(codec));
        Self {
            capture,
            mime_type,
            recording: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.recording {
            return Err(CaptureError::AlreadyRecording);
        }
        self.capture.start()?;
        self.recording = true;
        tracing::info!(codec = self.mime_type, "recording started");
        Ok(())
    }

    /// Finalize the accumulated chunks into one payload. The device is
    /// released unconditionally, even when finalization fails; empty
    /// chunks are dropped.
    pub fn stop(&mut self) -> Result<AudioPayload, CaptureError> {
        if !self.recording {
            return Err(CaptureError::NotRecording);
        }
        self.recording = false;
        let chunks = self.capture.stop()?;

        let mut data = Vec::new();
        for chunk in chunks.iter().filter(|c| !c.is_empty()) {
            data.extend_from_slice(chunk);
        }
        tracing::info!(codec = self.mime_type, size = data.len(), "recording finalized");
        Ok(AudioPayload {
            data,
            mime_type: self.mime_type.to_string(),
        })
    }
}
