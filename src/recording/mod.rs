pub mod capture;
pub mod codec;
pub mod microphone;
pub mod recorder;

pub use capture::{AudioCapture, MockCapture};
pub use codec::{negotiate_codec, CODEC_PREFERENCES, DEFAULT_CODEC};
pub use microphone::CpalCapture;
pub use recorder::Recorder;

use std::path::Path;

use thiserror::Error;

/// Capture-stage errors. The first three mirror the platform's denial
/// reasons and each carries its own user-facing message.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Accès au microphone refusé. Veuillez autoriser l'accès au microphone.")]
    PermissionDenied,

    #[error("Aucun microphone détecté. Veuillez vérifier qu'un microphone est connecté.")]
    DeviceNotFound,

    #[error("Enregistrement audio non supporté sur cette plateforme : {0}")]
    Unsupported(String),

    #[error("Erreur du périphérique audio : {0}")]
    Backend(String),

    #[error("Un enregistrement est déjà en cours")]
    AlreadyRecording,

    #[error("Aucun enregistrement en cours")]
    NotRecording,
}

/// Finalized audio produced by a capture session (or picked from disk),
/// tagged with the negotiated codec identifier.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl AudioPayload {
    /// The codec identifier without its parameters
    /// (`audio/webm;codecs=opus` → `audio/webm`).
    pub fn essence(&self) -> &str {
        codec::essence(&self.mime_type)
    }

    /// Upload filename, extension derived from the container.
    pub fn file_name(&self) -> String {
        format!("dictation.{}", codec::extension_for(&self.mime_type))
    }

    /// Load an audio file the physician picked instead of dictating
    /// live; the codec is inferred from the file extension.
    pub fn from_file(path: &Path) -> Result<Self, CaptureError> {
        let data = std::fs::read(path).map_err(|e| CaptureError::Backend(e.to_string()))?;
        let mime_type = match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("wav") => "audio/wav",
            Some("mp4") | Some("m4a") => "audio/mp4",
            Some("ogg") => "audio/ogg",
            _ => DEFAULT_CODEC,
        };
        Ok(Self {
            data,
            mime_type: mime_type.to_string(),
        })
    }
}
