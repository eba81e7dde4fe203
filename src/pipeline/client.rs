use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::types::{
    ArretRequest, DictationResult, Relance, StructureResponse, TranscriptionResponse,
};
use super::PipelineError;
use crate::config::Config;
use crate::recording::AudioPayload;

/// The stages the consultation flow drives (seam for mocking).
#[async_trait]
pub trait ConsultPipeline: Send + Sync {
    /// Stage 1 — transcribe a finalized audio payload.
    async fn transcribe(&self, audio: &AudioPayload)
        -> Result<TranscriptionResponse, PipelineError>;

    /// Stage 2 — structure a transcript into consultation fields.
    async fn structure(&self, text: &str) -> Result<StructureResponse, PipelineError>;

    /// Stage 3 — clarification check on the structured fields.
    async fn relance(&self, fields: &DictationResult) -> Result<Relance, PipelineError>;
}

/// HTTP client for the remote consultation pipeline.
///
/// One request per stage, no automatic retry: a non-success status maps
/// to the stage's typed error and is surfaced once at the trigger
/// boundary.
pub struct ConsultApiClient {
    api_base: String,
    dictation_webhook: String,
    client: reqwest::Client,
}

/// Request body for the structuring endpoint.
#[derive(serde::Serialize)]
struct StructureRequest<'a> {
    text: &'a str,
}

/// Response body of the clarification endpoint.
#[derive(serde::Deserialize)]
struct RelanceResponse {
    question: String,
}

impl ConsultApiClient {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            dictation_webhook: config.dictation_webhook_url.clone(),
            client,
        }
    }

    fn multipart_audio(audio: &AudioPayload) -> Result<reqwest::multipart::Form, PipelineError> {
        let part = reqwest::multipart::Part::bytes(audio.data.clone())
            .file_name(audio.file_name())
            .mime_str(audio.essence())
            .map_err(|e| PipelineError::Http(e.to_string()))?;
        Ok(reqwest::multipart::Form::new().part("file", part))
    }

    /// Stage 5 — generate the work-stoppage certificate PDF.
    ///
    /// Required fields are validated client-side first: a missing one
    /// aborts before any request is sent. A success status with a
    /// non-PDF `Content-Type` is still an error.
    pub async fn generate_arret(&self, request: &ArretRequest) -> Result<Vec<u8>, PipelineError> {
        request.validate()?;

        let url = format!("{}/api/arret", self.api_base);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| PipelineError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::DocumentGeneration {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        ensure_pdf_content_type(content_type)?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Http(e.to_string()))?;
        tracing::info!(size = bytes.len(), "arrêt de travail PDF received");
        Ok(bytes.to_vec())
    }

    /// Alternate flow — the dictation webhook returns the four
    /// structured fields directly, bypassing transcribe/structure.
    pub async fn dictate(&self, audio: &AudioPayload) -> Result<DictationResult, PipelineError> {
        let form = Self::multipart_audio(audio)?;
        let response = self
            .client
            .post(&self.dictation_webhook)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Dictation {
                status: status.as_u16(),
            });
        }

        response
            .json::<DictationResult>()
            .await
            .map_err(|e| PipelineError::ResponseParsing(e.to_string()))
    }
}

/// A success status is not enough for the PDF stage: anything but an
/// `application/pdf` body is an error, even on HTTP 200.
fn ensure_pdf_content_type(content_type: &str) -> Result<(), PipelineError> {
    if content_type.contains("application/pdf") {
        Ok(())
    } else {
        Err(PipelineError::NotPdf {
            content_type: content_type.to_string(),
        })
    }
}

#[async_trait]
impl ConsultPipeline for ConsultApiClient {
    async fn transcribe(
        &self,
        audio: &AudioPayload,
    ) -> Result<TranscriptionResponse, PipelineError> {
        let url = format!("{}/api/transcribe", self.api_base);
        let form = Self::multipart_audio(audio)?;

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Transcription {
                status: status.as_u16(),
            });
        }

        response
            .json::<TranscriptionResponse>()
            .await
            .map_err(|e| PipelineError::ResponseParsing(e.to_string()))
    }

    async fn structure(&self, text: &str) -> Result<StructureResponse, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::MissingField("texte transcrit"));
        }

        let url = format!("{}/api/structure", self.api_base);
        let response = self
            .client
            .post(&url)
            .json(&StructureRequest { text })
            .send()
            .await
            .map_err(|e| PipelineError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Structuring {
                status: status.as_u16(),
            });
        }

        response
            .json::<StructureResponse>()
            .await
            .map_err(|e| PipelineError::ResponseParsing(e.to_string()))
    }

    async fn relance(&self, fields: &DictationResult) -> Result<Relance, PipelineError> {
        let url = format!("{}/api/relance", self.api_base);
        let response = self
            .client
            .post(&url)
            .json(fields)
            .send()
            .await
            .map_err(|e| PipelineError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Clarification {
                status: status.as_u16(),
            });
        }

        let parsed: RelanceResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::ResponseParsing(e.to_string()))?;
        Ok(Relance::from_wire(&parsed.question))
    }
}
