use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::ConsultationData;
use super::PipelineError;
use crate::config::Config;
use crate::models::AiAnalysis;

/// Confidence carried by the locally synthesized fallback analysis.
pub const FALLBACK_CONFIDENCE: f64 = 0.6;

/// Errors internal to the analysis stage. They never cross the stage
/// boundary: `analyze_or_fallback` converts every failure into the
/// generic fallback analysis so the workflow is never blocked by AI
/// unavailability.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Erreur réseau : {0}")]
    Http(String),

    #[error("Le service d'analyse a répondu avec le statut {0}")]
    Service(u16),

    #[error("Réponse d'analyse illisible : {0}")]
    ResponseParsing(String),
}

/// Backend of the analysis stage (seam for mocking).
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(&self, data: &ConsultationData) -> Result<AiAnalysis, AnalysisError>;
}

/// Client of the analysis function (a serverless wrapper around a
/// chat-completion model; the function itself already falls back to a
/// generic analysis when the model's reply is not strict JSON).
pub struct RemoteAnalyzer {
    url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    consultation: &'a ConsultationData,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    analysis: AiAnalysis,
}

impl RemoteAnalyzer {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            url: config.analysis_fn_url.clone(),
            client,
        }
    }
}

#[async_trait]
impl AnalysisProvider for RemoteAnalyzer {
    async fn analyze(&self, data: &ConsultationData) -> Result<AiAnalysis, AnalysisError> {
        let response = self
            .client
            .post(&self.url)
            .json(&AnalyzeRequest { consultation: data })
            .send()
            .await
            .map_err(|e| AnalysisError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Service(status.as_u16()));
        }

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ResponseParsing(e.to_string()))?;
        Ok(parsed.analysis)
    }
}

/// The generic analysis substituted whenever the remote stage is
/// unavailable. Always structurally valid: non-empty synthesis,
/// non-empty differential, confidence in [0, 1].
pub fn fallback_analysis(motif: &str) -> AiAnalysis {
    AiAnalysis {
        clinical_synthesis: format!("Analyse de la consultation pour : {motif}"),
        differential_diagnosis: vec![
            "Diagnostic nécessitant une évaluation complémentaire".into(),
            "Syndrome à préciser".into(),
            "Affection bénigne probable".into(),
        ],
        recommended_treatment: "Traitement symptomatique et surveillance recommandés".into(),
        confidence: FALLBACK_CONFIDENCE,
    }
}

/// Run the analysis stage with soft degradation.
///
/// Missing motif or symptoms is a validation error raised before the
/// provider is consulted (the stage may run without any dictation, but
/// not on an empty form). Once validation passes the call cannot fail:
/// any provider error degrades to the fallback analysis.
pub async fn analyze_or_fallback(
    provider: &dyn AnalysisProvider,
    data: &ConsultationData,
) -> Result<AiAnalysis, PipelineError> {
    if data.motif.trim().is_empty() {
        return Err(PipelineError::MissingField("motif"));
    }
    if data.symptoms.trim().is_empty() {
        return Err(PipelineError::MissingField("symptômes"));
    }

    match provider.analyze(data).await {
        Ok(analysis) => Ok(analysis),
        Err(e) => {
            tracing::warn!(error = %e, "analysis unavailable, substituting fallback");
            Ok(fallback_analysis(&data.motif))
        }
    }
}

/// Mock provider synthesizing a canned analysis from the consultation
/// fields, optionally after a simulated latency.
pub struct MockAnalysisProvider {
    delay: Option<Duration>,
}

impl MockAnalysisProvider {
    pub fn new() -> Self {
        Self { delay: None }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Default for MockAnalysisProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisProvider for MockAnalysisProvider {
    async fn analyze(&self, data: &ConsultationData) -> Result<AiAnalysis, AnalysisError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(AiAnalysis {
            clinical_synthesis: format!(
                "Synthèse clinique pour {}: {}",
                data.motif, data.symptoms
            ),
            differential_diagnosis: vec![
                "Diagnostic principal probable".into(),
                "Diagnostic différentiel 1".into(),
                "Diagnostic différentiel 2".into(),
            ],
            recommended_treatment:
                "Traitement symptomatique recommandé. Consultation de suivi nécessaire.".into(),
            confidence: 0.8,
        })
    }
}

/// Provider that always fails — exercises the degradation path.
pub struct FailingAnalysisProvider;

#[async_trait]
impl AnalysisProvider for FailingAnalysisProvider {
    async fn analyze(&self, _data: &ConsultationData) -> Result<AiAnalysis, AnalysisError> {
        Err(AnalysisError::Http("connexion refusée".into()))
    }
}
