use thiserror::Error;

use super::analyze::{analyze_or_fallback, AnalysisProvider};
use super::client::ConsultPipeline;
use super::types::{ConsultationData, Relance, StructureResponse};
use super::PipelineError;
use crate::models::AiAnalysis;
use crate::recording::AudioPayload;

/// Stages of one consultation, in pipeline order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowStage {
    #[default]
    Idle,
    Recording,
    Transcribing,
    Structuring,
    AwaitingClarification,
    Analyzing,
    Done,
    Failed,
}

impl FlowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Transcribing => "transcribing",
            Self::Structuring => "structuring",
            Self::AwaitingClarification => "awaiting_clarification",
            Self::Analyzing => "analyzing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Transition invalide : {from:?} → {to:?}")]
    InvalidTransition { from: FlowStage, to: FlowStage },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Explicit state machine for one consultation.
///
/// Guarded transitions make "only one stage in flight" structural: a
/// step invoked out of order returns `InvalidTransition` without
/// touching the accumulated artifacts, and a stage cannot run twice.
/// Stage failures move to `Failed` (error retained for the
/// notification boundary); the analysis step cannot fail once its
/// validation passes, by construction of the degradation wrapper.
#[derive(Debug, Default)]
pub struct ConsultationFlow {
    stage: FlowStage,
    transcript: Option<String>,
    fields: Option<StructureResponse>,
    clarification: Option<String>,
    analysis: Option<AiAnalysis>,
    last_error: Option<String>,
}

impl ConsultationFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    pub fn fields(&self) -> Option<&StructureResponse> {
        self.fields.as_ref()
    }

    /// The clarifying question surfaced by the relance check, if any.
    pub fn clarification(&self) -> Option<&str> {
        self.clarification.as_deref()
    }

    pub fn analysis(&self) -> Option<&AiAnalysis> {
        self.analysis.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn guard(&self, expected: &[FlowStage], to: FlowStage) -> Result<(), FlowError> {
        if expected.contains(&self.stage) {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                from: self.stage,
                to,
            })
        }
    }

    fn fail(&mut self, error: PipelineError) -> FlowError {
        tracing::warn!(stage = self.stage.as_str(), error = %error, "pipeline stage failed");
        self.stage = FlowStage::Failed;
        self.last_error = Some(error.to_string());
        FlowError::Pipeline(error)
    }

    /// Idle → Recording. A second recording cannot start while one is
    /// in flight.
    pub fn start_recording(&mut self) -> Result<(), FlowError> {
        self.guard(&[FlowStage::Idle], FlowStage::Recording)?;
        self.stage = FlowStage::Recording;
        Ok(())
    }

    /// Stage 1. Entered from `Idle` (audio file picked by the
    /// physician) or `Recording` (live dictation just stopped).
    pub async fn run_transcription(
        &mut self,
        pipeline: &dyn ConsultPipeline,
        audio: &AudioPayload,
    ) -> Result<&str, FlowError> {
        self.guard(
            &[FlowStage::Idle, FlowStage::Recording],
            FlowStage::Transcribing,
        )?;
        self.stage = FlowStage::Transcribing;
        tracing::info!(codec = %audio.mime_type, size = audio.data.len(), "transcription started");

        match pipeline.transcribe(audio).await {
            Ok(response) => Ok(self.transcript.insert(response.text).as_str()),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Stage 2 + 3. Structures the transcript, then runs the relance
    /// check immediately — the clarification is never on demand.
    pub async fn run_structuring(
        &mut self,
        pipeline: &dyn ConsultPipeline,
    ) -> Result<&StructureResponse, FlowError> {
        self.guard(&[FlowStage::Transcribing], FlowStage::Structuring)?;
        let transcript = match self.transcript.clone() {
            Some(t) => t,
            None => return Err(self.fail(PipelineError::MissingField("texte transcrit"))),
        };
        self.stage = FlowStage::Structuring;

        let fields = match pipeline.structure(&transcript).await {
            Ok(fields) => fields,
            Err(e) => return Err(self.fail(e)),
        };

        match pipeline.relance(&fields.dictation_fields()).await {
            Ok(Relance::Ok) => self.clarification = None,
            Ok(Relance::Question(question)) => {
                tracing::info!(%question, "clarification requested");
                self.clarification = Some(question);
            }
            Err(e) => return Err(self.fail(e)),
        }

        self.stage = FlowStage::AwaitingClarification;
        Ok(&*self.fields.insert(fields))
    }

    /// Hand-typed entry: the physician fills the fields without any
    /// dictation. Analysis still requires motif and symptoms.
    pub fn begin_manual(
        &mut self,
        motif: &str,
        symptomes: &str,
        examen: &str,
    ) -> Result<(), FlowError> {
        self.guard(&[FlowStage::Idle], FlowStage::AwaitingClarification)?;
        self.fields = Some(StructureResponse {
            motif: motif.to_string(),
            symptomes: symptomes.to_string(),
            examen: examen.to_string(),
            ..StructureResponse::default()
        });
        self.stage = FlowStage::AwaitingClarification;
        Ok(())
    }

    /// Stage 4. Validation failures block the call and leave the stage
    /// untouched; once it passes the step cannot fail (any provider
    /// error degrades to the fallback analysis).
    pub async fn run_analysis(
        &mut self,
        provider: &dyn AnalysisProvider,
    ) -> Result<&AiAnalysis, FlowError> {
        self.guard(&[FlowStage::AwaitingClarification], FlowStage::Analyzing)?;
        let data = match self.fields.as_ref() {
            Some(fields) => ConsultationData::new(&fields.motif, &fields.symptomes, &fields.examen),
            None => return Err(FlowError::Pipeline(PipelineError::MissingField("motif"))),
        };
        if data.motif.trim().is_empty() {
            return Err(FlowError::Pipeline(PipelineError::MissingField("motif")));
        }
        if data.symptoms.trim().is_empty() {
            return Err(FlowError::Pipeline(PipelineError::MissingField(
                "symptômes",
            )));
        }

        self.stage = FlowStage::Analyzing;
        let analysis = analyze_or_fallback(provider, &data).await?;
        self.stage = FlowStage::Done;
        Ok(&*self.analysis.insert(analysis))
    }

    /// Start over (after `Done` or `Failed`); clears every artifact.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analyze::{FailingAnalysisProvider, MockAnalysisProvider};
    use crate::pipeline::types::{DictationResult, TranscriptionResponse};
    use async_trait::async_trait;

    /// Pipeline double with per-stage configurable failures.
    struct MockPipeline {
        transcript: String,
        fields: StructureResponse,
        relance: Relance,
        fail_transcribe: bool,
        fail_structure: bool,
        fail_relance: bool,
    }

    impl MockPipeline {
        fn new() -> Self {
            Self {
                transcript: "Patient fébrile depuis deux jours, gorge douloureuse.".into(),
                fields: StructureResponse {
                    motif: "Fièvre".into(),
                    symptomes: "Fièvre à 39°C, odynophagie".into(),
                    examen: "Gorge érythémateuse".into(),
                    ..StructureResponse::default()
                },
                relance: Relance::Ok,
                fail_transcribe: false,
                fail_structure: false,
                fail_relance: false,
            }
        }

        fn with_question(mut self, question: &str) -> Self {
            self.relance = Relance::Question(question.to_string());
            self
        }
    }

    #[async_trait]
    impl ConsultPipeline for MockPipeline {
        async fn transcribe(
            &self,
            _audio: &AudioPayload,
        ) -> Result<TranscriptionResponse, PipelineError> {
            if self.fail_transcribe {
                return Err(PipelineError::Transcription { status: 500 });
            }
            Ok(TranscriptionResponse {
                text: self.transcript.clone(),
            })
        }

        async fn structure(&self, _text: &str) -> Result<StructureResponse, PipelineError> {
            if self.fail_structure {
                return Err(PipelineError::Structuring { status: 502 });
            }
            Ok(self.fields.clone())
        }

        async fn relance(&self, _fields: &DictationResult) -> Result<Relance, PipelineError> {
            if self.fail_relance {
                return Err(PipelineError::Clarification { status: 500 });
            }
            Ok(self.relance.clone())
        }
    }

    fn audio() -> AudioPayload {
        AudioPayload {
            data: vec![0u8; 64],
            mime_type: "audio/webm".into(),
        }
    }

    #[tokio::test]
    async fn full_flow_reaches_done() {
        let pipeline = MockPipeline::new();
        let mut flow = ConsultationFlow::new();

        flow.start_recording().unwrap();
        assert_eq!(flow.stage(), FlowStage::Recording);

        flow.run_transcription(&pipeline, &audio()).await.unwrap();
        assert!(flow.transcript().unwrap().contains("fébrile"));

        flow.run_structuring(&pipeline).await.unwrap();
        assert_eq!(flow.stage(), FlowStage::AwaitingClarification);
        assert!(flow.clarification().is_none());

        let analysis = flow
            .run_analysis(&MockAnalysisProvider::new())
            .await
            .unwrap();
        assert!(analysis.clinical_synthesis.contains("Fièvre"));
        assert_eq!(flow.stage(), FlowStage::Done);
    }

    #[tokio::test]
    async fn transcription_accepts_a_picked_audio_file_from_idle() {
        let pipeline = MockPipeline::new();
        let mut flow = ConsultationFlow::new();
        flow.run_transcription(&pipeline, &audio()).await.unwrap();
        assert_eq!(flow.stage(), FlowStage::Transcribing);
    }

    #[tokio::test]
    async fn structuring_before_transcription_is_rejected_without_side_effects() {
        let pipeline = MockPipeline::new();
        let mut flow = ConsultationFlow::new();
        let result = flow.run_structuring(&pipeline).await;
        assert!(matches!(
            result,
            Err(FlowError::InvalidTransition {
                from: FlowStage::Idle,
                to: FlowStage::Structuring,
            })
        ));
        assert_eq!(flow.stage(), FlowStage::Idle);
        assert!(flow.fields().is_none());
    }

    #[tokio::test]
    async fn second_recording_cannot_start_while_one_is_active() {
        let mut flow = ConsultationFlow::new();
        flow.start_recording().unwrap();
        assert!(matches!(
            flow.start_recording(),
            Err(FlowError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn transcription_failure_moves_to_failed() {
        let pipeline = MockPipeline {
            fail_transcribe: true,
            ..MockPipeline::new()
        };
        let mut flow = ConsultationFlow::new();
        let result = flow.run_transcription(&pipeline, &audio()).await;
        assert!(matches!(
            result,
            Err(FlowError::Pipeline(PipelineError::Transcription {
                status: 500
            }))
        ));
        assert_eq!(flow.stage(), FlowStage::Failed);
        assert!(flow.last_error().unwrap().contains("transcription"));
    }

    #[tokio::test]
    async fn structuring_failure_moves_to_failed() {
        let pipeline = MockPipeline {
            fail_structure: true,
            ..MockPipeline::new()
        };
        let mut flow = ConsultationFlow::new();
        flow.run_transcription(&pipeline, &audio()).await.unwrap();
        let result = flow.run_structuring(&pipeline).await;
        assert!(matches!(
            result,
            Err(FlowError::Pipeline(PipelineError::Structuring { .. }))
        ));
        assert_eq!(flow.stage(), FlowStage::Failed);
        assert!(flow.fields().is_none());
    }

    #[tokio::test]
    async fn relance_failure_moves_to_failed() {
        let pipeline = MockPipeline {
            fail_relance: true,
            ..MockPipeline::new()
        };
        let mut flow = ConsultationFlow::new();
        flow.run_transcription(&pipeline, &audio()).await.unwrap();
        let result = flow.run_structuring(&pipeline).await;
        assert!(matches!(
            result,
            Err(FlowError::Pipeline(PipelineError::Clarification { .. }))
        ));
        assert_eq!(flow.stage(), FlowStage::Failed);
    }

    #[tokio::test]
    async fn clarification_question_is_surfaced() {
        let pipeline = MockPipeline::new().with_question("Depuis quand la fièvre dure-t-elle ?");
        let mut flow = ConsultationFlow::new();
        flow.run_transcription(&pipeline, &audio()).await.unwrap();
        flow.run_structuring(&pipeline).await.unwrap();
        assert_eq!(
            flow.clarification(),
            Some("Depuis quand la fièvre dure-t-elle ?")
        );
    }

    #[tokio::test]
    async fn manual_entry_skips_dictation_entirely() {
        let mut flow = ConsultationFlow::new();
        flow.begin_manual("Lombalgie", "Douleur lombaire mécanique", "Lasègue négatif")
            .unwrap();
        assert_eq!(flow.stage(), FlowStage::AwaitingClarification);

        let analysis = flow
            .run_analysis(&MockAnalysisProvider::new())
            .await
            .unwrap();
        assert!(analysis.clinical_synthesis.contains("Lombalgie"));
        assert_eq!(flow.stage(), FlowStage::Done);
    }

    #[tokio::test]
    async fn analysis_validation_blocks_without_changing_stage() {
        let mut flow = ConsultationFlow::new();
        flow.begin_manual("Lombalgie", "", "").unwrap();
        let result = flow.run_analysis(&MockAnalysisProvider::new()).await;
        assert!(matches!(
            result,
            Err(FlowError::Pipeline(PipelineError::MissingField(
                "symptômes"
            )))
        ));
        // The call was blocked before any transition: the physician can
        // complete the form and retry.
        assert_eq!(flow.stage(), FlowStage::AwaitingClarification);
    }

    #[tokio::test]
    async fn analysis_failure_still_completes_the_flow() {
        let pipeline = MockPipeline::new();
        let mut flow = ConsultationFlow::new();
        flow.run_transcription(&pipeline, &audio()).await.unwrap();
        flow.run_structuring(&pipeline).await.unwrap();

        let analysis = flow.run_analysis(&FailingAnalysisProvider).await.unwrap();
        assert!(!analysis.differential_diagnosis.is_empty());
        assert_eq!(flow.stage(), FlowStage::Done);
    }

    #[tokio::test]
    async fn reset_clears_artifacts() {
        let pipeline = MockPipeline::new();
        let mut flow = ConsultationFlow::new();
        flow.run_transcription(&pipeline, &audio()).await.unwrap();
        flow.reset();
        assert_eq!(flow.stage(), FlowStage::Idle);
        assert!(flow.transcript().is_none());
        assert!(flow.last_error().is_none());
    }
}
