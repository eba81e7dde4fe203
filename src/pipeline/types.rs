use serde::{Deserialize, Deserializer, Serialize};

use super::PipelineError;
use crate::models::Consultation;

/// The structuring endpoint signals "nothing to ask" with this literal
/// marker in the relance field.
pub const RELANCE_OK_MARKER: &str = "Ok";

/// Response of the transcription endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionResponse {
    pub text: String,
}

/// One ICD-10 (CIM-10) candidate proposed by the structuring endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub cim10: String,
    pub libelle: String,
    /// Probability in percent, as sent by the endpoint.
    pub prob: f64,
}

/// Structured consultation fields returned by the structuring endpoint.
///
/// Parsing is lenient and total: absent text fields become empty
/// strings and malformed diagnostic entries are skipped, so a partial
/// server answer still flows into the form fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureResponse {
    #[serde(default)]
    pub motif: String,
    #[serde(default)]
    pub symptomes: String,
    #[serde(default)]
    pub examen: String,
    #[serde(default)]
    pub antecedents: String,
    #[serde(default, rename = "syntheseSOAP")]
    pub synthese_soap: String,
    #[serde(default)]
    pub news2: String,
    #[serde(default, rename = "drapeauxRouges")]
    pub drapeaux_rouges: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default, deserialize_with = "lenient_diagnostics")]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub ordonnance: String,
    #[serde(default)]
    pub courrier: String,
    #[serde(default, rename = "ficheETP")]
    pub fiche_etp: String,
    #[serde(default, rename = "codeNGAP")]
    pub code_ngap: String,
    #[serde(default)]
    pub relance: String,
}

impl StructureResponse {
    /// The four narrative fields, in the shape the clarification
    /// endpoint and the dictation webhook share.
    pub fn dictation_fields(&self) -> DictationResult {
        DictationResult {
            motif: self.motif.clone(),
            symptomes: self.symptomes.clone(),
            examen: self.examen.clone(),
            antecedents: self.antecedents.clone(),
        }
    }
}

/// Skip diagnostic entries that fail to deserialize instead of
/// rejecting the whole response.
fn lenient_diagnostics<'de, D>(deserializer: D) -> Result<Vec<Diagnostic>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
    Ok(items
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

/// Structured fields returned directly by the voice-dictation webhook
/// (the alternate flow that bypasses separate transcribe/structure
/// calls). Also the request body of the clarification endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DictationResult {
    #[serde(default)]
    pub motif: String,
    #[serde(default)]
    pub symptomes: String,
    #[serde(default)]
    pub examen: String,
    #[serde(default)]
    pub antecedents: String,
}

/// Outcome of the clarification check that runs automatically right
/// after structuring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relance {
    /// The structured data is judged complete; nothing to ask.
    Ok,
    /// A clarifying question to surface to the physician.
    Question(String),
}

impl Relance {
    /// Map the wire value: the literal `"Ok"` (or an empty answer)
    /// means no follow-up is needed.
    pub fn from_wire(question: &str) -> Self {
        let question = question.trim();
        if question.is_empty() || question == RELANCE_OK_MARKER {
            Relance::Ok
        } else {
            Relance::Question(question.to_string())
        }
    }

    pub fn question(&self) -> Option<&str> {
        match self {
            Relance::Ok => None,
            Relance::Question(q) => Some(q),
        }
    }
}

/// Consultation fields sent to the analysis function (camelCase wire
/// keys, optional demographics).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationData {
    pub motif: String,
    pub symptoms: String,
    pub clinical_exam: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_gender: Option<String>,
}

impl ConsultationData {
    pub fn new(motif: &str, symptoms: &str, clinical_exam: &str) -> Self {
        Self {
            motif: motif.to_string(),
            symptoms: symptoms.to_string(),
            clinical_exam: clinical_exam.to_string(),
            patient_age: None,
            patient_gender: None,
        }
    }

    pub fn from_consultation(consultation: &Consultation) -> Self {
        Self::new(
            &consultation.motif,
            &consultation.symptoms,
            &consultation.clinical_exam,
        )
    }
}

/// Work-stoppage certificate request (wire shape of the PDF endpoint).
#[derive(Debug, Clone, Serialize)]
pub struct ArretRequest {
    pub patient: ArretPatient,
    pub motif: String,
    pub dates: ArretDates,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArretPatient {
    pub nom: String,
    pub prenom: String,
    #[serde(rename = "dateNaissance")]
    pub date_naissance: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArretDates {
    pub debut: String,
    pub fin: String,
}

impl ArretRequest {
    /// Required fields must be present before any network call is
    /// attempted; a missing one blocks the call entirely.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.patient.nom.trim().is_empty() {
            return Err(PipelineError::MissingField("nom"));
        }
        if self.patient.prenom.trim().is_empty() {
            return Err(PipelineError::MissingField("prénom"));
        }
        if self.dates.debut.trim().is_empty() {
            return Err(PipelineError::MissingField("date de début"));
        }
        if self.dates.fin.trim().is_empty() {
            return Err(PipelineError::MissingField("date de fin"));
        }
        Ok(())
    }
}
