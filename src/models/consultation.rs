use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::AiAnalysis;
use super::treatment::Treatment;

/// One consultation episode. Created on first save, then mutated each
/// time a pipeline stage completes; never deleted during a session.
///
/// `patient_id` joins the roster by id equality only — the store keeps
/// the roster's nested copy and the "current" pointer in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub date: DateTime<Utc>,
    pub motif: String,
    pub symptoms: String,
    pub clinical_exam: String,
    #[serde(default)]
    pub documents: Vec<AttachedDocument>,
    pub ai_analysis: Option<AiAnalysis>,
    pub selected_diagnosis: Option<String>,
    pub treatment: Option<Treatment>,
    pub referral_letter: Option<String>,
    pub educational_sheet: Option<String>,
}

impl Consultation {
    pub fn new(patient_id: Uuid, motif: &str, symptoms: &str, clinical_exam: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            date: Utc::now(),
            motif: motif.to_string(),
            symptoms: symptoms.to_string(),
            clinical_exam: clinical_exam.to_string(),
            documents: Vec::new(),
            ai_analysis: None,
            selected_diagnosis: None,
            treatment: None,
            referral_letter: None,
            educational_sheet: None,
        }
    }

    /// Attach a new analysis, replacing any previous one wholesale.
    pub fn with_analysis(mut self, analysis: AiAnalysis) -> Self {
        self.ai_analysis = Some(analysis);
        self
    }
}

/// A raw file the physician attached to the consultation (kept in
/// memory only, like everything else in the session).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachedDocument {
    pub name: String,
    pub data: Vec<u8>,
}
