//! In-memory consultation state shared by every controller.
//!
//! Wrapped in `Arc` at startup and injected into the controllers — no
//! ambient singleton. Initialized empty, torn down with the process:
//! nothing is persisted across sessions.

use std::sync::RwLock;

use thiserror::Error;

use crate::models::{AiAnalysis, Consultation, Patient};
use crate::pipeline::analyze::{analyze_or_fallback, AnalysisProvider};
use crate::pipeline::types::ConsultationData;
use crate::pipeline::PipelineError;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Internal lock error")]
    LockPoisoned,
}

#[derive(Default)]
struct Inner {
    current_patient: Option<Patient>,
    current_consultation: Option<Consultation>,
    patients: Vec<Patient>,
}

pub struct ConsultationStore {
    inner: RwLock<Inner>,
    analyzer: Box<dyn AnalysisProvider>,
}

impl ConsultationStore {
    pub fn new(analyzer: Box<dyn AnalysisProvider>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            analyzer,
        }
    }

    // ── Mutations ───────────────────────────────────────────

    /// Simple replace of the active patient.
    pub fn set_current_patient(&self, patient: Option<Patient>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.current_patient = patient;
        Ok(())
    }

    /// Simple replace of the active consultation.
    pub fn set_current_consultation(
        &self,
        consultation: Option<Consultation>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.current_consultation = consultation;
        Ok(())
    }

    /// Append to the roster. Insertion order is preserved; patients are
    /// never removed during a session.
    pub fn add_patient(&self, patient: Patient) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.patients.push(patient);
        Ok(())
    }

    /// Dual write: replaces the "current" pointer AND, when
    /// `patient_id` matches a roster entry (join by id equality, not
    /// reference identity), the patient's consultation with the same id
    /// inside its list. The two copies must never diverge for matching
    /// ids; applying the same value twice leaves the store unchanged.
    pub fn update_consultation(&self, consultation: Consultation) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;

        if let Some(patient) = inner
            .patients
            .iter_mut()
            .find(|p| p.id == consultation.patient_id)
        {
            for existing in patient.consultations.iter_mut() {
                if existing.id == consultation.id {
                    *existing = consultation.clone();
                }
            }
        }

        inner.current_consultation = Some(consultation);
        Ok(())
    }

    // ── Analysis delegation ─────────────────────────────────

    /// Delegates to the analysis stage and returns the result without
    /// mutating the store — the caller is responsible for invoking
    /// `update_consultation` with the enriched consultation.
    pub async fn analyze_with_ai(
        &self,
        consultation: &Consultation,
    ) -> Result<AiAnalysis, PipelineError> {
        let data = ConsultationData::from_consultation(consultation);
        analyze_or_fallback(self.analyzer.as_ref(), &data).await
    }

    // ── Read accessors ──────────────────────────────────────

    pub fn current_patient(&self) -> Result<Option<Patient>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.current_patient.clone())
    }

    pub fn current_consultation(&self) -> Result<Option<Consultation>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.current_consultation.clone())
    }

    pub fn patients(&self) -> Result<Vec<Patient>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.patients.clone())
    }

    pub fn patient_count(&self) -> usize {
        self.inner
            .read()
            .map(|inner| inner.patients.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analyze::{FailingAnalysisProvider, MockAnalysisProvider};

    fn store() -> ConsultationStore {
        ConsultationStore::new(Box::new(MockAnalysisProvider::new()))
    }

    fn patient_with_consultation() -> (Patient, Consultation) {
        let mut patient = Patient::new("Durand");
        let consultation = Consultation::new(patient.id, "Fièvre", "39°C", "RAS");
        patient.consultations.push(consultation.clone());
        (patient, consultation)
    }

    #[test]
    fn starts_empty() {
        let store = store();
        assert!(store.current_patient().unwrap().is_none());
        assert!(store.current_consultation().unwrap().is_none());
        assert_eq!(store.patient_count(), 0);
    }

    #[test]
    fn roster_preserves_insertion_order() {
        let store = store();
        store.add_patient(Patient::new("Durand")).unwrap();
        store.add_patient(Patient::new("Albert")).unwrap();
        store.add_patient(Patient::new("Martin")).unwrap();

        let names: Vec<String> = store
            .patients()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Durand", "Albert", "Martin"]);
    }

    #[test]
    fn update_consultation_dual_writes_pointer_and_roster() {
        let store = store();
        let (patient, mut consultation) = patient_with_consultation();
        store.add_patient(patient).unwrap();

        consultation.motif = "Fièvre persistante".into();
        store.update_consultation(consultation.clone()).unwrap();

        let current = store.current_consultation().unwrap().unwrap();
        assert_eq!(current.motif, "Fièvre persistante");

        let nested = store.patients().unwrap()[0].consultations[0].clone();
        assert_eq!(nested.id, current.id);
        assert_eq!(nested.motif, current.motif);
    }

    #[test]
    fn update_consultation_is_idempotent() {
        let store = store();
        let (patient, mut consultation) = patient_with_consultation();
        store.add_patient(patient).unwrap();

        consultation.symptoms = "39°C, frissons".into();
        store.update_consultation(consultation.clone()).unwrap();
        let after_once = (
            store.current_consultation().unwrap(),
            store.patients().unwrap(),
        );

        store.update_consultation(consultation.clone()).unwrap();
        let after_twice = (
            store.current_consultation().unwrap(),
            store.patients().unwrap(),
        );

        assert_eq!(
            serde_json::to_value(&after_once.0).unwrap(),
            serde_json::to_value(&after_twice.0).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&after_once.1).unwrap(),
            serde_json::to_value(&after_twice.1).unwrap()
        );
    }

    #[test]
    fn update_consultation_without_roster_match_only_moves_the_pointer() {
        let store = store();
        store.add_patient(Patient::new("Durand")).unwrap();

        // Consultation attached to a patient id absent from the roster.
        let orphan = Consultation::new(uuid::Uuid::new_v4(), "Toux", "Toux sèche", "");
        store.update_consultation(orphan.clone()).unwrap();

        assert_eq!(store.current_consultation().unwrap().unwrap().id, orphan.id);
        assert!(store.patients().unwrap()[0].consultations.is_empty());
    }

    #[test]
    fn update_consultation_joins_by_id_not_identity() {
        let store = store();
        let (patient, consultation) = patient_with_consultation();
        store.add_patient(patient).unwrap();

        // A freshly deserialized copy (different allocation, same ids)
        // must hit the same roster slot.
        let json = serde_json::to_string(&consultation).unwrap();
        let mut copy: Consultation = serde_json::from_str(&json).unwrap();
        copy.clinical_exam = "Auscultation libre".into();
        store.update_consultation(copy).unwrap();

        assert_eq!(
            store.patients().unwrap()[0].consultations[0].clinical_exam,
            "Auscultation libre"
        );
    }

    #[tokio::test]
    async fn analyze_with_ai_does_not_mutate_the_store() {
        let store = store();
        let (patient, consultation) = patient_with_consultation();
        store.add_patient(patient).unwrap();
        store
            .set_current_consultation(Some(consultation.clone()))
            .unwrap();

        let analysis = store.analyze_with_ai(&consultation).await.unwrap();
        assert!(analysis.clinical_synthesis.contains("Fièvre"));

        // The store still holds the un-enriched consultation.
        let current = store.current_consultation().unwrap().unwrap();
        assert!(current.ai_analysis.is_none());
    }

    #[tokio::test]
    async fn analyze_with_ai_degrades_instead_of_failing() {
        let store = ConsultationStore::new(Box::new(FailingAnalysisProvider));
        let (_, consultation) = patient_with_consultation();

        let analysis = store.analyze_with_ai(&consultation).await.unwrap();
        assert!(!analysis.differential_diagnosis.is_empty());
        assert!((0.0..=1.0).contains(&analysis.confidence));
    }

    #[tokio::test]
    async fn analyze_with_ai_still_validates_the_form() {
        let store = store();
        let consultation = Consultation::new(uuid::Uuid::new_v4(), "", "", "");
        let result = store.analyze_with_ai(&consultation).await;
        assert!(matches!(result, Err(PipelineError::MissingField("motif"))));
    }
}
