//! Generated documents: saved PDFs and the French letter/sheet
//! templates the physician edits before sending.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{Medication, Treatment};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Erreur d'écriture du document : {0}")]
    Io(#[from] std::io::Error),
}

/// Write a generated work-stoppage PDF to the documents directory,
/// named after the patient and the start date.
pub fn save_arret_pdf(
    dir: &Path,
    bytes: &[u8],
    nom: &str,
    debut: &str,
) -> Result<PathBuf, DocumentError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "Arret_{}_{}.pdf",
        file_name_part(nom),
        file_name_part(debut)
    ));
    std::fs::write(&path, bytes)?;
    tracing::info!(path = %path.display(), "arrêt de travail saved");
    Ok(path)
}

/// Keep user-provided name parts filesystem-safe.
fn file_name_part(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Skeleton of the liaison letter to a specialist; the physician fills
/// the bracketed placeholders.
pub fn referral_letter_template() -> &'static str {
    r#"Cher confrère,

Je vous adresse Monsieur/Madame [Nom du patient], âgé(e) de [âge] ans, que je suis pour [motif de consultation].

ANTÉCÉDENTS:
[Antécédents médicaux pertinents]

HISTOIRE DE LA MALADIE:
[Description détaillée des symptômes et évolution]

EXAMEN CLINIQUE:
[Résultats de l'examen physique]

EXAMENS COMPLÉMENTAIRES:
[Résultats des examens réalisés]

TRAITEMENT ACTUEL:
[Médicaments et posologies en cours]

Je vous serais reconnaissant(e) de bien vouloir donner votre avis sur cette situation et prendre en charge ce patient selon vos recommandations.

Je reste à votre disposition pour tout complément d'information.

Confraternellement,

Dr [Votre nom]
[Spécialité]
[Cabinet/Hôpital]
[Téléphone/Email]"#
}

/// Default symptomatic treatment proposed when the consultation has no
/// structured ordonnance yet.
pub fn default_treatment() -> Treatment {
    Treatment {
        medications: vec![
            Medication {
                name: "Paracétamol 1000mg".into(),
                dosage: "1 comprimé".into(),
                frequency: "3 fois par jour".into(),
                duration: "5 jours".into(),
                instructions: Some("À prendre au cours des repas".into()),
            },
            Medication {
                name: "Ibuprofène 400mg".into(),
                dosage: "1 comprimé".into(),
                frequency: "Si besoin".into(),
                duration: "3 jours max".into(),
                instructions: Some("Maximum 3 prises par jour".into()),
            },
        ],
        recommendations: vec![
            "Repos au lit pendant 2-3 jours".into(),
            "Hydratation abondante (2L/jour minimum)".into(),
            "Éviter les efforts physiques".into(),
            "Consulter si aggravation des symptômes".into(),
        ],
        follow_up: "Rendez-vous de contrôle dans 1 mois pour vérifier l'efficacité du traitement et ajuster si nécessaire.".into(),
    }
}

/// Default patient-education sheet (conseils + signes d'alerte) used
/// when the structuring stage produced none.
pub fn default_education_sheet() -> String {
    let conseils = [
        "Réduire la consommation de sel (moins de 6g par jour)",
        "Pratiquer une activité physique régulière (30 min, 5 fois par semaine)",
        "Maintenir un poids santé",
        "Limiter la consommation d'alcool",
        "Arrêter le tabac si applicable",
        "Gérer le stress par des techniques de relaxation",
    ];
    let alertes = [
        "Maux de tête intenses et persistants",
        "Troubles de la vision",
        "Douleurs thoraciques",
        "Essoufflement important",
        "Vertiges ou malaises",
    ];

    let mut sheet = String::from("CONSEILS POUR VOTRE SANTÉ :\n");
    for conseil in conseils {
        sheet.push_str("- ");
        sheet.push_str(conseil);
        sheet.push('\n');
    }
    sheet.push_str("\nQUAND CONSULTER EN URGENCE ?\n");
    for alerte in alertes {
        sheet.push_str("- ");
        sheet.push_str(alerte);
        sheet.push('\n');
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_pdf_under_patient_and_date_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_arret_pdf(dir.path(), b"%PDF-1.4", "Durand", "2025-03-10").unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "Arret_Durand_2025-03-10.pdf"
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn file_name_parts_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_arret_pdf(dir.path(), b"%PDF", "De La Tour/..", "2025-03-10").unwrap();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(!name.contains('/'));
        assert!(name.starts_with("Arret_De_La_Tour"));
    }

    #[test]
    fn creates_the_documents_directory_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("sanoscribe").join("documents");
        let path = save_arret_pdf(&nested, b"%PDF", "Durand", "2025-03-10").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn referral_template_keeps_its_placeholders() {
        let template = referral_letter_template();
        assert!(template.starts_with("Cher confrère"));
        assert!(template.contains("[Nom du patient]"));
        assert!(template.contains("ANTÉCÉDENTS:"));
    }

    #[test]
    fn default_treatment_is_complete() {
        let treatment = default_treatment();
        assert_eq!(treatment.medications.len(), 2);
        assert_eq!(treatment.recommendations.len(), 4);
        assert!(treatment.follow_up.contains("1 mois"));
    }

    #[test]
    fn education_sheet_lists_advice_and_warning_signs() {
        let sheet = default_education_sheet();
        assert!(sheet.contains("CONSEILS"));
        assert!(sheet.contains("URGENCE"));
        assert!(sheet.contains("Douleurs thoraciques"));
    }
}
