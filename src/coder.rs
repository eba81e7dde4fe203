//! NGAP cotation: rule-based code suggestion and tariff totals.

use serde::Serialize;

/// One NGAP billing code with its tariff in euros.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NgapCode {
    pub code: &'static str,
    pub libelle: &'static str,
    pub tarif: f64,
    pub conditions: &'static str,
}

/// The NGAP nomenclature used for cotation. The first entries are
/// primary consultation codes; the rest are supplementary gestes.
pub const NGAP_CODES: &[NgapCode] = &[
    NgapCode {
        code: "C",
        libelle: "Consultation au cabinet",
        tarif: 25.0,
        conditions: "Consultation de base",
    },
    NgapCode {
        code: "CS",
        libelle: "Consultation avec majoration",
        tarif: 46.0,
        conditions: "Consultation complexe ou urgente",
    },
    NgapCode {
        code: "COE",
        libelle: "Consultation obligatoire de l'enfant",
        tarif: 46.0,
        conditions: "Suivi du nourrisson et du jeune enfant",
    },
    NgapCode {
        code: "V",
        libelle: "Visite à domicile",
        tarif: 25.0,
        conditions: "Déplacement au domicile",
    },
    NgapCode {
        code: "VS",
        libelle: "Visite à domicile avec majoration",
        tarif: 46.0,
        conditions: "Visite urgente ou complexe",
    },
    NgapCode {
        code: "K",
        libelle: "Acte technique (coefficient 1)",
        tarif: 2.28,
        conditions: "Geste technique simple",
    },
    NgapCode {
        code: "KC",
        libelle: "Acte technique (coefficient 2)",
        tarif: 4.56,
        conditions: "Geste technique complexe",
    },
    NgapCode {
        code: "AMI",
        libelle: "Acte médical d'imagerie",
        tarif: 19.06,
        conditions: "Échographie, radiologie",
    },
    NgapCode {
        code: "MD",
        libelle: "Majoration de déplacement",
        tarif: 5.0,
        conditions: "Supplément déplacement",
    },
];

const PRIMARY_COUNT: usize = 5;

/// Primary consultation codes (one per cotation).
pub fn primary_codes() -> &'static [NgapCode] {
    &NGAP_CODES[..PRIMARY_COUNT]
}

/// Supplementary gestes (each toggled independently).
pub fn gestes() -> &'static [NgapCode] {
    &NGAP_CODES[PRIMARY_COUNT..]
}

/// Look up a code in the nomenclature.
pub fn ngap_code(code: &str) -> Option<&'static NgapCode> {
    NGAP_CODES.iter().find(|c| c.code == code)
}

/// Unit of a patient age as entered by the physician.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeUnit {
    Ans,
    Mois,
}

impl std::str::FromStr for AgeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ans" | "an" => Ok(Self::Ans),
            "mois" => Ok(Self::Mois),
            other => Err(format!("unité d'âge inconnue : {other}")),
        }
    }
}

pub fn age_in_months(age: u32, unit: AgeUnit) -> u32 {
    match unit {
        AgeUnit::Ans => age.saturating_mul(12),
        AgeUnit::Mois => age,
    }
}

const PEDIATRIC_KEYWORDS: &[&str] = &["vaccin", "vaccination", "suivi", "contrôle"];
const COMPLEX_KEYWORDS: &[&str] = &["urgence", "douleur", "fièvre", "complex"];

pub const PEDIATRIC_CODE: &str = "COE";
pub const COMPLEX_CODE: &str = "CS";
pub const BASE_CODE: &str = "C";

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| haystack.contains(kw))
}

/// Suggest a billing code from patient age and consultation motif.
///
/// Deterministic and total over every input; the suggestion is
/// advisory only — the physician applies it explicitly. Rules, in
/// priority order: infant follow-up (under 24 months), then complex or
/// urgent motifs, then the base consultation; a blank motif gives no
/// suggestion.
pub fn suggest_code(age: u32, unit: AgeUnit, motif: &str) -> &'static str {
    let motif = motif.trim().to_lowercase();
    if motif.is_empty() {
        return "";
    }
    if age_in_months(age, unit) < 24 && contains_any(&motif, PEDIATRIC_KEYWORDS) {
        return PEDIATRIC_CODE;
    }
    if contains_any(&motif, COMPLEX_KEYWORDS) {
        return COMPLEX_CODE;
    }
    BASE_CODE
}

/// Running cotation for one consultation: a primary code plus toggled
/// supplementary gestes; the total is recomputed on every change.
#[derive(Debug, Default)]
pub struct CotationSheet {
    primary: Option<&'static NgapCode>,
    gestes: Vec<&'static NgapCode>,
}

impl CotationSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary(&self) -> Option<&'static NgapCode> {
        self.primary
    }

    pub fn gestes(&self) -> &[&'static NgapCode] {
        &self.gestes
    }

    /// Apply a primary code (suggested or hand-picked). Unknown codes
    /// are refused and leave the sheet unchanged.
    pub fn select_primary(&mut self, code: &str) -> bool {
        match ngap_code(code) {
            Some(entry) => {
                self.primary = Some(entry);
                true
            }
            None => false,
        }
    }

    /// Toggle a supplementary geste: adds it when absent, removes it
    /// when already selected (no duplicates).
    pub fn toggle_geste(&mut self, code: &str) -> bool {
        let Some(entry) = ngap_code(code) else {
            return false;
        };
        if let Some(position) = self.gestes.iter().position(|g| g.code == entry.code) {
            self.gestes.remove(position);
        } else {
            self.gestes.push(entry);
        }
        true
    }

    /// Total tariff: the primary code plus every toggled geste.
    pub fn total(&self) -> f64 {
        let primary = self.primary.map(|c| c.tarif).unwrap_or(0.0);
        primary + self.gestes.iter().map(|g| g.tarif).sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infant_follow_up_suggests_coe() {
        assert_eq!(
            suggest_code(9, AgeUnit::Mois, "vaccination de contrôle"),
            PEDIATRIC_CODE
        );
        assert_eq!(suggest_code(1, AgeUnit::Ans, "suivi nourrisson"), PEDIATRIC_CODE);
    }

    #[test]
    fn complex_motif_suggests_cs() {
        assert_eq!(
            suggest_code(40, AgeUnit::Ans, "douleur thoracique"),
            COMPLEX_CODE
        );
        assert_eq!(suggest_code(40, AgeUnit::Ans, "Fièvre inexpliquée"), COMPLEX_CODE);
    }

    #[test]
    fn plain_motif_suggests_base_code() {
        assert_eq!(suggest_code(40, AgeUnit::Ans, "renouvellement"), BASE_CODE);
    }

    #[test]
    fn blank_motif_gives_no_suggestion() {
        assert_eq!(suggest_code(40, AgeUnit::Ans, "   "), "");
    }

    #[test]
    fn pediatric_rule_needs_both_age_and_keyword() {
        // Old enough for the keyword not to matter.
        assert_eq!(suggest_code(3, AgeUnit::Ans, "vaccination"), BASE_CODE);
        // Young enough but the motif matches no pediatric keyword.
        assert_eq!(suggest_code(9, AgeUnit::Mois, "renouvellement"), BASE_CODE);
        // 24 months exactly is no longer an infant visit.
        assert_eq!(suggest_code(24, AgeUnit::Mois, "vaccination"), BASE_CODE);
        assert_eq!(suggest_code(23, AgeUnit::Mois, "vaccination"), PEDIATRIC_CODE);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        assert_eq!(
            suggest_code(40, AgeUnit::Ans, "URGENCE respiratoire"),
            COMPLEX_CODE
        );
        assert_eq!(
            suggest_code(6, AgeUnit::Mois, "Contrôle du 6e mois"),
            PEDIATRIC_CODE
        );
    }

    #[test]
    fn suggestion_is_total_over_arbitrary_inputs() {
        let long_motif = "a".repeat(10_000);
        for motif in ["", "x", "πδφ", "vaccin urgence", long_motif.as_str()] {
            let suggested = suggest_code(u32::MAX, AgeUnit::Mois, motif);
            assert!(matches!(suggested, "" | "COE" | "CS" | "C"));
        }
    }

    #[test]
    fn nomenclature_split_matches_the_table() {
        assert_eq!(primary_codes().len() + gestes().len(), NGAP_CODES.len());
        assert!(primary_codes().iter().any(|c| c.code == "C"));
        assert!(gestes().iter().any(|c| c.code == "MD"));
        assert_eq!(ngap_code("KC").unwrap().tarif, 4.56);
        assert!(ngap_code("ZZZ").is_none());
    }

    #[test]
    fn cotation_totals_primary_plus_gestes() {
        let mut sheet = CotationSheet::new();
        assert_eq!(sheet.total(), 0.0);

        assert!(sheet.select_primary("CS"));
        assert_eq!(sheet.total(), 46.0);

        assert!(sheet.toggle_geste("K"));
        assert!(sheet.toggle_geste("MD"));
        assert!((sheet.total() - 53.28).abs() < 1e-9);
    }

    #[test]
    fn toggling_a_geste_twice_removes_it() {
        let mut sheet = CotationSheet::new();
        sheet.select_primary("C");
        sheet.toggle_geste("AMI");
        sheet.toggle_geste("AMI");
        assert!(sheet.gestes().is_empty());
        assert_eq!(sheet.total(), 25.0);
    }

    #[test]
    fn unknown_codes_are_refused() {
        let mut sheet = CotationSheet::new();
        assert!(!sheet.select_primary("ZZZ"));
        assert!(!sheet.toggle_geste(""));
        assert_eq!(sheet.total(), 0.0);
    }

    #[test]
    fn replacing_the_primary_recomputes_the_total() {
        let mut sheet = CotationSheet::new();
        sheet.select_primary("CS");
        sheet.toggle_geste("MD");
        sheet.select_primary("C");
        assert_eq!(sheet.total(), 30.0);
    }

    #[test]
    fn suggested_codes_are_applicable_to_the_sheet() {
        let mut sheet = CotationSheet::new();
        let suggested = suggest_code(9, AgeUnit::Mois, "vaccination de contrôle");
        assert!(sheet.select_primary(suggested));
        assert_eq!(sheet.total(), 46.0);
    }
}
