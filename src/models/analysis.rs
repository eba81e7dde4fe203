use serde::{Deserialize, Serialize};

/// Result of the AI analysis stage, as produced by the analysis
/// function. Immutable once produced: a fresh analysis replaces the
/// previous one wholesale, never a partial patch.
///
/// Wire shape uses camelCase keys (`clinicalSynthesis`, …).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub clinical_synthesis: String,
    /// Ordered by decreasing probability; the first entry is the most
    /// probable diagnosis.
    pub differential_diagnosis: Vec<String>,
    pub recommended_treatment: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

impl AiAnalysis {
    /// Confidence rendered for display, as a rounded 0–100 integer.
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    /// The most probable diagnosis, when the differential is non-empty.
    pub fn principal_diagnosis(&self) -> Option<&str> {
        self.differential_diagnosis.first().map(String::as_str)
    }
}
