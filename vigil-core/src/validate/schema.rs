//! Validated payload shapes, one per task kind

use serde::{Deserialize, Serialize};

use crate::safety::Severity;

/// Urgency vocabulary for diagnosis candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Routine,
    Soon,
    Urgent,
    Immediate,
}

impl Urgency {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "routine" => Some(Urgency::Routine),
            "soon" => Some(Urgency::Soon),
            "urgent" => Some(Urgency::Urgent),
            "immediate" => Some(Urgency::Immediate),
            _ => None,
        }
    }
}

/// Direction vocabulary for lab trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Stable,
    Worsening,
}

impl TrendDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "improving" => Some(TrendDirection::Improving),
            "stable" => Some(TrendDirection::Stable),
            "worsening" => Some(TrendDirection::Worsening),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisCandidate {
    pub diagnosis: String,
    pub icd10: Option<String>,
    /// In [0, 1]
    pub probability: f64,
    pub rationale: String,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisPayload {
    /// Ordered, non-empty
    pub candidates: Vec<DiagnosisCandidate>,
    pub risk_level: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentRecommendation {
    pub therapy: String,
    pub rationale: String,
    pub monitoring: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentPayload {
    pub recommendations: Vec<TreatmentRecommendation>,
    pub risk_level: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewedInteraction {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: Severity,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionReviewPayload {
    pub interactions: Vec<ReviewedInteraction>,
    pub risk_level: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPayload {
    /// In [0, 1]
    pub score: f64,
    pub risk_level: Severity,
    pub drivers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryPayload {
    pub summary: String,
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendItem {
    pub parameter: String,
    pub direction: TrendDirection,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysisPayload {
    pub summary: String,
    pub trends: Vec<TrendItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdherencePayload {
    pub assessment: String,
    pub concerns: Vec<String>,
}

/// Schema-validated model output, one variant per task kind. Unknown task
/// kinds validate against the summary schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    Summary(SummaryPayload),
    TrendAnalysis(TrendAnalysisPayload),
    Adherence(AdherencePayload),
    Diagnosis(DiagnosisPayload),
    Treatment(TreatmentPayload),
    InteractionReview(InteractionReviewPayload),
    Risk(RiskPayload),
}

impl TaskPayload {
    /// The risk level the model itself declared, for merging with
    /// deterministic findings. Kinds without a risk field declare minor.
    pub fn declared_risk(&self) -> Severity {
        match self {
            TaskPayload::Diagnosis(p) => p.risk_level,
            TaskPayload::Treatment(p) => p.risk_level,
            TaskPayload::InteractionReview(p) => p.risk_level,
            TaskPayload::Risk(p) => p.risk_level,
            TaskPayload::Summary(_) | TaskPayload::TrendAnalysis(_) | TaskPayload::Adherence(_) => {
                Severity::Minor
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_vocabulary() {
        assert_eq!(Urgency::parse("Immediate"), Some(Urgency::Immediate));
        assert_eq!(Urgency::parse("whenever"), None);
    }

    #[test]
    fn test_declared_risk_defaults_to_minor_for_summaries() {
        let payload = TaskPayload::Summary(SummaryPayload {
            summary: "stable".into(),
            key_points: vec![],
        });
        assert_eq!(payload.declared_risk(), Severity::Minor);
    }

    #[test]
    fn test_declared_risk_reads_model_risk() {
        let payload = TaskPayload::Risk(RiskPayload {
            score: 0.9,
            risk_level: Severity::Critical,
            drivers: vec![],
        });
        assert_eq!(payload.declared_risk(), Severity::Critical);
    }
}
