//! Task types: what the caller asks for and the clinical context it carries

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Kind of clinical task to orchestrate.
///
/// The set mirrors the task taxonomy the routing layer classifies; kinds
/// not in this list arrive as `Other` and are routed as complex (see
/// `classifier`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Short narrative summary of a patient record
    PatientSummary,
    /// Trend analysis over serial laboratory results
    LabTrendAnalysis,
    /// Medication adherence assessment
    MedicationAdherence,
    /// Differential diagnosis generation
    DifferentialDiagnosis,
    /// Treatment plan proposal
    TreatmentPlanning,
    /// Drug-interaction review of a medication regimen
    InteractionReview,
    /// Risk stratification scoring
    RiskStratification,
    /// Unknown task kind (routed fail-safe)
    #[serde(untagged)]
    Other(String),
}

impl TaskKind {
    /// Stable string form used in logs and prompts.
    pub fn as_str(&self) -> &str {
        match self {
            TaskKind::PatientSummary => "patient_summary",
            TaskKind::LabTrendAnalysis => "lab_trend_analysis",
            TaskKind::MedicationAdherence => "medication_adherence",
            TaskKind::DifferentialDiagnosis => "differential_diagnosis",
            TaskKind::TreatmentPlanning => "treatment_planning",
            TaskKind::InteractionReview => "interaction_review",
            TaskKind::RiskStratification => "risk_stratification",
            TaskKind::Other(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complexity tier selecting the provider chain for a task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Simple,
    Moderate,
    #[default]
    Complex,
}

/// Numeric vital signs. All fields optional; absent values never satisfy a
/// red-flag threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub systolic_bp: Option<f64>,
    pub diastolic_bp: Option<f64>,
    pub heart_rate: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub temperature_c: Option<f64>,
    pub spo2_percent: Option<f64>,
}

impl VitalSigns {
    /// True if at least one vital is present.
    pub fn any_present(&self) -> bool {
        self.systolic_bp.is_some()
            || self.diastolic_bp.is_some()
            || self.heart_rate.is_some()
            || self.respiratory_rate.is_some()
            || self.temperature_c.is_some()
            || self.spo2_percent.is_some()
    }
}

/// Clinical context carried by a task.
///
/// The orchestrator treats this as opaque for prompt rendering, but the
/// deterministic safety evaluators read the medication, allergy, symptom,
/// and vital-sign fields directly — they need no AI output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalPayload {
    /// Chief complaints / symptom keywords
    #[serde(default)]
    pub chief_complaints: Vec<String>,

    /// Current vital signs
    #[serde(default)]
    pub vital_signs: VitalSigns,

    /// Medications the patient is already taking
    #[serde(default)]
    pub active_medications: Vec<String>,

    /// Medications being proposed or newly prescribed
    #[serde(default)]
    pub proposed_medications: Vec<String>,

    /// Known allergies (free-text or class names)
    #[serde(default)]
    pub allergies: Vec<String>,

    /// Free-form clinical context forwarded to the prompt renderer
    #[serde(default)]
    pub clinical_context: serde_json::Value,
}

impl ClinicalPayload {
    /// Active + proposed medications, order-preserving, deduplicated.
    pub fn medication_set(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for med in self.active_medications.iter().chain(&self.proposed_medications) {
            if !seen.iter().any(|s: &&str| s.eq_ignore_ascii_case(med)) {
                seen.push(med.as_str());
            }
        }
        seen
    }

    /// True if at least one deterministic safety evaluator has something
    /// to work with.
    pub fn supports_safety_evaluation(&self) -> bool {
        !self.active_medications.is_empty()
            || !self.proposed_medications.is_empty()
            || !self.chief_complaints.is_empty()
            || self.vital_signs.any_present()
    }
}

/// One orchestration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task id (generated per call)
    pub id: Uuid,

    /// What the caller is asking for
    pub kind: TaskKind,

    /// Clinical context
    pub payload: ClinicalPayload,

    /// End-to-end deadline for the whole task
    #[serde(with = "humantime_serde")]
    pub deadline: Duration,
}

impl Task {
    /// Create a new task with a fresh id.
    pub fn new(kind: TaskKind, payload: ClinicalPayload, deadline: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            payload,
            deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_kind_roundtrip() {
        let kind: TaskKind = serde_json::from_str("\"differential_diagnosis\"").unwrap();
        assert_eq!(kind, TaskKind::DifferentialDiagnosis);

        let unknown: TaskKind = serde_json::from_str("\"genome_annotation\"").unwrap();
        assert_eq!(unknown, TaskKind::Other("genome_annotation".to_string()));
    }

    #[test]
    fn test_medication_set_dedupes() {
        let payload = ClinicalPayload {
            active_medications: vec!["Warfarin".into(), "Metformin".into()],
            proposed_medications: vec!["warfarin".into(), "Ibuprofen".into()],
            ..Default::default()
        };

        let meds = payload.medication_set();
        assert_eq!(meds, vec!["Warfarin", "Metformin", "Ibuprofen"]);
    }

    #[test]
    fn test_supports_safety_evaluation() {
        assert!(!ClinicalPayload::default().supports_safety_evaluation());

        let with_vitals = ClinicalPayload {
            vital_signs: VitalSigns {
                heart_rate: Some(88.0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(with_vitals.supports_safety_evaluation());

        let with_meds = ClinicalPayload {
            proposed_medications: vec!["Ibuprofen".into()],
            ..Default::default()
        };
        assert!(with_meds.supports_safety_evaluation());
    }
}
