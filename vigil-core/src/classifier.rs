//! Task complexity classification
//!
//! Pure mapping from task kind to routing tier. Unknown kinds route to the
//! highest-quality chain rather than risk an under-qualified model.

use crate::task::{ComplexityTier, TaskKind};

/// Classify a task kind into a complexity tier.
pub fn classify(kind: &TaskKind) -> ComplexityTier {
    match kind {
        TaskKind::PatientSummary => ComplexityTier::Simple,
        TaskKind::LabTrendAnalysis | TaskKind::MedicationAdherence => ComplexityTier::Moderate,
        TaskKind::DifferentialDiagnosis
        | TaskKind::TreatmentPlanning
        | TaskKind::InteractionReview
        | TaskKind::RiskStratification => ComplexityTier::Complex,
        TaskKind::Other(_) => ComplexityTier::Complex,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_kinds() {
        assert_eq!(classify(&TaskKind::PatientSummary), ComplexityTier::Simple);
        assert_eq!(
            classify(&TaskKind::LabTrendAnalysis),
            ComplexityTier::Moderate
        );
        assert_eq!(
            classify(&TaskKind::MedicationAdherence),
            ComplexityTier::Moderate
        );
        assert_eq!(
            classify(&TaskKind::DifferentialDiagnosis),
            ComplexityTier::Complex
        );
        assert_eq!(
            classify(&TaskKind::TreatmentPlanning),
            ComplexityTier::Complex
        );
        assert_eq!(
            classify(&TaskKind::InteractionReview),
            ComplexityTier::Complex
        );
    }

    #[test]
    fn test_unknown_kind_is_fail_safe() {
        let kind = TaskKind::Other("somatic_variant_calling".to_string());
        assert_eq!(classify(&kind), ComplexityTier::Complex);
    }

    #[test]
    fn test_classification_is_stable() {
        let kind = TaskKind::RiskStratification;
        assert_eq!(classify(&kind), classify(&kind));
    }
}
