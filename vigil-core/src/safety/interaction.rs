//! Drug interaction engine
//!
//! Deterministic pairwise evaluation of a medication regimen against the
//! interaction rule table, plus allergy cross-reactivity. Lookup is
//! symmetric on the unordered pair. An unrecognized medication identifier
//! never aborts evaluation; it marks the report incomplete and the
//! remaining entries are still checked.

use std::collections::{HashMap, HashSet};

use crate::safety::reference::{InteractionRule, ReferenceData};
use crate::safety::{FindingKind, SafetyFinding, SafetyReport, Severity};
use crate::task::ClinicalPayload;

pub struct InteractionEngine {
    /// Unordered-pair lookup, keyed on lowercase (min, max) names
    rules: HashMap<(String, String), InteractionRule>,

    /// Allergy class -> cross-reactive members (lowercase)
    allergy_classes: HashMap<String, Vec<String>>,

    /// Synonym (lowercase) -> canonical name
    synonyms: HashMap<String, String>,

    /// Every identifier any table knows about (lowercase canonical)
    known: HashSet<String>,
}

impl InteractionEngine {
    pub fn new(reference: &ReferenceData) -> Self {
        let mut synonyms = HashMap::new();
        let mut known = HashSet::new();

        for (canonical, aliases) in &reference.synonyms {
            known.insert(canonical.to_lowercase());
            for alias in aliases {
                synonyms.insert(alias.to_lowercase(), canonical.clone());
            }
        }

        let mut rules = HashMap::new();
        for rule in &reference.interactions {
            known.insert(rule.drug_a.to_lowercase());
            known.insert(rule.drug_b.to_lowercase());
            rules.insert(pair_key(&rule.drug_a, &rule.drug_b), rule.clone());
        }

        let mut allergy_classes = HashMap::new();
        for (class, members) in &reference.allergy_classes {
            known.insert(class.to_lowercase());
            for member in members {
                known.insert(member.to_lowercase());
            }
            allergy_classes.insert(
                class.to_lowercase(),
                members.iter().map(|m| m.to_lowercase()).collect(),
            );
        }

        Self {
            rules,
            allergy_classes,
            synonyms,
            known,
        }
    }

    /// Evaluate the payload's medication regimen and allergy list.
    pub fn evaluate(&self, payload: &ClinicalPayload) -> SafetyReport {
        let mut report = SafetyReport::default();

        let meds: Vec<String> = payload
            .medication_set()
            .iter()
            .map(|m| self.normalize(m))
            .collect();

        for med in &meds {
            if !self.known.contains(&med.to_lowercase()) {
                tracing::warn!(medication = %med, "unrecognized medication identifier, interaction coverage incomplete");
                report.incomplete = true;
            }
        }

        // Every unordered pair in the combined regimen
        for i in 0..meds.len() {
            for j in (i + 1)..meds.len() {
                if let Some(rule) = self.rules.get(&pair_key(&meds[i], &meds[j])) {
                    report.findings.push(SafetyFinding {
                        kind: FindingKind::Interaction,
                        severity: rule.severity,
                        rationale: format!(
                            "{} + {}: {}. {}",
                            rule.drug_a, rule.drug_b, rule.mechanism, rule.recommendation
                        ),
                        blocking: rule.blocking,
                    });
                }
            }
        }

        self.check_allergies(payload, &mut report);

        report
    }

    /// Allergy checks run on proposed medications: a direct name match is
    /// critical, a cross-reactivity class match is major. Neither can be
    /// downgraded by the interaction table.
    fn check_allergies(&self, payload: &ClinicalPayload, report: &mut SafetyReport) {
        for raw in &payload.proposed_medications {
            let med = self.normalize(raw);
            let med_lower = med.to_lowercase();

            for allergy in &payload.allergies {
                let allergy_lower = self.normalize(allergy).to_lowercase();
                if allergy_lower.is_empty() {
                    continue;
                }

                if med_lower.contains(&allergy_lower) || allergy_lower.contains(&med_lower) {
                    report.findings.push(SafetyFinding {
                        kind: FindingKind::Allergy,
                        severity: Severity::Critical,
                        rationale: format!("{} matches documented allergy '{}'", med, allergy),
                        blocking: false,
                    });
                    continue;
                }

                if let Some(members) = self.allergy_classes.get(&allergy_lower)
                    && members.iter().any(|m| *m == med_lower)
                {
                    report.findings.push(SafetyFinding {
                        kind: FindingKind::Allergy,
                        severity: Severity::Major,
                        rationale: format!(
                            "{} is cross-reactive with documented {} allergy",
                            med, allergy
                        ),
                        blocking: false,
                    });
                }
            }
        }
    }

    /// Map a trade name or loose casing onto the canonical table name.
    fn normalize(&self, name: &str) -> String {
        let trimmed = name.trim();
        if let Some(canonical) = self.synonyms.get(&trimmed.to_lowercase()) {
            return canonical.clone();
        }
        trimmed.to_string()
    }
}

/// Order-independent lookup key for a drug pair.
fn pair_key(a: &str, b: &str) -> (String, String) {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::reference::ReferenceData;

    fn engine() -> InteractionEngine {
        InteractionEngine::new(&ReferenceData::builtin())
    }

    fn payload(active: &[&str], proposed: &[&str], allergies: &[&str]) -> ClinicalPayload {
        ClinicalPayload {
            active_medications: active.iter().map(|s| s.to_string()).collect(),
            proposed_medications: proposed.iter().map(|s| s.to_string()).collect(),
            allergies: allergies.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_symmetric_lookup() {
        let engine = engine();

        let forward = engine.evaluate(&payload(&["Warfarin"], &["Ibuprofen"], &[]));
        let reverse = engine.evaluate(&payload(&["Ibuprofen"], &["Warfarin"], &[]));

        assert_eq!(forward.findings.len(), 1);
        assert_eq!(reverse.findings.len(), 1);
        assert_eq!(forward.findings[0].severity, Severity::Major);
        assert_eq!(reverse.findings[0].severity, Severity::Major);
    }

    #[test]
    fn test_synonym_normalization() {
        let engine = engine();

        // Coumadin is a Warfarin trade name
        let report = engine.evaluate(&payload(&["Coumadin"], &["Advil"], &[]));
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, Severity::Major);
        assert!(!report.incomplete);
    }

    #[test]
    fn test_blocking_contraindication_is_surfaced() {
        let engine = engine();

        let report = engine.evaluate(&payload(&["Metformin"], &["Iodinated Contrast"], &[]));
        assert!(report.has_blocking());
        assert_eq!(report.findings[0].severity, Severity::Critical);
    }

    #[test]
    fn test_allergy_cross_reactivity_is_at_least_major() {
        let engine = engine();

        let report = engine.evaluate(&payload(&[], &["Amoxicillin"], &["Penicillin"]));
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].kind, FindingKind::Allergy);
        assert!(report.findings[0].severity >= Severity::Major);
    }

    #[test]
    fn test_direct_allergy_match_is_critical() {
        let engine = engine();

        let report = engine.evaluate(&payload(&[], &["Ibuprofen"], &["Ibuprofen"]));
        assert_eq!(report.findings[0].kind, FindingKind::Allergy);
        assert_eq!(report.findings[0].severity, Severity::Critical);
    }

    #[test]
    fn test_unknown_medication_marks_incomplete_but_continues() {
        let engine = engine();

        let report = engine.evaluate(&payload(
            &["Warfarin", "Xq-9931 Investigational"],
            &["Ibuprofen"],
            &[],
        ));

        assert!(report.incomplete);
        // The Warfarin + Ibuprofen pair is still found
        assert_eq!(report.findings.len(), 1);
    }

    #[test]
    fn test_adding_a_medication_never_removes_findings() {
        let engine = engine();

        let base = engine.evaluate(&payload(&["Warfarin"], &["Ibuprofen"], &[]));
        let wider = engine.evaluate(&payload(&["Warfarin", "Lisinopril"], &["Ibuprofen"], &[]));

        assert!(wider.findings.len() >= base.findings.len());
        assert!(wider.max_severity() >= base.max_severity());
    }

    #[test]
    fn test_no_findings_for_clean_regimen() {
        let engine = engine();

        let report = engine.evaluate(&payload(&["Metformin"], &["Atorvastatin"], &[]));
        assert!(report.findings.is_empty());
        assert!(!report.incomplete);
    }
}
