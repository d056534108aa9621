//! Red-flag detector
//!
//! Ordered, independent, non-exclusive predicates over symptom keywords and
//! numeric vitals. Every match is a critical finding. Runs identically
//! whether or not any provider succeeded; its purpose is to catch
//! life-threatening presentations the model layer might omit or never be
//! consulted for.

use crate::safety::reference::{RedFlagRule, ReferenceData};
use crate::safety::{FindingKind, SafetyFinding, SafetyReport, Severity};
use crate::task::VitalSigns;

pub struct RedFlagDetector {
    rules: Vec<RedFlagRule>,
}

impl RedFlagDetector {
    pub fn new(reference: &ReferenceData) -> Self {
        Self {
            rules: reference.red_flags.clone(),
        }
    }

    /// Evaluate symptoms + vitals. Pure: identical inputs always yield
    /// identical finding sets.
    pub fn evaluate(&self, symptoms: &[String], vitals: &VitalSigns) -> SafetyReport {
        let text = symptoms.join(" ").to_lowercase();

        let mut report = SafetyReport::default();
        for rule in &self.rules {
            if rule_matches(rule, &text, vitals) {
                report.findings.push(SafetyFinding {
                    kind: FindingKind::RedFlag,
                    severity: Severity::Critical,
                    rationale: rationale(rule),
                    blocking: false,
                });
            }
        }
        report
    }
}

fn rule_matches(rule: &RedFlagRule, symptom_text: &str, vitals: &VitalSigns) -> bool {
    let primary = rule
        .symptoms_any
        .iter()
        .any(|s| symptom_text.contains(&s.to_lowercase()));
    if !primary {
        return false;
    }

    if !rule.requires_corroboration {
        return true;
    }

    let keyword = rule
        .corroborating_any
        .iter()
        .any(|s| symptom_text.contains(&s.to_lowercase()));
    let vital = rule.vitals_any.iter().any(|t| t.satisfied_by(vitals));

    keyword || vital
}

fn rationale(rule: &RedFlagRule) -> String {
    if rule.suggested_conditions.is_empty() {
        format!("red flag: {}", rule.name)
    } else {
        format!(
            "red flag: {} (suggests {})",
            rule.name,
            rule.suggested_conditions.join(", ")
        )
    }
}
