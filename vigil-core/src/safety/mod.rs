//! Deterministic clinical safety net
//!
//! The evaluators in this module require no AI output. They run on every
//! task, including tasks where every provider failed, and their findings
//! can only raise the overall risk level — never lower or suppress it.

use serde::{Deserialize, Serialize};

pub mod interaction;
pub mod red_flags;
pub mod reference;

pub use interaction::InteractionEngine;
pub use red_flags::RedFlagDetector;
pub use reference::{InteractionRule, RedFlagRule, ReferenceData, VitalKind, VitalThreshold};

/// Clinical severity, totally ordered: critical > major > moderate > minor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Minor,
    Moderate,
    Major,
    Critical,
}

impl Severity {
    /// Parse a severity from the fixed vocabulary. Returns `None` for
    /// anything outside it — callers must not coerce.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minor" | "low" => Some(Severity::Minor),
            "moderate" => Some(Severity::Moderate),
            "major" | "high" => Some(Severity::Major),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What produced a safety finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Drug-drug interaction from the rule table
    Interaction,
    /// Allergy or cross-reactivity match
    Allergy,
    /// Symptom/vital-sign danger pattern
    RedFlag,
}

/// One deterministic risk signal.
///
/// `blocking` is an absolute contraindication marker, orthogonal to
/// `severity`: a clinician may accept critical-severity risk but must never
/// silently proceed past a contraindication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyFinding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub rationale: String,
    #[serde(default)]
    pub blocking: bool,
}

/// Accumulated output of the deterministic evaluators for one task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafetyReport {
    pub findings: Vec<SafetyFinding>,

    /// True if some medication or allergy identifier was not recognized,
    /// so the evaluation may not cover the full regimen.
    #[serde(default)]
    pub incomplete: bool,
}

impl SafetyReport {
    /// Combine two reports, keeping every finding from both.
    pub fn merge(mut self, other: SafetyReport) -> SafetyReport {
        self.findings.extend(other.findings);
        self.incomplete |= other.incomplete;
        self
    }

    /// Highest severity across findings, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    /// True if any finding is an absolute contraindication.
    pub fn has_blocking(&self) -> bool {
        self.findings.iter().any(|f| f.blocking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_total_order() {
        assert!(Severity::Critical > Severity::Major);
        assert!(Severity::Major > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Minor);
    }

    #[test]
    fn test_severity_parse_vocabulary() {
        assert_eq!(Severity::parse("major"), Some(Severity::Major));
        assert_eq!(Severity::parse("HIGH"), Some(Severity::Major));
        assert_eq!(Severity::parse("low"), Some(Severity::Minor));
        assert_eq!(Severity::parse("catastrophic"), None);
        assert_eq!(Severity::parse(""), None);
    }

    #[test]
    fn test_report_merge_keeps_all_findings() {
        let a = SafetyReport {
            findings: vec![SafetyFinding {
                kind: FindingKind::Interaction,
                severity: Severity::Major,
                rationale: "a".into(),
                blocking: false,
            }],
            incomplete: false,
        };
        let b = SafetyReport {
            findings: vec![SafetyFinding {
                kind: FindingKind::RedFlag,
                severity: Severity::Critical,
                rationale: "b".into(),
                blocking: false,
            }],
            incomplete: true,
        };

        let merged = a.merge(b);
        assert_eq!(merged.findings.len(), 2);
        assert!(merged.incomplete);
        assert_eq!(merged.max_severity(), Some(Severity::Critical));
    }

    #[test]
    fn test_blocking_is_independent_of_severity() {
        let report = SafetyReport {
            findings: vec![SafetyFinding {
                kind: FindingKind::Interaction,
                severity: Severity::Moderate,
                rationale: "contraindicated pair".into(),
                blocking: true,
            }],
            incomplete: false,
        };

        assert!(report.has_blocking());
        assert_eq!(report.max_severity(), Some(Severity::Moderate));
    }
}
