//! Response validation
//!
//! Parses a provider's raw output and checks it against the schema for the
//! task kind: required fields, types, ranges, fixed vocabularies. Invalid
//! data is never coerced silently. All violations are collected; the first
//! is reported as the primary reason. Retry and failover decisions live in
//! the orchestrator, not here.

use serde_json::Value;
use thiserror::Error;

use crate::safety::Severity;
use crate::task::TaskKind;

pub mod extract;
pub mod schema;

pub use schema::{
    AdherencePayload, DiagnosisCandidate, DiagnosisPayload, InteractionReviewPayload,
    ReviewedInteraction, RiskPayload, SummaryPayload, TaskPayload, TreatmentPayload,
    TreatmentRecommendation, TrendAnalysisPayload, TrendDirection, TrendItem, Urgency,
};

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub problem: String,
}

impl Violation {
    fn new(field: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            problem: problem.into(),
        }
    }
}

/// Collected violations; displays the first as primary.
#[derive(Debug, Clone)]
pub struct SchemaViolations(pub Vec<Violation>);

impl std::fmt::Display for SchemaViolations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "schema violation"),
            [first] => write!(f, "'{}': {}", first.field, first.problem),
            [first, rest @ ..] => write!(
                f,
                "'{}': {} (and {} more)",
                first.field,
                first.problem,
                rest.len()
            ),
        }
    }
}

/// Error type for response validation
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// Empty response body
    #[error("empty response")]
    Empty,

    /// No parseable JSON in the response
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Parsed, but the payload violates the task-kind schema
    #[error("schema violation at {0}")]
    Schema(SchemaViolations),
}

/// Result type for validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A response that passed schema validation.
#[derive(Debug, Clone)]
pub struct ValidatedResponse {
    pub payload: TaskPayload,
    /// Model-reported confidence in [0, 1], when present
    pub confidence: Option<f64>,
}

/// Stateless validator dispatching on task kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate raw provider output against the schema for `kind`.
    pub fn validate(&self, kind: &TaskKind, raw: &str) -> ValidationResult<ValidatedResponse> {
        let value = extract::extract_json(raw)?;

        let Some(obj) = value.as_object() else {
            return Err(ValidationError::Malformed(
                "top-level JSON value is not an object".to_string(),
            ));
        };

        let mut violations = Vec::new();

        let confidence = optional_unit_f64(obj, "confidence", &mut violations);

        let payload = match kind {
            TaskKind::DifferentialDiagnosis => {
                validate_diagnosis(obj, &mut violations).map(TaskPayload::Diagnosis)
            }
            TaskKind::TreatmentPlanning => {
                validate_treatment(obj, &mut violations).map(TaskPayload::Treatment)
            }
            TaskKind::InteractionReview => {
                validate_interaction_review(obj, &mut violations).map(TaskPayload::InteractionReview)
            }
            TaskKind::RiskStratification => {
                validate_risk(obj, &mut violations).map(TaskPayload::Risk)
            }
            TaskKind::LabTrendAnalysis => {
                validate_trend_analysis(obj, &mut violations).map(TaskPayload::TrendAnalysis)
            }
            TaskKind::MedicationAdherence => {
                validate_adherence(obj, &mut violations).map(TaskPayload::Adherence)
            }
            TaskKind::PatientSummary | TaskKind::Other(_) => {
                validate_summary(obj, &mut violations).map(TaskPayload::Summary)
            }
        };

        match payload {
            Some(payload) if violations.is_empty() => Ok(ValidatedResponse { payload, confidence }),
            _ => Err(ValidationError::Schema(SchemaViolations(violations))),
        }
    }
}

type Obj = serde_json::Map<String, Value>;

fn validate_diagnosis(obj: &Obj, violations: &mut Vec<Violation>) -> Option<DiagnosisPayload> {
    let risk_level = severity_or_default(obj, "risk_level", violations);

    let Some(items) = required_array(obj, "candidates", violations) else {
        return None;
    };
    if items.is_empty() {
        violations.push(Violation::new(
            "candidates",
            "diagnosis requires a non-empty ordered candidate list",
        ));
        return None;
    }

    let candidates: Option<Vec<DiagnosisCandidate>> = items
        .iter()
        .enumerate()
        .map(|(i, item)| candidate_at(item, i, violations))
        .collect();

    Some(DiagnosisPayload {
        candidates: candidates?,
        risk_level: risk_level?,
    })
}

fn candidate_at(value: &Value, idx: usize, violations: &mut Vec<Violation>) -> Option<DiagnosisCandidate> {
    let field = |name: &str| format!("candidates[{}].{}", idx, name);

    let Some(obj) = value.as_object() else {
        violations.push(Violation::new(
            format!("candidates[{}]", idx),
            "expected an object",
        ));
        return None;
    };

    let diagnosis = required_string(obj, &field("diagnosis"), "diagnosis", violations);
    let probability = required_unit_f64(obj, &field("probability"), "probability", violations);
    let urgency = match obj.get("urgency").and_then(Value::as_str) {
        Some(s) => {
            let parsed = Urgency::parse(s);
            if parsed.is_none() {
                violations.push(Violation::new(
                    field("urgency"),
                    format!("'{}' is not in the urgency vocabulary", s),
                ));
            }
            parsed
        }
        None => {
            violations.push(Violation::new(field("urgency"), "required field missing"));
            None
        }
    };

    Some(DiagnosisCandidate {
        diagnosis: diagnosis?,
        icd10: obj.get("icd10").and_then(Value::as_str).map(str::to_string),
        probability: probability?,
        rationale: obj
            .get("rationale")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        urgency: urgency?,
    })
}

fn validate_treatment(obj: &Obj, violations: &mut Vec<Violation>) -> Option<TreatmentPayload> {
    let risk_level = severity_or_default(obj, "risk_level", violations);

    let Some(items) = required_array(obj, "recommendations", violations) else {
        return None;
    };
    if items.is_empty() {
        violations.push(Violation::new(
            "recommendations",
            "treatment plan requires at least one recommendation",
        ));
        return None;
    }

    let recommendations: Option<Vec<TreatmentRecommendation>> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let field = |name: &str| format!("recommendations[{}].{}", i, name);
            let Some(obj) = item.as_object() else {
                violations.push(Violation::new(
                    format!("recommendations[{}]", i),
                    "expected an object",
                ));
                return None;
            };
            let therapy = required_string(obj, &field("therapy"), "therapy", violations);
            Some(TreatmentRecommendation {
                therapy: therapy?,
                rationale: obj
                    .get("rationale")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                monitoring: string_list(obj, "monitoring"),
            })
        })
        .collect();

    Some(TreatmentPayload {
        recommendations: recommendations?,
        risk_level: risk_level?,
    })
}

fn validate_interaction_review(
    obj: &Obj,
    violations: &mut Vec<Violation>,
) -> Option<InteractionReviewPayload> {
    let risk_level = severity_or_default(obj, "risk_level", violations);

    // An empty list is a valid "no interactions found" answer
    let Some(items) = required_array(obj, "interactions", violations) else {
        return None;
    };

    let interactions: Option<Vec<ReviewedInteraction>> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let field = |name: &str| format!("interactions[{}].{}", i, name);
            let Some(obj) = item.as_object() else {
                violations.push(Violation::new(
                    format!("interactions[{}]", i),
                    "expected an object",
                ));
                return None;
            };
            let drug_a = required_string(obj, &field("drug_a"), "drug_a", violations);
            let drug_b = required_string(obj, &field("drug_b"), "drug_b", violations);
            let severity = required_severity(obj, &field("severity"), "severity", violations);
            Some(ReviewedInteraction {
                drug_a: drug_a?,
                drug_b: drug_b?,
                severity: severity?,
                note: obj
                    .get("note")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect();

    Some(InteractionReviewPayload {
        interactions: interactions?,
        risk_level: risk_level?,
    })
}

fn validate_risk(obj: &Obj, violations: &mut Vec<Violation>) -> Option<RiskPayload> {
    let score = required_unit_f64(obj, "score", "score", violations);
    let risk_level = required_severity(obj, "risk_level", "risk_level", violations);

    Some(RiskPayload {
        score: score?,
        risk_level: risk_level?,
        drivers: string_list(obj, "drivers"),
    })
}

fn validate_trend_analysis(
    obj: &Obj,
    violations: &mut Vec<Violation>,
) -> Option<TrendAnalysisPayload> {
    let summary = required_string(obj, "summary", "summary", violations);

    let trends: Option<Vec<TrendItem>> = obj
        .get("trends")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let field = |name: &str| format!("trends[{}].{}", i, name);
                    let Some(obj) = item.as_object() else {
                        violations
                            .push(Violation::new(format!("trends[{}]", i), "expected an object"));
                        return None;
                    };
                    let parameter = required_string(obj, &field("parameter"), "parameter", violations);
                    let direction = match obj.get("direction").and_then(Value::as_str) {
                        Some(s) => {
                            let parsed = TrendDirection::parse(s);
                            if parsed.is_none() {
                                violations.push(Violation::new(
                                    field("direction"),
                                    format!("'{}' is not in the direction vocabulary", s),
                                ));
                            }
                            parsed
                        }
                        None => {
                            violations
                                .push(Violation::new(field("direction"), "required field missing"));
                            None
                        }
                    };
                    Some(TrendItem {
                        parameter: parameter?,
                        direction: direction?,
                        comment: obj
                            .get("comment")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_else(|| Some(Vec::new()));

    Some(TrendAnalysisPayload {
        summary: summary?,
        trends: trends?,
    })
}

fn validate_adherence(obj: &Obj, violations: &mut Vec<Violation>) -> Option<AdherencePayload> {
    let assessment = required_string(obj, "assessment", "assessment", violations);
    Some(AdherencePayload {
        assessment: assessment?,
        concerns: string_list(obj, "concerns"),
    })
}

fn validate_summary(obj: &Obj, violations: &mut Vec<Violation>) -> Option<SummaryPayload> {
    let summary = required_string(obj, "summary", "summary", violations);
    Some(SummaryPayload {
        summary: summary?,
        key_points: string_list(obj, "key_points"),
    })
}

fn required_string(
    obj: &Obj,
    path: &str,
    key: &str,
    violations: &mut Vec<Violation>,
) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            violations.push(Violation::new(path, "must be non-empty"));
            None
        }
        Some(other) => {
            violations.push(Violation::new(
                path,
                format!("expected string, got {}", type_name(other)),
            ));
            None
        }
        None => {
            violations.push(Violation::new(path, "required field missing"));
            None
        }
    }
}

fn required_unit_f64(
    obj: &Obj,
    path: &str,
    key: &str,
    violations: &mut Vec<Violation>,
) -> Option<f64> {
    match obj.get(key) {
        Some(value) => match value.as_f64() {
            Some(n) if (0.0..=1.0).contains(&n) => Some(n),
            Some(n) => {
                violations.push(Violation::new(path, format!("{} is outside [0, 1]", n)));
                None
            }
            None => {
                violations.push(Violation::new(
                    path,
                    format!("expected number, got {}", type_name(value)),
                ));
                None
            }
        },
        None => {
            violations.push(Violation::new(path, "required field missing"));
            None
        }
    }
}

fn optional_unit_f64(obj: &Obj, key: &str, violations: &mut Vec<Violation>) -> Option<f64> {
    let value = obj.get(key)?;
    match value.as_f64() {
        Some(n) if (0.0..=1.0).contains(&n) => Some(n),
        Some(n) => {
            violations.push(Violation::new(key, format!("{} is outside [0, 1]", n)));
            None
        }
        None => {
            violations.push(Violation::new(
                key,
                format!("expected number, got {}", type_name(value)),
            ));
            None
        }
    }
}

fn required_severity(
    obj: &Obj,
    path: &str,
    key: &str,
    violations: &mut Vec<Violation>,
) -> Option<Severity> {
    match obj.get(key).and_then(Value::as_str) {
        Some(s) => {
            let parsed = Severity::parse(s);
            if parsed.is_none() {
                violations.push(Violation::new(
                    path,
                    format!("'{}' is not in the severity vocabulary", s),
                ));
            }
            parsed
        }
        None => {
            violations.push(Violation::new(path, "required field missing"));
            None
        }
    }
}

/// Optional severity field defaulting to minor; vocabulary is still
/// enforced when present.
fn severity_or_default(obj: &Obj, key: &str, violations: &mut Vec<Violation>) -> Option<Severity> {
    match obj.get(key) {
        None => Some(Severity::Minor),
        Some(_) => required_severity(obj, key, key, violations),
    }
}

fn required_array<'a>(
    obj: &'a Obj,
    key: &str,
    violations: &mut Vec<Violation>,
) -> Option<&'a Vec<Value>> {
    match obj.get(key) {
        Some(Value::Array(items)) => Some(items),
        Some(other) => {
            violations.push(Violation::new(
                key,
                format!("expected array, got {}", type_name(other)),
            ));
            None
        }
        None => {
            violations.push(Violation::new(key, "required field missing"));
            None
        }
    }
}

fn string_list(obj: &Obj, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ResponseValidator {
        ResponseValidator::new()
    }

    #[test]
    fn test_valid_diagnosis() {
        let raw = r#"{
            "risk_level": "high",
            "confidence": 0.8,
            "candidates": [
                {"diagnosis": "Angina Pectoris", "icd10": "I20.9", "probability": 0.55,
                 "rationale": "exertional chest pain", "urgency": "urgent"},
                {"diagnosis": "GERD", "probability": 0.25, "urgency": "routine"}
            ]
        }"#;

        let result = validator()
            .validate(&TaskKind::DifferentialDiagnosis, raw)
            .unwrap();

        assert_eq!(result.confidence, Some(0.8));
        let TaskPayload::Diagnosis(payload) = result.payload else {
            panic!("expected diagnosis payload");
        };
        assert_eq!(payload.candidates.len(), 2);
        assert_eq!(payload.risk_level, Severity::Major);
    }

    #[test]
    fn test_diagnosis_requires_nonempty_candidates() {
        let raw = r#"{"candidates": []}"#;
        let err = validator()
            .validate(&TaskKind::DifferentialDiagnosis, raw)
            .unwrap_err();
        assert!(matches!(err, ValidationError::Schema(_)));
    }

    #[test]
    fn test_probability_out_of_range_is_not_coerced() {
        let raw = r#"{"candidates": [
            {"diagnosis": "x", "probability": 1.4, "urgency": "routine"}
        ]}"#;

        let err = validator()
            .validate(&TaskKind::DifferentialDiagnosis, raw)
            .unwrap_err();

        let ValidationError::Schema(SchemaViolations(violations)) = err else {
            panic!("expected schema error");
        };
        assert!(violations.iter().any(|v| v.field.contains("probability")));
    }

    #[test]
    fn test_all_violations_collected_first_is_primary() {
        let raw = r#"{"candidates": [
            {"probability": 2.0, "urgency": "someday"}
        ]}"#;

        let err = validator()
            .validate(&TaskKind::DifferentialDiagnosis, raw)
            .unwrap_err();

        let ValidationError::Schema(SchemaViolations(violations)) = err else {
            panic!("expected schema error");
        };
        // missing diagnosis + out-of-range probability + bad urgency
        assert_eq!(violations.len(), 3);
        assert_eq!(violations[0].field, "candidates[0].diagnosis");
    }

    #[test]
    fn test_unknown_severity_vocabulary_rejected() {
        let raw = r#"{"score": 0.5, "risk_level": "apocalyptic"}"#;
        let err = validator()
            .validate(&TaskKind::RiskStratification, raw)
            .unwrap_err();
        assert!(matches!(err, ValidationError::Schema(_)));
    }

    #[test]
    fn test_interaction_review_allows_empty_list() {
        let raw = r#"{"interactions": [], "risk_level": "low"}"#;
        let result = validator().validate(&TaskKind::InteractionReview, raw).unwrap();

        let TaskPayload::InteractionReview(payload) = result.payload else {
            panic!("expected interaction review payload");
        };
        assert!(payload.interactions.is_empty());
        assert_eq!(payload.risk_level, Severity::Minor);
    }

    #[test]
    fn test_summary_from_fenced_output() {
        let raw = "```json\n{\"summary\": \"72-year-old with stable hypertension\"}\n```";
        let result = validator().validate(&TaskKind::PatientSummary, raw).unwrap();
        assert!(matches!(result.payload, TaskPayload::Summary(_)));
    }

    #[test]
    fn test_unknown_kind_uses_summary_schema() {
        let raw = r#"{"summary": "ok"}"#;
        let kind = TaskKind::Other("care_gap_review".to_string());
        assert!(validator().validate(&kind, raw).is_ok());
    }

    #[test]
    fn test_malformed_prose_rejected() {
        let err = validator()
            .validate(&TaskKind::PatientSummary, "The patient is doing fine.")
            .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn test_bad_confidence_is_a_violation() {
        let raw = r#"{"summary": "ok", "confidence": 7}"#;
        let err = validator().validate(&TaskKind::PatientSummary, raw).unwrap_err();
        assert!(matches!(err, ValidationError::Schema(_)));
    }
}
