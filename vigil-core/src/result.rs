//! Result types: attempt log, structured model output, annotated answer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::provider::TokenUsage;
use crate::safety::{SafetyFinding, Severity};
use crate::task::TaskKind;
use crate::validate::TaskPayload;

/// Outcome of one provider invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Schema-valid response accepted
    Success,
    /// Network or connection failure
    Transport { message: String },
    /// Provider rate-limited the call
    RateLimited,
    /// Per-call timeout elapsed
    Timeout,
    /// Response received but failed schema validation
    InvalidResponse { reason: String },
    /// The task deadline elapsed; in-flight work abandoned
    DeadlineExceeded,
    /// Chain walked to the end with no accepted result
    AllProvidersExhausted,
}

/// One entry in a task's attempt log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Provider registry name ("chain" for the exhaustion marker)
    pub provider: String,

    /// 1-indexed attempt number on that provider
    pub attempt: usize,

    pub outcome: AttemptOutcome,

    pub latency_ms: u64,

    pub at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(provider: impl Into<String>, attempt: usize, outcome: AttemptOutcome, latency_ms: u64) -> Self {
        Self {
            provider: provider.into(),
            attempt,
            outcome,
            latency_ms,
            at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

/// Validated model output for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredResult {
    /// Registry name of the provider that produced the accepted response
    pub provider_used: String,

    pub kind: TaskKind,

    pub payload: TaskPayload,

    /// Model-reported confidence in [0, 1], when present
    pub confidence: Option<f64>,

    pub usage: Option<TokenUsage>,
}

impl StructuredResult {
    /// Risk level the model itself declared.
    pub fn declared_risk(&self) -> Severity {
        self.payload.declared_risk()
    }
}

/// The final answer: AI output (when available) merged with deterministic
/// safety findings. Always produced when safety evaluation is computable,
/// even if every provider failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyAnnotatedResult {
    pub task_id: Uuid,

    pub kind: TaskKind,

    /// None when the AI layer is degraded
    pub structured: Option<StructuredResult>,

    /// Deterministic findings; these can only raise `overall_risk`
    pub findings: Vec<SafetyFinding>,

    /// max(AI-declared risk, max finding severity)
    pub overall_risk: Severity,

    /// True if any finding is an absolute contraindication
    pub blocking: bool,

    /// True when no provider produced an accepted result
    pub ai_degraded: bool,

    /// True when safety evaluation could not cover the full regimen
    pub incomplete: bool,

    pub attempts: Vec<AttemptRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{SummaryPayload, TaskPayload};

    #[test]
    fn test_attempt_record_success_flag() {
        let ok = AttemptRecord::new("local", 1, AttemptOutcome::Success, 12);
        let failed = AttemptRecord::new(
            "local",
            1,
            AttemptOutcome::Transport {
                message: "connection refused".into(),
            },
            3,
        );

        assert!(ok.is_success());
        assert!(!failed.is_success());
    }

    #[test]
    fn test_declared_risk_passthrough() {
        let result = StructuredResult {
            provider_used: "local".into(),
            kind: TaskKind::PatientSummary,
            payload: TaskPayload::Summary(SummaryPayload {
                summary: "stable".into(),
                key_points: vec![],
            }),
            confidence: None,
            usage: None,
        };

        assert_eq!(result.declared_risk(), Severity::Minor);
    }
}
