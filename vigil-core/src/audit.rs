//! Audit sink
//!
//! Fire-and-forget recording of attempt logs and results. A sink that
//! fails must never fail the clinical call; implementations swallow their
//! own errors.

use crate::result::{AttemptRecord, SafetyAnnotatedResult};

/// Trait for audit sinks.
pub trait AuditSink: Send + Sync {
    /// Record a completed task. Must not panic or block for long.
    fn record(&self, attempts: &[AttemptRecord], result: &SafetyAnnotatedResult);
}

/// Default sink: structured log records via `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, attempts: &[AttemptRecord], result: &SafetyAnnotatedResult) {
        tracing::info!(
            task_id = %result.task_id,
            kind = %result.kind,
            attempts = attempts.len(),
            ai_degraded = result.ai_degraded,
            findings = result.findings.len(),
            overall_risk = %result.overall_risk,
            incomplete = result.incomplete,
            "task audit"
        );

        if result.blocking {
            tracing::warn!(
                task_id = %result.task_id,
                "contraindication present in result"
            );
        }
    }
}

/// No-op sink for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _attempts: &[AttemptRecord], _result: &SafetyAnnotatedResult) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::Severity;
    use crate::task::TaskKind;
    use uuid::Uuid;

    fn result() -> SafetyAnnotatedResult {
        SafetyAnnotatedResult {
            task_id: Uuid::new_v4(),
            kind: TaskKind::PatientSummary,
            structured: None,
            findings: vec![],
            overall_risk: Severity::Minor,
            blocking: false,
            ai_degraded: true,
            incomplete: false,
            attempts: vec![],
        }
    }

    #[test]
    fn test_sinks_do_not_panic() {
        let result = result();
        TracingAuditSink.record(&[], &result);
        NullAuditSink.record(&[], &result);
    }
}
