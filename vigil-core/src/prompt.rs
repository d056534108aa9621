//! Prompt rendering
//!
//! Turns a task's kind and clinical payload into provider-ready text. The
//! orchestrator only depends on the trait; wording lives in the default
//! implementation and callers can swap their own.

use crate::error::{Result, VigilError};
use crate::task::{Task, TaskKind};

/// A rendered prompt: system instructions plus user content.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Trait for prompt renderers.
pub trait PromptRenderer: Send + Sync {
    /// Render a task into provider-ready text.
    ///
    /// # Errors
    ///
    /// Fails only on a payload that cannot be rendered at all.
    fn render(&self, task: &Task) -> Result<RenderedPrompt>;
}

/// Default per-kind templates with a JSON-format instruction matched to the
/// response validator's schemas.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClinicalPromptRenderer;

impl ClinicalPromptRenderer {
    pub fn new() -> Self {
        Self
    }

    fn format_instruction(kind: &TaskKind) -> &'static str {
        match kind {
            TaskKind::DifferentialDiagnosis => {
                r#"Respond with JSON only: {"risk_level": "minor|moderate|major|critical", "confidence": 0.0-1.0, "candidates": [{"diagnosis": "...", "icd10": "...", "probability": 0.0-1.0, "rationale": "...", "urgency": "routine|soon|urgent|immediate"}]} ordered from most to least likely."#
            }
            TaskKind::TreatmentPlanning => {
                r#"Respond with JSON only: {"risk_level": "minor|moderate|major|critical", "recommendations": [{"therapy": "...", "rationale": "...", "monitoring": ["..."]}]}."#
            }
            TaskKind::InteractionReview => {
                r#"Respond with JSON only: {"risk_level": "minor|moderate|major|critical", "interactions": [{"drug_a": "...", "drug_b": "...", "severity": "minor|moderate|major|critical", "note": "..."}]}. Use an empty interactions list if none are found."#
            }
            TaskKind::RiskStratification => {
                r#"Respond with JSON only: {"score": 0.0-1.0, "risk_level": "minor|moderate|major|critical", "drivers": ["..."]}."#
            }
            TaskKind::LabTrendAnalysis => {
                r#"Respond with JSON only: {"summary": "...", "trends": [{"parameter": "...", "direction": "improving|stable|worsening", "comment": "..."}]}."#
            }
            TaskKind::MedicationAdherence => {
                r#"Respond with JSON only: {"assessment": "...", "concerns": ["..."]}."#
            }
            TaskKind::PatientSummary | TaskKind::Other(_) => {
                r#"Respond with JSON only: {"summary": "...", "key_points": ["..."]}."#
            }
        }
    }

    fn objective(kind: &TaskKind) -> String {
        match kind {
            TaskKind::PatientSummary => "Summarize the patient's current state.".to_string(),
            TaskKind::LabTrendAnalysis => {
                "Analyze the laboratory trends in the clinical context.".to_string()
            }
            TaskKind::MedicationAdherence => {
                "Assess medication adherence from the clinical context.".to_string()
            }
            TaskKind::DifferentialDiagnosis => {
                "Generate a differential diagnosis for this presentation.".to_string()
            }
            TaskKind::TreatmentPlanning => {
                "Propose a treatment plan for this presentation.".to_string()
            }
            TaskKind::InteractionReview => {
                "Review the medication regimen for drug interactions.".to_string()
            }
            TaskKind::RiskStratification => {
                "Stratify this patient's clinical risk.".to_string()
            }
            TaskKind::Other(name) => format!("Perform the clinical task: {}.", name),
        }
    }
}

impl PromptRenderer for ClinicalPromptRenderer {
    fn render(&self, task: &Task) -> Result<RenderedPrompt> {
        let payload = &task.payload;

        let mut sections = Vec::new();

        if !payload.chief_complaints.is_empty() {
            sections.push(format!(
                "Chief complaints:\n{}",
                bullet_list(&payload.chief_complaints)
            ));
        }
        if payload.vital_signs.any_present() {
            sections.push(format!(
                "Vital signs:\n{}",
                serde_json::to_string_pretty(&payload.vital_signs)?
            ));
        }
        if !payload.active_medications.is_empty() {
            sections.push(format!(
                "Active medications:\n{}",
                bullet_list(&payload.active_medications)
            ));
        }
        if !payload.proposed_medications.is_empty() {
            sections.push(format!(
                "Proposed medications:\n{}",
                bullet_list(&payload.proposed_medications)
            ));
        }
        if !payload.allergies.is_empty() {
            sections.push(format!("Known allergies:\n{}", bullet_list(&payload.allergies)));
        }
        if !payload.clinical_context.is_null() {
            sections.push(format!(
                "Additional context:\n{}",
                serde_json::to_string_pretty(&payload.clinical_context)?
            ));
        }

        if sections.is_empty() {
            return Err(VigilError::InvalidTask(
                "payload has no renderable clinical content".to_string(),
            ));
        }

        let system = format!(
            "You are a clinical decision-support assistant. Base every statement on the \
             provided context and state uncertainty explicitly. {}",
            Self::format_instruction(&task.kind)
        );

        let user = format!(
            "{}\n\n{}",
            Self::objective(&task.kind),
            sections.join("\n\n")
        );

        Ok(RenderedPrompt { system, user })
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ClinicalPayload, Task, VitalSigns};
    use std::time::Duration;

    fn task(kind: TaskKind) -> Task {
        Task::new(
            kind,
            ClinicalPayload {
                chief_complaints: vec!["chest pain".into()],
                vital_signs: VitalSigns {
                    heart_rate: Some(110.0),
                    ..Default::default()
                },
                active_medications: vec!["Warfarin".into()],
                ..Default::default()
            },
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_render_includes_sections_and_format() {
        let prompt = ClinicalPromptRenderer::new()
            .render(&task(TaskKind::DifferentialDiagnosis))
            .unwrap();

        assert!(prompt.system.contains("candidates"));
        assert!(prompt.user.contains("Chief complaints"));
        assert!(prompt.user.contains("Warfarin"));
        assert!(prompt.user.contains("differential") || prompt.user.contains("diagnosis"));
    }

    #[test]
    fn test_render_empty_payload_fails() {
        let task = Task::new(
            TaskKind::PatientSummary,
            ClinicalPayload::default(),
            Duration::from_secs(30),
        );

        let result = ClinicalPromptRenderer::new().render(&task);
        assert!(matches!(result, Err(VigilError::InvalidTask(_))));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = ClinicalPromptRenderer::new();
        let task = task(TaskKind::InteractionReview);

        let a = renderer.render(&task).unwrap();
        let b = renderer.render(&task).unwrap();
        assert_eq!(a.user, b.user);
        assert_eq!(a.system, b.system);
    }
}
