//! # Vigil - Clinical AI Orchestration with a Deterministic Safety Net
//!
//! Vigil drives clinical tasks (differential diagnosis, treatment planning,
//! drug-interaction review, summaries) through a chain of language-model
//! providers with bounded retries and failover, validates structured
//! output, and cross-checks every answer against a deterministic rule
//! engine — drug-interaction severity grading, allergy cross-reactivity,
//! and red-flag symptom detection — that surfaces danger signals even when
//! the model layer is unavailable or wrong.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use vigil_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = VigilConfig::load()?;
//!     let orchestrator = Orchestrator::from_config(&config)?;
//!
//!     let task = Task::new(
//!         TaskKind::InteractionReview,
//!         ClinicalPayload {
//!             active_medications: vec!["Warfarin".into()],
//!             proposed_medications: vec!["Ibuprofen".into()],
//!             ..Default::default()
//!         },
//!         Duration::from_secs(60),
//!     );
//!
//!     let result = orchestrator.execute(&task).await?;
//!     for finding in &result.findings {
//!         println!("{}: {}", finding.severity, finding.rationale);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Classifier**: pure task-kind → complexity-tier mapping
//! - **Health registry**: sliding-window failure tracking with cool-down
//! - **Orchestrator**: sequential provider attempts, retry with backoff,
//!   failover, one end-to-end deadline
//! - **Validator**: per-task-kind schema checks, no silent coercion
//! - **Safety net**: interaction engine + red-flag detector, always run

pub mod audit;
pub mod classifier;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod result;
pub mod safety;
pub mod task;
pub mod validate;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::audit::{AuditSink, NullAuditSink, TracingAuditSink};
    pub use crate::classifier::classify;
    pub use crate::config::{
        ChainConfig, OrchestratorConfig, ProviderConfig, ProviderKind, VigilConfig,
    };
    pub use crate::error::{Result, VigilError};
    pub use crate::orchestrator::{Orchestrator, OrchestratorBuilder};
    pub use crate::prompt::{ClinicalPromptRenderer, PromptRenderer, RenderedPrompt};
    pub use crate::provider::{
        HealthConfig, HealthRegistry, ProviderClient, ProviderError, ProviderFactory, ProviderInfo,
        ProviderRequest, ProviderResponse, RetryPolicy, RetryState, TokenUsage,
    };
    pub use crate::provider::providers::{AnthropicProvider, LocalProvider, OpenAiProvider};
    pub use crate::result::{
        AttemptOutcome, AttemptRecord, SafetyAnnotatedResult, StructuredResult,
    };
    pub use crate::safety::{
        FindingKind, InteractionEngine, InteractionRule, RedFlagDetector, RedFlagRule,
        ReferenceData, SafetyFinding, SafetyReport, Severity, VitalKind, VitalThreshold,
    };
    pub use crate::task::{ClinicalPayload, ComplexityTier, Task, TaskKind, VitalSigns};
    pub use crate::validate::{
        ResponseValidator, TaskPayload, Urgency, ValidatedResponse, ValidationError, Violation,
    };
}
