//! Orchestrator
//!
//! Drives a clinical task through the provider chain: classify, build the
//! chain from the health registry, attempt providers strictly in sequence
//! with bounded same-provider retries, validate the first response that
//! arrives, and merge the outcome with the deterministic safety evaluators.
//! The safety evaluation runs whether or not any provider succeeded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audit::{AuditSink, TracingAuditSink};
use crate::classifier;
use crate::config::{ChainConfig, OrchestratorConfig, VigilConfig};
use crate::error::{Result, VigilError};
use crate::prompt::{ClinicalPromptRenderer, PromptRenderer, RenderedPrompt};
use crate::provider::factory::ProviderFactory;
use crate::provider::{
    HealthRegistry, ProviderClient, ProviderError, ProviderRequest, RetryPolicy, RetryState,
};
use crate::result::{AttemptOutcome, AttemptRecord, SafetyAnnotatedResult, StructuredResult};
use crate::safety::{InteractionEngine, RedFlagDetector, ReferenceData, Severity};
use crate::task::Task;
use crate::validate::ResponseValidator;

/// Registry name used for the chain-exhaustion marker in the attempt log.
const CHAIN_MARKER: &str = "chain";

pub struct Orchestrator {
    providers: HashMap<String, Arc<dyn ProviderClient>>,
    chains: ChainConfig,
    registry: Arc<HealthRegistry>,
    renderer: Arc<dyn PromptRenderer>,
    validator: ResponseValidator,
    interactions: InteractionEngine,
    red_flags: RedFlagDetector,
    audit: Arc<dyn AuditSink>,
    retry: RetryPolicy,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("chains", &self.chains)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Orchestrator {
    /// Create a new orchestrator builder
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Build an orchestrator from configuration: constructs every
    /// configured provider and loads reference data.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid configuration, an unconstructable
    /// provider, or unreadable reference data.
    pub fn from_config(config: &VigilConfig) -> Result<Self> {
        config.validate()?;

        let reference = match &config.reference_data_path {
            Some(path) => ReferenceData::from_file(path)?,
            None => ReferenceData::builtin(),
        };

        let mut builder = Self::builder()
            .chains(config.chains.clone())
            .retry_policy(config.retry.clone())
            .orchestrator_config(config.orchestrator.clone())
            .health_registry(Arc::new(HealthRegistry::new(config.health.clone())))
            .reference_data(reference);

        for (name, client) in ProviderFactory::build_all(&config.providers)? {
            builder = builder.provider(name, client);
        }

        builder.build()
    }

    /// Execute one clinical task.
    ///
    /// Always returns a `SafetyAnnotatedResult` when the payload supports
    /// safety evaluation, even if every provider failed. The only hard
    /// errors are an unusable deadline and a payload no evaluator can read.
    ///
    /// # Errors
    ///
    /// `VigilError::InvalidDeadline` for a zero deadline,
    /// `VigilError::InvalidTask` for a payload with no clinical content.
    pub async fn execute(&self, task: &Task) -> Result<SafetyAnnotatedResult> {
        if task.deadline.is_zero() {
            return Err(VigilError::InvalidDeadline(task.deadline));
        }
        if !task.payload.supports_safety_evaluation() {
            return Err(VigilError::InvalidTask(
                "payload contains no medications, symptoms, or vital signs; no safety \
                 evaluation is possible"
                    .to_string(),
            ));
        }

        let start = Instant::now();
        let tier = classifier::classify(&task.kind);

        let declared: Vec<String> = self
            .chains
            .for_tier(tier)
            .iter()
            .filter(|name| {
                let configured = self.providers.contains_key(name.as_str());
                if !configured {
                    tracing::warn!(provider = %name, "chain references unconfigured provider, skipping");
                }
                configured
            })
            .cloned()
            .collect();

        let chain = self.registry.filter_chain(&declared);

        tracing::info!(
            task_id = %task.id,
            kind = %task.kind,
            ?tier,
            ?chain,
            "routing task"
        );

        let rendered = match self.renderer.render(task) {
            Ok(rendered) => Some(rendered),
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "prompt rendering failed, AI layer degraded");
                None
            }
        };

        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut structured: Option<StructuredResult> = None;
        let mut deadline_hit = false;

        if let Some(prompt) = &rendered {
            (structured, deadline_hit) = self
                .walk_chain(task, &chain, prompt, start, &mut attempts)
                .await;
        }

        let ai_degraded = structured.is_none();
        if ai_degraded && !deadline_hit && rendered.is_some() && !chain.is_empty() {
            attempts.push(AttemptRecord::new(
                CHAIN_MARKER,
                1,
                AttemptOutcome::AllProvidersExhausted,
                0,
            ));
            tracing::warn!(task_id = %task.id, "all providers exhausted, returning degraded result");
        }

        // Safety evaluation always runs; it needs no AI output
        let report = self
            .interactions
            .evaluate(&task.payload)
            .merge(
                self.red_flags
                    .evaluate(&task.payload.chief_complaints, &task.payload.vital_signs),
            );

        let declared_risk = structured
            .as_ref()
            .map(StructuredResult::declared_risk)
            .unwrap_or(Severity::Minor);
        let overall_risk = report
            .max_severity()
            .map_or(declared_risk, |s| declared_risk.max(s));

        let result = SafetyAnnotatedResult {
            task_id: task.id,
            kind: task.kind.clone(),
            structured,
            blocking: report.has_blocking(),
            incomplete: report.incomplete,
            findings: report.findings,
            overall_risk,
            ai_degraded,
            attempts: attempts.clone(),
        };

        self.audit.record(&attempts, &result);

        Ok(result)
    }

    /// Walk the provider chain in strict sequence. Returns the accepted
    /// result (if any) and whether the task deadline cut the walk short.
    async fn walk_chain(
        &self,
        task: &Task,
        chain: &[String],
        prompt: &RenderedPrompt,
        start: Instant,
        attempts: &mut Vec<AttemptRecord>,
    ) -> (Option<StructuredResult>, bool) {
        let request = ProviderRequest {
            system: Some(prompt.system.clone()),
            user: prompt.user.clone(),
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
        };

        for name in chain {
            let Some(client) = self.providers.get(name) else {
                continue;
            };

            let mut state = RetryState::new(self.retry.clone());

            loop {
                let remaining = task.deadline.saturating_sub(start.elapsed());
                if remaining.is_zero() {
                    attempts.push(AttemptRecord::new(
                        name.clone(),
                        state.attempts_made() + 1,
                        AttemptOutcome::DeadlineExceeded,
                        0,
                    ));
                    tracing::warn!(task_id = %task.id, provider = %name, "task deadline elapsed");
                    return (None, true);
                }

                let call_timeout = self.config.call_timeout.min(remaining);
                let attempt_number = state.attempts_made() + 1;
                let call_start = Instant::now();

                tracing::debug!(
                    task_id = %task.id,
                    provider = %name,
                    attempt = attempt_number,
                    ?call_timeout,
                    "invoking provider"
                );

                // The outer timeout abandons the in-flight call even if the
                // client ignores its own timeout argument
                let outcome = tokio::time::timeout(call_timeout, client.invoke(&request, call_timeout))
                    .await
                    .unwrap_or(Err(ProviderError::Timeout(call_timeout)));

                let latency_ms = call_start.elapsed().as_millis() as u64;

                match outcome {
                    Ok(response) => {
                        self.registry.record_success(name);

                        match self.validator.validate(&task.kind, &response.content) {
                            Ok(validated) => {
                                attempts.push(AttemptRecord::new(
                                    name.clone(),
                                    attempt_number,
                                    AttemptOutcome::Success,
                                    latency_ms,
                                ));
                                tracing::info!(
                                    task_id = %task.id,
                                    provider = %name,
                                    latency_ms,
                                    "provider response accepted"
                                );
                                return (
                                    Some(StructuredResult {
                                        provider_used: name.clone(),
                                        kind: task.kind.clone(),
                                        payload: validated.payload,
                                        confidence: validated.confidence,
                                        usage: response.usage,
                                    }),
                                    false,
                                );
                            }
                            Err(e) => {
                                // Model-quality failure, not transient:
                                // advance to the next provider immediately
                                attempts.push(AttemptRecord::new(
                                    name.clone(),
                                    attempt_number,
                                    AttemptOutcome::InvalidResponse {
                                        reason: e.to_string(),
                                    },
                                    latency_ms,
                                ));
                                tracing::warn!(
                                    task_id = %task.id,
                                    provider = %name,
                                    error = %e,
                                    "response failed validation, advancing to next provider"
                                );
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        self.registry.record_failure(name);
                        attempts.push(AttemptRecord::new(
                            name.clone(),
                            attempt_number,
                            outcome_for(&e),
                            latency_ms,
                        ));
                        state.record_attempt(e.to_string());

                        tracing::warn!(
                            task_id = %task.id,
                            provider = %name,
                            attempt = attempt_number,
                            error = %e,
                            "provider attempt failed"
                        );

                        if !e.is_retryable() || !state.should_retry() {
                            break;
                        }

                        let remaining = task.deadline.saturating_sub(start.elapsed());
                        tokio::time::sleep(state.next_delay().min(remaining)).await;
                    }
                }
            }
        }

        (None, false)
    }
}

fn outcome_for(error: &ProviderError) -> AttemptOutcome {
    match error {
        ProviderError::Timeout(_) => AttemptOutcome::Timeout,
        ProviderError::RateLimited => AttemptOutcome::RateLimited,
        ProviderError::Transport(message) => AttemptOutcome::Transport {
            message: truncate(message, 200),
        },
        ProviderError::Api { status, message } => AttemptOutcome::Transport {
            message: format!("HTTP {}: {}", status, truncate(message, 160)),
        },
        ProviderError::NotConfigured(message) => AttemptOutcome::Transport {
            message: truncate(message, 200),
        },
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

/// Builder for Orchestrator
pub struct OrchestratorBuilder {
    providers: HashMap<String, Arc<dyn ProviderClient>>,
    chains: ChainConfig,
    registry: Option<Arc<HealthRegistry>>,
    renderer: Option<Arc<dyn PromptRenderer>>,
    audit: Option<Arc<dyn AuditSink>>,
    retry: RetryPolicy,
    config: OrchestratorConfig,
    reference: Option<ReferenceData>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            chains: ChainConfig::default(),
            registry: None,
            renderer: None,
            audit: None,
            retry: RetryPolicy::default(),
            config: OrchestratorConfig::default(),
            reference: None,
        }
    }

    /// Register a provider under a registry name
    pub fn provider(mut self, name: impl Into<String>, client: Arc<dyn ProviderClient>) -> Self {
        self.providers.insert(name.into(), client);
        self
    }

    /// Set the per-tier chains
    pub fn chains(mut self, chains: ChainConfig) -> Self {
        self.chains = chains;
        self
    }

    /// Inject a health registry (shared across orchestrators or pre-seeded
    /// in tests)
    pub fn health_registry(mut self, registry: Arc<HealthRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the prompt renderer
    pub fn renderer(mut self, renderer: Arc<dyn PromptRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Set the audit sink
    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Set the retry policy
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set orchestrator timing/generation defaults
    pub fn orchestrator_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set reference data for the safety evaluators
    pub fn reference_data(mut self, reference: ReferenceData) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is registered.
    pub fn build(self) -> Result<Orchestrator> {
        if self.providers.is_empty() {
            return Err(VigilError::Configuration(
                "at least one provider must be registered".to_string(),
            ));
        }

        let reference = self.reference.unwrap_or_else(ReferenceData::builtin);

        Ok(Orchestrator {
            providers: self.providers,
            chains: self.chains,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(HealthRegistry::default_config())),
            renderer: self
                .renderer
                .unwrap_or_else(|| Arc::new(ClinicalPromptRenderer::new())),
            validator: ResponseValidator::new(),
            interactions: InteractionEngine::new(&reference),
            red_flags: RedFlagDetector::new(&reference),
            audit: self.audit.unwrap_or_else(|| Arc::new(TracingAuditSink)),
            retry: self.retry,
            config: self.config,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
