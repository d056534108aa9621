//! Provider health registry
//!
//! Shared, mutating record of each provider's recent outcomes. A provider
//! whose sliding window accumulates enough failures enters cool-down and is
//! skipped during chain construction — unless skipping would empty the
//! chain, in which case the least-recently-failed provider is used anyway.
//!
//! The registry is shared by all concurrently executing tasks. Each
//! provider's window lives behind its own lock, so concurrent updates
//! cannot lose counts; ordering across unrelated tasks is not guaranteed.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

/// Health tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Sliding window size (attempt outcomes per provider)
    pub window: usize,

    /// Failures within the window that trigger cool-down
    pub failure_threshold: usize,

    /// How long a provider stays in cool-down
    #[serde(with = "humantime_serde")]
    pub cooldown: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            window: 5,
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
        }
    }
}

impl HealthConfig {
    /// Builder: set window size
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    /// Builder: set failure threshold
    pub fn with_failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Builder: set cool-down duration
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

#[derive(Debug, Default)]
struct ProviderHealth {
    /// Recent outcomes, true = failure
    window: VecDeque<bool>,
    cooldown_until: Option<Instant>,
    last_failure: Option<Instant>,
}

impl ProviderHealth {
    fn record(&mut self, failure: bool, config: &HealthConfig) {
        self.window.push_back(failure);
        while self.window.len() > config.window {
            self.window.pop_front();
        }

        if failure {
            self.last_failure = Some(Instant::now());
            let failures = self.window.iter().filter(|f| **f).count();
            if failures >= config.failure_threshold {
                self.cooldown_until = Some(Instant::now() + config.cooldown);
            }
        }
    }

    fn in_cooldown(&self) -> bool {
        self.cooldown_until.is_some_and(|until| Instant::now() < until)
    }
}

/// Shared health registry for all providers.
pub struct HealthRegistry {
    config: HealthConfig,
    providers: RwLock<HashMap<String, Mutex<ProviderHealth>>>,
}

impl HealthRegistry {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Create with default config
    pub fn default_config() -> Self {
        Self::new(HealthConfig::default())
    }

    /// Record a successful attempt
    pub fn record_success(&self, provider: &str) {
        self.with_entry(provider, |health, config| health.record(false, config));
    }

    /// Record a failed attempt
    pub fn record_failure(&self, provider: &str) {
        self.with_entry(provider, |health, config| health.record(true, config));
    }

    /// Whether the provider is currently usable (not in cool-down)
    pub fn is_available(&self, provider: &str) -> bool {
        let providers = self.providers.read().unwrap();
        match providers.get(provider) {
            Some(entry) => !entry.lock().unwrap().in_cooldown(),
            None => true,
        }
    }

    /// Failures currently in the provider's window
    pub fn failure_count(&self, provider: &str) -> usize {
        let providers = self.providers.read().unwrap();
        match providers.get(provider) {
            Some(entry) => entry.lock().unwrap().window.iter().filter(|f| **f).count(),
            None => 0,
        }
    }

    /// Filter a declared chain by cool-down state, preserving order.
    ///
    /// If every candidate is cooling down, returns the single
    /// least-recently-failed candidate (ties broken by name) rather than an
    /// empty chain.
    pub fn filter_chain(&self, candidates: &[String]) -> Vec<String> {
        let available: Vec<String> = candidates
            .iter()
            .filter(|name| self.is_available(name))
            .cloned()
            .collect();

        if !available.is_empty() || candidates.is_empty() {
            return available;
        }

        let providers = self.providers.read().unwrap();
        let last_failure = |name: &str| {
            providers
                .get(name)
                .and_then(|entry| entry.lock().unwrap().last_failure)
        };

        // None sorts before Some, so a provider with no recorded failure
        // counts as least-recently-failed
        let fallback = candidates.iter().min_by(|a, b| {
            last_failure(a.as_str())
                .cmp(&last_failure(b.as_str()))
                .then_with(|| a.cmp(b))
        });

        tracing::warn!(
            chain = ?candidates,
            fallback = ?fallback,
            "all providers cooling down, using least-recently-failed"
        );

        fallback.map(|name| vec![name.clone()]).unwrap_or_default()
    }

    fn with_entry(&self, provider: &str, f: impl FnOnce(&mut ProviderHealth, &HealthConfig)) {
        {
            let providers = self.providers.read().unwrap();
            if let Some(entry) = providers.get(provider) {
                f(&mut entry.lock().unwrap(), &self.config);
                return;
            }
        }

        let mut providers = self.providers.write().unwrap();
        let entry = providers
            .entry(provider.to_string())
            .or_insert_with(|| Mutex::new(ProviderHealth::default()));
        f(&mut entry.lock().unwrap(), &self.config);
    }
}

impl std::fmt::Debug for HealthRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let providers = self.providers.read().unwrap();
        f.debug_struct("HealthRegistry")
            .field("config", &self.config)
            .field("tracked", &providers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn registry() -> HealthRegistry {
        HealthRegistry::default_config()
    }

    #[test]
    fn test_unknown_provider_is_available() {
        assert!(registry().is_available("never-seen"));
    }

    #[test]
    fn test_cooldown_after_threshold_failures() {
        let registry = registry();

        registry.record_failure("a");
        registry.record_failure("a");
        assert!(registry.is_available("a"));

        registry.record_failure("a");
        assert!(!registry.is_available("a"));
    }

    #[test]
    fn test_successes_push_failures_out_of_window() {
        let registry = registry();

        registry.record_failure("a");
        registry.record_failure("a");
        for _ in 0..5 {
            registry.record_success("a");
        }

        assert_eq!(registry.failure_count("a"), 0);
        assert!(registry.is_available("a"));
    }

    #[test]
    fn test_cooldown_expires() {
        let registry = HealthRegistry::new(
            HealthConfig::default().with_cooldown(Duration::from_millis(20)),
        );

        for _ in 0..3 {
            registry.record_failure("a");
        }
        assert!(!registry.is_available("a"));

        std::thread::sleep(Duration::from_millis(30));
        assert!(registry.is_available("a"));
    }

    #[test]
    fn test_filter_chain_preserves_order() {
        let registry = registry();
        for _ in 0..3 {
            registry.record_failure("b");
        }

        let chain = registry.filter_chain(&["a".into(), "b".into(), "c".into()]);
        assert_eq!(chain, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_filter_chain_never_returns_empty_for_nonempty_input() {
        let registry = registry();
        for _ in 0..3 {
            registry.record_failure("a");
        }
        std::thread::sleep(Duration::from_millis(5));
        for _ in 0..3 {
            registry.record_failure("b");
        }

        // Both cooling down; "a" failed longer ago
        let chain = registry.filter_chain(&["a".into(), "b".into()]);
        assert_eq!(chain, vec!["a".to_string()]);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let registry = Arc::new(HealthRegistry::new(
            HealthConfig::default().with_window(1000).with_failure_threshold(1000),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        registry.record_failure("shared");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.failure_count("shared"), 800);
    }
}
