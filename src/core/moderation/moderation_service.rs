// Moderation service - owns the live rule set and classifier.
//
// Everything an analysis needs (rules, classifier, gate settings) is bundled
// into one immutable snapshot. Reloading builds a whole new snapshot and
// swaps the pointer, so an analysis that already holds the old `Arc` keeps
// evaluating against the rules it started with.
//
// NO HTTP or game-server dependencies here.

use super::classifier::{Classifier, ClassifierError, UnconfiguredClassifier};
use super::evaluator::evaluate;
use super::moderation_models::{GateSettings, ModerationVerdict, RuleError, RuleSet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Classifier API key is not set")]
    MissingCredential,

    #[error("Failed to read config: {0}")]
    Io(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("Failed to build classifier client: {0}")]
    Client(String),
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Immutable bundle an analysis task captures when its event is intercepted.
pub struct ModerationSnapshot {
    pub rules: RuleSet,
    pub classifier: Arc<dyn Classifier>,
    pub settings: GateSettings,
    pub loaded_at: DateTime<Utc>,
}

impl ModerationSnapshot {
    pub fn new(rules: RuleSet, classifier: Arc<dyn Classifier>, settings: GateSettings) -> Self {
        Self {
            rules,
            classifier,
            settings,
            loaded_at: Utc::now(),
        }
    }

    /// No rules and a classifier that always fails. Used until the first
    /// successful load; the default fail-open policy lets content through.
    pub fn unconfigured() -> Self {
        Self::new(
            RuleSet::default(),
            Arc::new(UnconfiguredClassifier),
            GateSettings::default(),
        )
    }

    /// Classify `sample` and evaluate it against this snapshot's rules.
    pub async fn analyze(&self, sample: &str) -> Result<ModerationVerdict, ClassifierError> {
        let result = self.classifier.classify(sample, &self.rules).await?;
        tracing::debug!(scores = result.len(), "Classification received");
        Ok(evaluate(&result, &self.rules))
    }
}

// ============================================================================
// CONFIG SOURCE (PORT)
// ============================================================================

/// Loads a complete snapshot (credential, rules, settings) from somewhere.
#[async_trait]
pub trait ModerationConfigSource: Send + Sync {
    async fn load(&self) -> Result<ModerationSnapshot, ConfigError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService {
    current: RwLock<Arc<ModerationSnapshot>>,
}

impl ModerationService {
    pub fn new(snapshot: ModerationSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot new analyses should use.
    pub async fn snapshot(&self) -> Arc<ModerationSnapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Atomically replace the live snapshot.
    pub async fn replace(&self, snapshot: ModerationSnapshot) {
        *self.current.write().await = Arc::new(snapshot);
    }

    /// Load a new snapshot from `source` and swap it in.
    ///
    /// On failure the previous rules and classifier stay live. Returns the
    /// number of rules loaded.
    pub async fn reload<S>(&self, source: &S) -> Result<usize, ConfigError>
    where
        S: ModerationConfigSource + ?Sized,
    {
        let snapshot = match source.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Config reload failed, keeping previous rules");
                return Err(e);
            }
        };

        let count = snapshot.rules.len();
        if count == 0 {
            tracing::warn!("Moderation config has no rules, nothing will be flagged");
        }

        tracing::info!(
            rules = count,
            fail_policy = %snapshot.settings.fail_policy,
            "Moderation rules loaded"
        );

        self.replace(snapshot).await;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::moderation_models::{
        ClassificationResult, FailPolicy, Rule, RuleAction,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedClassifier {
        scores: HashMap<String, f64>,
    }

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(
            &self,
            _sample: &str,
            _rules: &RuleSet,
        ) -> Result<ClassificationResult, ClassifierError> {
            Ok(ClassificationResult::from_validated(self.scores.clone()))
        }
    }

    fn rule(name: &str, threshold: f64) -> Rule {
        Rule {
            name: name.to_string(),
            description: String::new(),
            threshold,
            action: RuleAction::Warn,
            action_message: "Rule violation: %rule%".to_string(),
            command: String::new(),
        }
    }

    fn snapshot(rules: Vec<Rule>, scores: &[(&str, f64)]) -> ModerationSnapshot {
        let scores = scores.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        ModerationSnapshot::new(
            RuleSet::new(rules).unwrap(),
            Arc::new(FixedClassifier { scores }),
            GateSettings::default(),
        )
    }

    /// Hands out prepared results in order.
    struct QueuedSource {
        results: Mutex<Vec<Result<ModerationSnapshot, ConfigError>>>,
    }

    #[async_trait]
    impl ModerationConfigSource for QueuedSource {
        async fn load(&self) -> Result<ModerationSnapshot, ConfigError> {
            self.results.lock().unwrap().remove(0)
        }
    }

    #[tokio::test]
    async fn test_analyze_uses_snapshot_rules() {
        let snap = snapshot(vec![rule("Toxicity", 0.8)], &[("Toxicity", 0.95)]);
        let verdict = snap.analyze("you are terrible").await.unwrap();
        assert!(matches!(verdict, ModerationVerdict::Violation(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_snapshot_fails_classification() {
        let snap = ModerationSnapshot::unconfigured();
        assert!(snap.rules.is_empty());
        assert_eq!(snap.settings.fail_policy, FailPolicy::Open);
        assert!(snap.analyze("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_reload_swaps_snapshot() {
        let service = ModerationService::new(ModerationSnapshot::unconfigured());
        let source = QueuedSource {
            results: Mutex::new(vec![Ok(snapshot(
                vec![rule("A", 0.5), rule("B", 0.5)],
                &[],
            ))]),
        };

        let count = service.reload(&source).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(service.snapshot().await.rules.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let service = ModerationService::new(snapshot(vec![rule("A", 0.5)], &[]));
        let source = QueuedSource {
            results: Mutex::new(vec![Err(ConfigError::MissingCredential)]),
        };

        let result = service.reload(&source).await;
        assert!(matches!(result, Err(ConfigError::MissingCredential)));

        let current = service.snapshot().await;
        assert_eq!(current.rules.len(), 1);
        assert!(current.rules.get("A").is_some());
    }

    #[tokio::test]
    async fn test_held_snapshot_survives_reload() {
        let service = ModerationService::new(snapshot(vec![rule("Old", 0.5)], &[("Old", 0.9)]));
        let held = service.snapshot().await;

        service
            .replace(snapshot(vec![rule("New", 0.5)], &[("New", 0.9)]))
            .await;

        // The held snapshot still evaluates against the old rules
        let verdict = held.analyze("text").await.unwrap();
        assert_eq!(verdict, ModerationVerdict::Violation(rule("Old", 0.5)));

        let current = service.snapshot().await;
        assert!(current.rules.get("New").is_some());
        assert!(current.rules.get("Old").is_none());
    }
}
