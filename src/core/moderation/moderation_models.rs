// Moderation domain models - rules, classifier output and verdicts.
//
// These are pure domain types with no HTTP or game-server dependencies.
// The infra layer builds them from configuration, the server layer reads
// them back when it applies a verdict.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Placeholder replaced by the rule name in messages and commands.
pub const RULE_PLACEHOLDER: &str = "%rule%";
/// Placeholder replaced by the actor's name in commands.
pub const PLAYER_PLACEHOLDER: &str = "%player%";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("Rule name must not be empty")]
    EmptyName,

    #[error("Duplicate rule name: {0}")]
    DuplicateName(String),

    #[error("Rule {name} has invalid threshold {threshold} (expected 0.0..=1.0)")]
    InvalidThreshold { name: String, threshold: f64 },

    #[error("Rule {0} uses the command action but has no command")]
    MissingCommand(String),
}

// ============================================================================
// RULES
// ============================================================================

/// What happens to the actor when a rule triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleAction {
    Kick,
    Ban,
    Warn,
    Command,
    /// Kept verbatim so the dispatcher can report the bad value to the actor.
    Unrecognized(String),
}

impl RuleAction {
    /// Parse a configured action name. Matching is case-insensitive.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "kick" => RuleAction::Kick,
            "ban" => RuleAction::Ban,
            "warn" => RuleAction::Warn,
            "command" => RuleAction::Command,
            _ => RuleAction::Unrecognized(raw.to_string()),
        }
    }
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleAction::Kick => write!(f, "kick"),
            RuleAction::Ban => write!(f, "ban"),
            RuleAction::Warn => write!(f, "warn"),
            RuleAction::Command => write!(f, "command"),
            RuleAction::Unrecognized(raw) => write!(f, "{}", raw),
        }
    }
}

/// A named moderation policy with a probability threshold and a consequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Unique key, also the label the classifier is asked to score
    pub name: String,
    /// Shown to the classifier as the rule's meaning
    pub description: String,
    /// Violation if the classifier's probability is >= this value
    pub threshold: f64,
    pub action: RuleAction,
    /// Template with `%rule%`
    pub action_message: String,
    /// Template with `%player%` and `%rule%`, only used by `RuleAction::Command`
    pub command: String,
}

impl Rule {
    /// Check the per-rule invariants. Uniqueness is checked by `RuleSet::new`.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.name.trim().is_empty() {
            return Err(RuleError::EmptyName);
        }

        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(RuleError::InvalidThreshold {
                name: self.name.clone(),
                threshold: self.threshold,
            });
        }

        if self.action == RuleAction::Command && self.command.trim().is_empty() {
            return Err(RuleError::MissingCommand(self.name.clone()));
        }

        Ok(())
    }

    /// The action message with `%rule%` substituted.
    pub fn render_message(&self) -> String {
        self.action_message.replace(RULE_PLACEHOLDER, &self.name)
    }

    /// The command template rendered for `player`, or `None` when it is empty.
    pub fn render_command(&self, player: &str) -> Option<String> {
        if self.command.trim().is_empty() {
            return None;
        }

        Some(
            self.command
                .replace(PLAYER_PLACEHOLDER, player)
                .replace(RULE_PLACEHOLDER, &self.name),
        )
    }
}

/// Ordered rules. Position is evaluation priority: earlier rules win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set, rejecting invalid or duplicate rules.
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            rule.validate()?;
            if !seen.insert(rule.name.as_str()) {
                return Err(RuleError::DuplicateName(rule.name.clone()));
            }
        }

        Ok(Self { rules })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ============================================================================
// CLASSIFIER OUTPUT AND VERDICTS
// ============================================================================

/// Rule name -> violation probability, as returned by the classifier.
///
/// Values are validated on construction (see `classifier::decode_classification`),
/// so everything stored here is a finite probability in 0.0..=1.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationResult {
    scores: HashMap<String, f64>,
}

impl ClassificationResult {
    pub(crate) fn from_validated(scores: HashMap<String, f64>) -> Self {
        Self { scores }
    }

    /// Probability for a rule, or `None` when the classifier gave no signal.
    pub fn probability(&self, rule_name: &str) -> Option<f64> {
        self.scores.get(rule_name).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }
}

/// Outcome of evaluating a classification against a rule set.
#[derive(Debug, Clone, PartialEq)]
pub enum ModerationVerdict {
    NoViolation,
    Violation(Rule),
}

// ============================================================================
// ACTORS, CONTENT KINDS AND GATE SETTINGS
// ============================================================================

/// The player whose content is being moderated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Actor {
    pub name: String,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Which host event produced the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Chat,
    Book,
    Sign,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Chat => write!(f, "chat"),
            ContentKind::Book => write!(f, "book"),
            ContentKind::Sign => write!(f, "sign"),
        }
    }
}

/// What the gate does with content when the classifier call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailPolicy {
    /// Let the content through and log the failure
    #[default]
    Open,
    /// Block the content as a violation of the fallback rule
    Closed,
}

impl std::fmt::Display for FailPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailPolicy::Open => write!(f, "fail-open"),
            FailPolicy::Closed => write!(f, "fail-closed"),
        }
    }
}

/// Name given to the rule applied when content cannot be classified.
pub const FALLBACK_RULE_NAME: &str = "Unverified";

/// Per-deployment gate behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct GateSettings {
    pub fail_policy: FailPolicy,
    /// Applied under `FailPolicy::Closed` instead of any configured rule
    pub fallback_rule: Rule,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            fail_policy: FailPolicy::Open,
            fallback_rule: Rule {
                name: FALLBACK_RULE_NAME.to_string(),
                description: String::new(),
                threshold: 1.0,
                action: RuleAction::Warn,
                action_message: "Your content could not be verified and was blocked.".to_string(),
                command: String::new(),
            },
        }
    }
}
