use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::core::moderation::{
    ConfigError, FailPolicy, GateSettings, Rule, RuleAction, RuleSet, FALLBACK_RULE_NAME,
};

fn default_action() -> String {
    "kick".to_string()
}

fn default_action_message() -> String {
    "Rule violation: %rule%".to_string()
}

/// On-disk moderation config. Rule order is evaluation priority.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModerationFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub fail_policy: FailPolicy,
    #[serde(default)]
    pub fallback: FallbackEntry,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub threshold: f64,
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default = "default_action_message")]
    pub action_message: String,
    #[serde(default)]
    pub command: String,
}

/// Consequence applied under the closed fail policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackEntry {
    #[serde(default = "FallbackEntry::default_action")]
    pub action: String,
    #[serde(default = "FallbackEntry::default_message")]
    pub action_message: String,
    #[serde(default)]
    pub command: String,
}

impl FallbackEntry {
    fn default_action() -> String {
        GateSettings::default().fallback_rule.action.to_string()
    }

    fn default_message() -> String {
        GateSettings::default().fallback_rule.action_message
    }
}

impl Default for FallbackEntry {
    fn default() -> Self {
        Self {
            action: Self::default_action(),
            action_message: Self::default_message(),
            command: String::new(),
        }
    }
}

impl RuleEntry {
    fn to_rule(&self) -> Rule {
        let action = RuleAction::parse(&self.action);
        if let RuleAction::Unrecognized(raw) = &action {
            tracing::warn!(
                rule = %self.name,
                action = %raw,
                "Unknown moderation action, the rule will only report a config error"
            );
        }

        Rule {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            threshold: self.threshold,
            action,
            action_message: self.action_message.clone(),
            command: self.command.clone(),
        }
    }
}

impl ModerationFile {
    /// What a fresh install starts with: one example rule, fail-open.
    pub fn example() -> Self {
        Self {
            api_key: None,
            fail_policy: FailPolicy::Open,
            fallback: FallbackEntry::default(),
            rules: vec![RuleEntry {
                name: "Toxicity".to_string(),
                description: "Insults, harassment, hate speech or threats aimed at other players"
                    .to_string(),
                threshold: 0.8,
                action: "warn".to_string(),
                action_message: default_action_message(),
                command: String::new(),
            }],
        }
    }

    pub async fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub async fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let text = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, text)
            .await
            .map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Build the ordered, validated rule set.
    pub fn rule_set(&self) -> Result<RuleSet, ConfigError> {
        let rules = self.rules.iter().map(RuleEntry::to_rule).collect();
        Ok(RuleSet::new(rules)?)
    }

    pub fn gate_settings(&self) -> Result<GateSettings, ConfigError> {
        let fallback_rule = Rule {
            name: FALLBACK_RULE_NAME.to_string(),
            description: String::new(),
            threshold: 1.0,
            action: RuleAction::parse(&self.fallback.action),
            action_message: self.fallback.action_message.clone(),
            command: self.fallback.command.clone(),
        };
        fallback_rule.validate()?;

        Ok(GateSettings {
            fail_policy: self.fail_policy,
            fallback_rule,
        })
    }

    /// The file's credential, if it holds a non-blank one.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
