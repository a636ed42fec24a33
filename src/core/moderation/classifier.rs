// Classifier port - the contract between the gate and whatever scores text.
//
// The HTTP implementation lives in `infra/ai`. This file owns the parts every
// implementation shares: the error type, the system instruction that tells
// the model which labels to score, and the validated decode of the
// name -> probability payload the model returns.

use super::moderation_models::{ClassificationResult, RuleSet};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Any failure to obtain a classification. Callers handle every variant the
/// same way (through the gate's fail policy); the variants only make logs useful.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier request failed: {0}")]
    Transport(String),

    #[error("Classifier returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed classifier response: {0}")]
    Envelope(String),

    #[error("Malformed classification payload: {0}")]
    Payload(String),

    #[error("Classifier is not configured")]
    Unconfigured,

    #[error("Classification task aborted: {0}")]
    Aborted(String),
}

// ============================================================================
// PORT
// ============================================================================

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Score `sample` against every rule in `rules`.
    ///
    /// Exactly one upstream request per call; no retries.
    async fn classify(
        &self,
        sample: &str,
        rules: &RuleSet,
    ) -> Result<ClassificationResult, ClassifierError>;
}

/// Installed when no credential is available. Always fails, so the gate's
/// fail policy decides what happens to content until a reload succeeds.
pub struct UnconfiguredClassifier;

#[async_trait]
impl Classifier for UnconfiguredClassifier {
    async fn classify(
        &self,
        _sample: &str,
        _rules: &RuleSet,
    ) -> Result<ClassificationResult, ClassifierError> {
        Err(ClassifierError::Unconfigured)
    }
}

// ============================================================================
// PROMPT AND PAYLOAD
// ============================================================================

const SYSTEM_PREAMBLE: &str = "You are a content moderation system. \
Respond only with a JSON object of the form {\"RuleName\": probability}, \
where probability is a number between 0 and 1, for these rules:\n";

/// System instruction: the required output shape followed by one
/// `- <name>: <description>` line per rule, in rule order.
pub fn system_instruction(rules: &RuleSet) -> String {
    let mut prompt = String::from(SYSTEM_PREAMBLE);
    for rule in rules.iter() {
        prompt.push_str("- ");
        prompt.push_str(&rule.name);
        prompt.push_str(": ");
        prompt.push_str(&rule.description);
        prompt.push('\n');
    }
    prompt
}

/// Decode the model's message content into a validated classification.
///
/// The content is its own JSON document, independent of the response
/// envelope. Every value must be a finite number in 0.0..=1.0.
pub fn decode_classification(content: &str) -> Result<ClassificationResult, ClassifierError> {
    let body = strip_code_fence(content);
    if body.is_empty() {
        return Err(ClassifierError::Payload("empty content".to_string()));
    }

    let scores: HashMap<String, f64> =
        serde_json::from_str(body).map_err(|e| ClassifierError::Payload(e.to_string()))?;

    for (name, probability) in &scores {
        if !probability.is_finite() || !(0.0..=1.0).contains(probability) {
            return Err(ClassifierError::Payload(format!(
                "probability for {} out of range: {}",
                name, probability
            )));
        }
    }

    Ok(ClassificationResult::from_validated(scores))
}

/// Chat models like to wrap JSON in a Markdown fence even when told not to.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the optional language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };

    rest.strip_suffix("```").unwrap_or(rest).trim()
}
