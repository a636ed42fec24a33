// Rule evaluation - turns classifier probabilities into a single verdict.
//
// Rules are checked in configuration order and the first one whose
// probability reaches its threshold wins. There is no scoring across rules,
// so the order of the rule list is part of the policy.

use super::moderation_models::{ClassificationResult, ModerationVerdict, RuleSet};

/// Select at most one triggered rule.
///
/// A rule triggers when the classifier returned a probability for it and that
/// probability is `>=` the rule's threshold. Rules the classifier did not
/// score never trigger.
pub fn evaluate(result: &ClassificationResult, rules: &RuleSet) -> ModerationVerdict {
    for rule in rules.iter() {
        let Some(probability) = result.probability(&rule.name) else {
            continue;
        };

        tracing::debug!(
            rule = %rule.name,
            probability,
            threshold = rule.threshold,
            "Rule scored"
        );

        if probability >= rule.threshold {
            return ModerationVerdict::Violation(rule.clone());
        }
    }

    ModerationVerdict::NoViolation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::moderation_models::{Rule, RuleAction};
    use std::collections::HashMap;

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

    fn scores(pairs: &[(&str, f64)]) -> ClassificationResult {
        let map: HashMap<String, f64> = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        ClassificationResult::from_validated(map)
    }

    fn triggered(verdict: &ModerationVerdict) -> Option<&str> {
        match verdict {
            ModerationVerdict::Violation(rule) => Some(rule.name.as_str()),
            ModerationVerdict::NoViolation => None,
        }
    }

    #[test]
    fn test_above_threshold_is_violation() {
        let rules = RuleSet::new(vec![rule("Toxicity", 0.8)]).unwrap();
        let verdict = evaluate(&scores(&[("Toxicity", 0.95)]), &rules);
        assert_eq!(triggered(&verdict), Some("Toxicity"));
    }

    #[test]
    fn test_below_threshold_is_no_violation() {
        let rules = RuleSet::new(vec![rule("Toxicity", 0.8)]).unwrap();
        let verdict = evaluate(&scores(&[("Toxicity", 0.3)]), &rules);
        assert_eq!(verdict, ModerationVerdict::NoViolation);
    }

    #[test]
    fn test_threshold_boundary_counts_as_violation() {
        let rules = RuleSet::new(vec![rule("Toxicity", 0.8)]).unwrap();
        let verdict = evaluate(&scores(&[("Toxicity", 0.8)]), &rules);
        assert_eq!(triggered(&verdict), Some("Toxicity"));
    }

    #[test]
    fn test_first_rule_in_order_wins() {
        let rules = RuleSet::new(vec![rule("A", 0.5), rule("B", 0.5)]).unwrap();
        let verdict = evaluate(&scores(&[("A", 0.6), ("B", 0.9)]), &rules);
        assert_eq!(triggered(&verdict), Some("A"));

        // Same scores, reversed priority
        let reversed = RuleSet::new(vec![rule("B", 0.5), rule("A", 0.5)]).unwrap();
        let verdict = evaluate(&scores(&[("A", 0.6), ("B", 0.9)]), &reversed);
        assert_eq!(triggered(&verdict), Some("B"));
    }

    #[test]
    fn test_later_rule_triggers_when_earlier_does_not() {
        let rules = RuleSet::new(vec![rule("A", 0.9), rule("B", 0.5)]).unwrap();
        let verdict = evaluate(&scores(&[("A", 0.6), ("B", 0.6)]), &rules);
        assert_eq!(triggered(&verdict), Some("B"));
    }

    #[test]
    fn test_missing_key_never_triggers() {
        // Threshold 0.0 would trigger on any score, but there is no score at all
        let rules = RuleSet::new(vec![rule("A", 0.0), rule("B", 0.7)]).unwrap();
        let verdict = evaluate(&scores(&[("B", 0.2)]), &rules);
        assert_eq!(verdict, ModerationVerdict::NoViolation);

        let verdict = evaluate(&scores(&[]), &rules);
        assert_eq!(verdict, ModerationVerdict::NoViolation);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let rules = RuleSet::new(vec![rule("A", 0.5)]).unwrap();
        let verdict = evaluate(&scores(&[("Other", 1.0), ("A", 0.1)]), &rules);
        assert_eq!(verdict, ModerationVerdict::NoViolation);
    }

    #[test]
    fn test_empty_rule_set_is_no_violation() {
        let verdict = evaluate(&scores(&[("A", 1.0)]), &RuleSet::default());
        assert_eq!(verdict, ModerationVerdict::NoViolation);
    }

    #[test]
    fn test_verdict_carries_full_rule() {
        let mut r = rule("Spam", 0.4);
        r.action = RuleAction::Kick;
        let rules = RuleSet::new(vec![r.clone()]).unwrap();

        let verdict = evaluate(&scores(&[("Spam", 0.4)]), &rules);
        assert_eq!(verdict, ModerationVerdict::Violation(r));
    }
}
