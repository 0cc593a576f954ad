//! The installed rule set, swapped atomically after each learning pass.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::rule::Rule;

/// Shared registry of the currently installed rules.
///
/// Learning passes compute the full replacement set before touching the
/// registry, so a failed pass leaves the last consistent set in place.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: RwLock<Vec<Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Rule>> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Rule>> {
        self.rules.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a freshly compiled rule set, discarding the previous one.
    pub fn replace_all(&self, rules: Vec<Rule>) {
        let count = rules.len();
        *self.write() = rules;
        tracing::info!(rules = count, "installed new rule set");
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Mean body length across installed rules; `None` when the set is empty.
    pub fn average_body_len(&self) -> Option<f64> {
        let rules = self.read();
        if rules.is_empty() {
            return None;
        }
        let total: usize = rules.iter().map(Rule::body_len).sum();
        Some(total as f64 / rules.len() as f64)
    }

    /// A point-in-time copy of the installed rules, in registration order.
    pub fn snapshot(&self) -> Vec<Rule> {
        self.read().clone()
    }

    /// The rule set in its reasoner text form, one rule per line.
    pub fn to_text(&self) -> String {
        let rules = self.read();
        let mut out = String::new();
        for rule in rules.iter() {
            out.push_str(&rule.canonical());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Atom, Feature, Value};

    fn rule(mood: &str, head: &str) -> Rule {
        Rule::new(
            vec![
                Atom::Situation,
                Atom::fact(Feature::HadMood, Value::Symbol(mood.into())),
            ],
            head,
        )
    }

    #[test]
    fn replace_all_swaps_the_whole_set() {
        let registry = RuleRegistry::new();
        assert!(registry.is_empty());
        registry.replace_all(vec![rule("Sad", "Telling_a_joke")]);
        assert_eq!(registry.len(), 1);
        registry.replace_all(vec![rule("Happy", "Hand_wave"), rule("Tired", "Rock_music")]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.snapshot()[0].head, "Hand_wave");
    }

    #[test]
    fn average_body_len_is_none_when_empty() {
        let registry = RuleRegistry::new();
        assert_eq!(registry.average_body_len(), None);
        registry.replace_all(vec![rule("Sad", "Telling_a_joke")]);
        assert_eq!(registry.average_body_len(), Some(2.0));
    }

    #[test]
    fn text_form_has_one_rule_per_line() {
        let registry = RuleRegistry::new();
        registry.replace_all(vec![rule("Sad", "Telling_a_joke"), rule("Happy", "Hand_wave")]);
        let text = registry.to_text();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("Situation(?s), hadMood(?s, Sad)"));
    }
}
