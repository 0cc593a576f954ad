//! Reasoner seam: assigning candidate actions to a situation.
//!
//! Production deployments plug in an external reasoner here; the built-in
//! [`RuleMatchReasoner`] evaluates the installed rule bodies directly against
//! the situation's facts and the user's profile.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SessionResult;
use crate::history::{Situation, UserProfile};
use crate::registry::RuleRegistry;
use crate::rule::{Atom, Feature, Value};

/// Assigns zero or more candidate actions to a situation.
pub trait Reasoner {
    fn assign_actions(&mut self, situation: &Situation) -> SessionResult<Vec<String>>;
}

/// Direct rule matcher over the shared registry.
///
/// A rule fires when every body atom holds for the situation and the user's
/// profile. An unknown user cannot satisfy user-scoped atoms, so rules
/// touching them simply do not fire.
pub struct RuleMatchReasoner {
    registry: Arc<RuleRegistry>,
    profiles: HashMap<String, UserProfile>,
}

impl RuleMatchReasoner {
    pub fn new(registry: Arc<RuleRegistry>, profiles: HashMap<String, UserProfile>) -> Self {
        Self { registry, profiles }
    }

    /// Refresh the user profiles, e.g. after the history grew.
    pub fn set_profiles(&mut self, profiles: HashMap<String, UserProfile>) {
        self.profiles = profiles;
    }

    fn feature_value(&self, situation: &Situation, feature: Feature) -> Option<Value> {
        let profile = || self.profiles.get(&situation.user);
        match feature {
            Feature::HadUser => Some(Value::Symbol(situation.user.clone())),
            Feature::HadMood => Some(Value::Symbol(situation.mood.clone())),
            Feature::WasWeather => Some(Value::Symbol(situation.weather.clone())),
            Feature::WasTime => Some(Value::Symbol(situation.time.clone())),
            Feature::HasPersonality => {
                profile().map(|p| Value::Symbol(p.personality.clone()))
            }
            Feature::HasGender => profile().map(|p| Value::Bool(p.gender.as_bool())),
            Feature::HasAge => profile().map(|p| Value::Int(p.age)),
        }
    }

    fn atom_holds(&self, situation: &Situation, atom: &Atom) -> bool {
        match atom {
            Atom::Situation | Atom::User | Atom::UserLink | Atom::AgeBinding => true,
            Atom::LessThan(v) => self
                .profiles
                .get(&situation.user)
                .is_some_and(|p| p.age < *v),
            Atom::GreaterThan(v) => self
                .profiles
                .get(&situation.user)
                .is_some_and(|p| p.age > *v),
            Atom::Fact {
                feature,
                value,
                negated,
            } => match self.feature_value(situation, *feature) {
                Some(actual) => (actual == *value) != *negated,
                None => false,
            },
        }
    }
}

impl Reasoner for RuleMatchReasoner {
    fn assign_actions(&mut self, situation: &Situation) -> SessionResult<Vec<String>> {
        let mut actions = Vec::new();
        for rule in self.registry.snapshot() {
            if rule.body.iter().all(|atom| self.atom_holds(situation, atom))
                && !actions.contains(&rule.head)
            {
                actions.push(rule.head);
            }
        }
        tracing::debug!(candidates = actions.len(), "reasoner pass finished");
        Ok(actions)
    }
}
