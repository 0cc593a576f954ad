//! Typed view over the historical observation records.
//!
//! The knowledge store flattens past situations into [`ObservationRow`]s; the
//! compiler and the negation resolver only ever see this tabular view. Action
//! synonyms declared at the ontology level are collapsed to one canonical
//! label by [`SynonymMap`] before any training pass.

use std::collections::HashMap;

use crate::rule::{Feature, Value};

/// Two-valued gender domain with the bijective bool mapping used by the rule
/// vocabulary: male ↔ false, female ↔ true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_bool(self) -> bool {
        matches!(self, Gender::Female)
    }

    pub fn from_bool(b: bool) -> Self {
        if b { Gender::Female } else { Gender::Male }
    }

    /// The textual label used by history rows.
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }

    /// The other label of the two-valued domain.
    pub fn flipped(self) -> Self {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }
}

/// One finalized historical observation: situational context, the user's
/// attributes at the time, and exactly one resolved action label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationRow {
    pub id: String,
    pub user: String,
    pub personality: String,
    pub gender: Gender,
    pub age: i64,
    pub mood: String,
    pub weather: String,
    pub time: String,
    pub action: String,
}

impl ObservationRow {
    /// The row's value for a feature, in rule space (gender is a bool there).
    pub fn feature(&self, feature: Feature) -> Value {
        match feature {
            Feature::HadUser => Value::Symbol(self.user.clone()),
            Feature::HasPersonality => Value::Symbol(self.personality.clone()),
            Feature::HasGender => Value::Bool(self.gender.as_bool()),
            Feature::HasAge => Value::Int(self.age),
            Feature::HadMood => Value::Symbol(self.mood.clone()),
            Feature::WasWeather => Value::Symbol(self.weather.clone()),
            Feature::WasTime => Value::Symbol(self.time.clone()),
        }
    }

    /// Identity of the row's feature values, ignoring the id column. Used to
    /// drop duplicate rows during negation grounding.
    pub fn value_key(&self) -> (String, String, Gender, i64, String, String, String, String) {
        (
            self.user.clone(),
            self.personality.clone(),
            self.gender,
            self.age,
            self.mood.clone(),
            self.weather.clone(),
            self.time.clone(),
            self.action.clone(),
        )
    }
}

/// The attributes of one known user, derived from their past observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub personality: String,
    pub gender: Gender,
    pub age: i64,
}

/// A new, not-yet-classified situation: who and under which circumstances.
/// User attributes are resolved from the store's profiles when needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Situation {
    pub user: String,
    pub mood: String,
    pub weather: String,
    pub time: String,
}

impl std::fmt::Display for Situation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "User - {}, Mood - {}, Weather - {}, Time - {}",
            self.user, self.mood, self.weather, self.time
        )
    }
}

/// Read-only tabular view over historical observations.
#[derive(Debug, Clone, Default)]
pub struct HistoryView {
    rows: Vec<ObservationRow>,
}

impl HistoryView {
    pub fn new(rows: Vec<ObservationRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ObservationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose resolved action equals `action`.
    pub fn rows_for_action<'a>(
        &'a self,
        action: &'a str,
    ) -> impl Iterator<Item = &'a ObservationRow> + 'a {
        self.rows.iter().filter(move |r| r.action == action)
    }
}

/// Action-label equivalences, collapsed to one canonical label per group.
///
/// Built once from the ontology's equivalence declarations before training;
/// the first label of a group becomes the canonical one, mirroring how the
/// equivalence sets are walked.
#[derive(Debug, Clone, Default)]
pub struct SynonymMap {
    canonical: HashMap<String, String>,
}

impl SynonymMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from equivalence groups. A label already covered by an earlier
    /// group keeps its first canonical assignment.
    pub fn from_groups<I, G, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::new();
        for group in groups {
            let labels: Vec<String> = group.into_iter().map(Into::into).collect();
            if labels.iter().any(|l| map.canonical.contains_key(l)) {
                continue;
            }
            let Some(canon) = labels.first().cloned() else {
                continue;
            };
            for label in labels {
                map.canonical.insert(label, canon.clone());
            }
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// The canonical label for `label` (itself when no synonym is declared).
    pub fn canonical<'a>(&'a self, label: &'a str) -> &'a str {
        self.canonical.get(label).map(String::as_str).unwrap_or(label)
    }

    /// Collapse action labels in place across a set of rows.
    pub fn canonicalize_rows(&self, rows: &mut [ObservationRow]) {
        if self.canonical.is_empty() {
            return;
        }
        for row in rows {
            if let Some(canon) = self.canonical.get(&row.action) {
                if *canon != row.action {
                    row.action = canon.clone();
                }
            }
        }
    }
}
