//! Horn-clause rule vocabulary: typed predicate atoms and rules.
//!
//! A [`Rule`] is an ordered body of [`Atom`]s implying a single head atom
//! `takenAction(?s, value)`. The `Display` form is the exact SWRL-style text
//! consumed by the external reasoner, and doubles as the canonical
//! deduplication key: two rules with identical text are the same rule
//! regardless of how they were derived.

use std::fmt;

/// The feature columns of an observation row, as named in the ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    HadUser,
    HasPersonality,
    HasGender,
    HasAge,
    HadMood,
    WasWeather,
    WasTime,
}

impl Feature {
    pub const ALL: [Feature; 7] = [
        Feature::HadUser,
        Feature::HasPersonality,
        Feature::HasGender,
        Feature::HasAge,
        Feature::HadMood,
        Feature::WasWeather,
        Feature::WasTime,
    ];

    /// The predicate name used in rule text and CSV headers.
    pub fn name(self) -> &'static str {
        match self {
            Feature::HadUser => "hadUser",
            Feature::HasPersonality => "hasPersonality",
            Feature::HasGender => "hasGender",
            Feature::HasAge => "hasAge",
            Feature::HadMood => "hadMood",
            Feature::WasWeather => "wasWeather",
            Feature::WasTime => "wasTime",
        }
    }

    /// Parse a predicate name back into a feature.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Whether atoms for this feature constrain the user rather than the
    /// situation, and therefore take `?u` as their subject variable.
    pub fn is_user_scoped(self) -> bool {
        matches!(
            self,
            Feature::HasPersonality | Feature::HasGender | Feature::HasAge
        )
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The predicate name of the rule head / label column.
pub const ACTION_PREDICATE: &str = "takenAction";

/// A typed predicate-argument value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Symbol(String),
    Bool(bool),
    Int(i64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Symbol(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
        }
    }
}

/// One predicate atom of a rule body.
///
/// The fixed class/link atoms (`Situation(?s)`, `User(?u)`, `hadUser(?s, ?u)`,
/// `hasAge(?u, ?a)`) are their own variants since they carry no value and are
/// injected by the compiler exactly once per body prefix. Age thresholds are
/// always strict after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Atom {
    /// `Situation(?s)` — asserts the situation exists; always first in a body.
    Situation,
    /// `User(?u)` — asserts some user entity exists.
    User,
    /// `hadUser(?s, ?u)` — links the situation to that user.
    UserLink,
    /// `hasAge(?u, ?a)` — binds the user's age to `?a` for threshold atoms.
    AgeBinding,
    /// `lessThan(?a, v)` — strict upper age bound.
    LessThan(i64),
    /// `greaterThan(?a, v)` — strict lower age bound.
    GreaterThan(i64),
    /// A feature equality, e.g. `hadMood(?s, Sad)` or `~hasGender(?u, true)`.
    Fact {
        feature: Feature,
        value: Value,
        negated: bool,
    },
}

impl Atom {
    /// Positive feature fact.
    pub fn fact(feature: Feature, value: Value) -> Self {
        Atom::Fact {
            feature,
            value,
            negated: false,
        }
    }

    /// Negated feature fact.
    pub fn negated_fact(feature: Feature, value: Value) -> Self {
        Atom::Fact {
            feature,
            value,
            negated: true,
        }
    }

    /// Whether this atom is a negated fact.
    pub fn is_negated(&self) -> bool {
        matches!(self, Atom::Fact { negated: true, .. })
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Situation => f.write_str("Situation(?s)"),
            Atom::User => f.write_str("User(?u)"),
            Atom::UserLink => f.write_str("hadUser(?s, ?u)"),
            Atom::AgeBinding => f.write_str("hasAge(?u, ?a)"),
            Atom::LessThan(v) => write!(f, "lessThan(?a, {v})"),
            Atom::GreaterThan(v) => write!(f, "greaterThan(?a, {v})"),
            Atom::Fact {
                feature,
                value,
                negated,
            } => {
                let var = if feature.is_user_scoped() { "?u" } else { "?s" };
                let tilde = if *negated { "~" } else { "" };
                write!(f, "{tilde}{feature}({var}, {value})")
            }
        }
    }
}

/// A compiled Horn-clause rule: ordered body atoms implying a head action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub body: Vec<Atom>,
    /// The concluded action label of the head atom.
    pub head: String,
}

impl Rule {
    pub fn new(body: Vec<Atom>, head: impl Into<String>) -> Self {
        Self {
            body,
            head: head.into(),
        }
    }

    /// Number of body atoms, used for the average-body-length statistic.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// The canonical text form, used as the deduplication key.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, atom) in self.body.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{atom}")?;
        }
        write!(f, " -> {}(?s, {})", ACTION_PREDICATE, self.head)
    }
}

/// Drop repeated atoms from a body, preserving first-seen order.
///
/// A feature can legitimately be asserted twice after prefix injection and
/// negation grounding collapse to the same concrete atom.
pub fn dedup_atoms(atoms: Vec<Atom>) -> Vec<Atom> {
    let mut seen: Vec<Atom> = Vec::with_capacity(atoms.len());
    for atom in atoms {
        if !seen.contains(&atom) {
            seen.push(atom);
        }
    }
    seen
}
