//! Dataset-grounded negation elimination.
//!
//! The reasoner downstream has no closed-world negation, so a body carrying
//! `~feature(x, v)` atoms cannot be installed as-is. Instead each negated atom
//! is replaced by a concrete value taken from a historical row that (a) was
//! resolved to the rule's head action, (b) satisfies every positive constraint
//! of the body, and (c) avoids every negated value. One grounded body variant
//! is produced per distinct supporting row; a body no row supports produces
//! nothing, and the caller drops the leaf.

use std::collections::{HashMap, HashSet};

use crate::history::{HistoryView, ObservationRow};
use crate::rule::{dedup_atoms, Atom, Feature, Value};

/// Ground the negated atoms of `body` against the observation history.
///
/// Lazy: rows are filtered and substituted on demand, so an early-exiting
/// caller pays only for the variants it consumes.
pub fn ground<'a>(
    body: &'a [Atom],
    head: &'a str,
    history: &'a HistoryView,
) -> impl Iterator<Item = Vec<Atom>> + 'a {
    let constraints = BodyConstraints::collect(body);
    let mut seen = HashSet::new();

    history
        .rows_for_action(head)
        .filter(move |row| constraints.admits(row))
        .filter(move |row| seen.insert(row.value_key()))
        .map(move |row| {
            let substituted = body
                .iter()
                .map(|atom| match atom {
                    Atom::Fact {
                        feature,
                        negated: true,
                        ..
                    } => Atom::fact(*feature, row.feature(*feature)),
                    other => other.clone(),
                })
                .collect();
            dedup_atoms(substituted)
        })
}

/// The row filter induced by a body: per-feature admitted and banned values
/// plus the tightest age window.
struct BodyConstraints {
    /// Positive equalities; several values for one feature mean "any of".
    admitted: HashMap<Feature, Vec<Value>>,
    banned: HashMap<Feature, Vec<Value>>,
    /// Strict upper age bound (the smallest wins).
    below: Option<i64>,
    /// Strict lower age bound (the largest wins).
    above: Option<i64>,
}

impl BodyConstraints {
    fn collect(body: &[Atom]) -> Self {
        let mut admitted: HashMap<Feature, Vec<Value>> = HashMap::new();
        let mut banned: HashMap<Feature, Vec<Value>> = HashMap::new();
        let mut below: Option<i64> = None;
        let mut above: Option<i64> = None;

        for atom in body {
            match atom {
                Atom::Fact {
                    feature,
                    value,
                    negated,
                } => {
                    let side = if *negated { &mut banned } else { &mut admitted };
                    side.entry(*feature).or_default().push(value.clone());
                }
                Atom::LessThan(v) => below = Some(below.map_or(*v, |cur| cur.min(*v))),
                Atom::GreaterThan(v) => above = Some(above.map_or(*v, |cur| cur.max(*v))),
                Atom::Situation | Atom::User | Atom::UserLink | Atom::AgeBinding => {}
            }
        }

        Self {
            admitted,
            banned,
            below,
            above,
        }
    }

    fn admits(&self, row: &ObservationRow) -> bool {
        self.admitted
            .iter()
            .all(|(feature, values)| values.contains(&row.feature(*feature)))
            && self.below.is_none_or(|v| row.age < v)
            && self.above.is_none_or(|v| row.age > v)
            && self
                .banned
                .iter()
                .all(|(feature, values)| !values.contains(&row.feature(*feature)))
    }
}
