//! Tree-to-rule compiler: pre-order path records into Horn-clause rules.
//!
//! The compiler walks the normalized [`PathRecord`] sequence with a
//! depth-indexed body stack. A branch at depth `d` first discards every group
//! deeper than `d` (the tree backtracked), then pushes the atoms for its
//! condition; a leaf snapshots the flattened stack as a rule body and emits
//! one rule per grounding of that body. Structural class and link atoms
//! (`User(?u)`, `hadUser(?s, ?u)`, `hasAge(?u, ?a)`) are injected at most once
//! per body prefix, exactly where the first atom needing them appears.
//!
//! Bodies containing negated facts never leave the compiler: each one is
//! replaced by the set of concrete variants the observation history supports,
//! via [`crate::negation::ground`].

use std::collections::HashSet;

use crate::error::CompileError;
use crate::history::{Gender, HistoryView};
use crate::negation::ground;
use crate::paths::{AgeOp, Check, PathRecord, Step};
use crate::rule::{dedup_atoms, Atom, Feature, Rule, Value};

/// Compiles path records into deduplicated rules, grounding negations against
/// a borrowed history view.
pub struct RuleCompiler<'a> {
    history: &'a HistoryView,
}

impl<'a> RuleCompiler<'a> {
    pub fn new(history: &'a HistoryView) -> Self {
        Self { history }
    }

    /// Compile one pre-order path export into rules, in registration order.
    pub fn compile(&self, records: &[PathRecord]) -> Result<Vec<Rule>, CompileError> {
        // Depth 0 holds the seed atom shared by every body.
        let mut stack: Vec<Vec<Atom>> = vec![vec![Atom::Situation]];
        let mut rules: Vec<Rule> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for record in records {
            match &record.step {
                Step::Branch { feature, check } => {
                    if record.level < stack.len() {
                        stack.truncate(record.level);
                    }
                    if record.level != stack.len() {
                        return Err(CompileError::DepthGap {
                            level: record.level,
                            stack_depth: stack.len(),
                        });
                    }
                    let group = branch_atoms(*feature, check, &stack)?;
                    stack.push(group);
                }
                Step::Leaf { action } => {
                    if action.is_empty() {
                        return Err(CompileError::EmptyLeaf);
                    }
                    let body: Vec<Atom> = stack.iter().flatten().cloned().collect();
                    if body.iter().any(Atom::is_negated) {
                        let mut grounded = false;
                        for variant in ground(&body, action, self.history) {
                            grounded = true;
                            register(variant, action, &mut rules, &mut seen);
                        }
                        if !grounded {
                            tracing::debug!(
                                action,
                                "no historical evidence grounds the negated body; leaf dropped"
                            );
                        }
                    } else {
                        register(body, action, &mut rules, &mut seen);
                    }
                }
            }
        }

        Ok(rules)
    }
}

/// The atom group one branch contributes, with structural atoms injected when
/// the current stack prefix does not already carry them.
fn branch_atoms(
    feature: Feature,
    check: &Check,
    stack: &[Vec<Atom>],
) -> Result<Vec<Atom>, CompileError> {
    let present = |atom: &Atom| stack.iter().flatten().any(|a| a == atom);
    let mut group = Vec::new();

    match check {
        Check::Age { op, threshold } => {
            if !present(&Atom::UserLink) {
                group.push(Atom::User);
                group.push(Atom::UserLink);
            }
            if !present(&Atom::AgeBinding) {
                group.push(Atom::AgeBinding);
            }
            group.push(normalize_age(*op, *threshold));
        }
        Check::Equal { value, negated } => {
            if feature.is_user_scoped() && !present(&Atom::UserLink) {
                group.push(Atom::User);
                group.push(Atom::UserLink);
            }
            let value = if feature == Feature::HasGender {
                let gender =
                    Gender::parse(value).ok_or_else(|| CompileError::InvalidValue {
                        feature: feature.name().into(),
                        value: value.clone(),
                    })?;
                Value::Bool(gender.as_bool())
            } else {
                Value::Symbol(value.clone())
            };
            group.push(if *negated {
                Atom::negated_fact(feature, value)
            } else {
                Atom::fact(feature, value)
            });
        }
    }

    Ok(group)
}

/// Rewrite inclusive age bounds as strict ones over the integer age domain.
fn normalize_age(op: AgeOp, threshold: i64) -> Atom {
    match op {
        AgeOp::Le => Atom::LessThan(threshold + 1),
        AgeOp::Lt => Atom::LessThan(threshold),
        AgeOp::Gt => Atom::GreaterThan(threshold),
        AgeOp::Ge => Atom::GreaterThan(threshold - 1),
    }
}

/// Finalize one grounded body and register the rule unless an identical rule
/// already exists.
fn register(body: Vec<Atom>, action: &str, rules: &mut Vec<Rule>, seen: &mut HashSet<String>) {
    let body = simplify_specific_user(body);
    let rule = Rule::new(dedup_atoms(body), action);
    let key = rule.canonical();
    if seen.insert(key) {
        rules.push(rule);
    }
}

/// When a body pins the situation to one concrete user, the generic user
/// variable and every attribute constraint on it are redundant: the concrete
/// user's attributes are fixed by the history.
fn simplify_specific_user(mut body: Vec<Atom>) -> Vec<Atom> {
    let generic = body.contains(&Atom::UserLink);
    let concrete = body.iter().any(|a| {
        matches!(
            a,
            Atom::Fact {
                feature: Feature::HadUser,
                negated: false,
                ..
            }
        )
    });
    if generic && concrete {
        body.retain(|a| {
            !matches!(
                a,
                Atom::User
                    | Atom::UserLink
                    | Atom::AgeBinding
                    | Atom::LessThan(_)
                    | Atom::GreaterThan(_)
                    | Atom::Fact {
                        feature: Feature::HasPersonality | Feature::HasGender,
                        ..
                    }
            )
        });
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_rows;
    use crate::paths::parse_tree_text;

    fn history() -> HistoryView {
        HistoryView::new(test_rows::sample())
    }

    fn positive(value: &str) -> Check {
        Check::Equal {
            value: value.into(),
            negated: false,
        }
    }

    #[test]
    fn positive_path_becomes_one_rule() {
        let records = vec![
            PathRecord::branch(1, Feature::HadMood, positive("Sad")),
            PathRecord::leaf(2, "User_comforting"),
        ];
        let history = history();
        let rules = RuleCompiler::new(&history).compile(&records).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].canonical(),
            "Situation(?s), hadMood(?s, Sad) -> takenAction(?s, User_comforting)"
        );
    }

    #[test]
    fn age_bounds_are_normalized_to_strict() {
        let records = vec![
            PathRecord::branch(
                1,
                Feature::HasAge,
                Check::Age {
                    op: AgeOp::Le,
                    threshold: 16,
                },
            ),
            PathRecord::leaf(2, "Rock_music"),
            PathRecord::branch(
                1,
                Feature::HasAge,
                Check::Age {
                    op: AgeOp::Gt,
                    threshold: 24,
                },
            ),
            PathRecord::leaf(2, "Hand_wave"),
        ];
        let history = history();
        let rules = RuleCompiler::new(&history).compile(&records).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules[0].canonical(),
            "Situation(?s), User(?u), hadUser(?s, ?u), hasAge(?u, ?a), lessThan(?a, 17) \
             -> takenAction(?s, Rock_music)"
        );
        assert_eq!(
            rules[1].canonical(),
            "Situation(?s), User(?u), hadUser(?s, ?u), hasAge(?u, ?a), greaterThan(?a, 24) \
             -> takenAction(?s, Hand_wave)"
        );
    }

    #[test]
    fn structural_atoms_injected_once_per_prefix() {
        let records = vec![
            PathRecord::branch(
                1,
                Feature::HasPersonality,
                positive("choleric"),
            ),
            PathRecord::branch(
                2,
                Feature::HasAge,
                Check::Age {
                    op: AgeOp::Gt,
                    threshold: 30,
                },
            ),
            PathRecord::leaf(3, "Telling_a_joke"),
        ];
        let history = history();
        let rules = RuleCompiler::new(&history).compile(&records).unwrap();
        let text = rules[0].canonical();
        assert_eq!(text.matches("User(?u)").count(), 1);
        assert_eq!(text.matches("hadUser(?s, ?u)").count(), 1);
        assert_eq!(text.matches("hasAge(?u, ?a)").count(), 1);
    }

    #[test]
    fn backtracking_truncates_the_body() {
        let tree = "\
|--- hadMood_Sad >  0.50
|   |--- wasTime_Night >  0.50
|   |   |--- class: Melancholic_music
|   |--- wasTime_Night <= 0.50
|   |   |--- class: Telling_a_joke
|--- hadMood_Sad <= 0.50
|   |--- class: Hand_wave
";
        let history = history();
        let rules = RuleCompiler::new(&history)
            .compile(&parse_tree_text(tree).unwrap())
            .unwrap();
        assert_eq!(rules.len(), 4);
        assert_eq!(
            rules[0].canonical(),
            "Situation(?s), hadMood(?s, Sad), wasTime(?s, Night) \
             -> takenAction(?s, Melancholic_music)"
        );
        // Second leaf backtracked past the night atom; its negated sibling
        // grounds to the two joke rows (Morning and Evening).
        assert_eq!(
            rules[1].canonical(),
            "Situation(?s), hadMood(?s, Sad), wasTime(?s, Morning) \
             -> takenAction(?s, Telling_a_joke)"
        );
        assert_eq!(
            rules[2].canonical(),
            "Situation(?s), hadMood(?s, Sad), wasTime(?s, Evening) \
             -> takenAction(?s, Telling_a_joke)"
        );
        // The depth-1 backtrack drops the mood atom entirely.
        assert_eq!(
            rules[3].canonical(),
            "Situation(?s), hadMood(?s, Happy) -> takenAction(?s, Hand_wave)"
        );
    }

    #[test]
    fn gender_values_map_to_bools() {
        let records = vec![
            PathRecord::branch(1, Feature::HasGender, positive("male")),
            PathRecord::leaf(2, "Hand_wave"),
        ];
        let history = history();
        let rules = RuleCompiler::new(&history).compile(&records).unwrap();
        assert!(rules[0].canonical().contains("hasGender(?u, false)"));
    }

    #[test]
    fn unknown_gender_value_is_rejected() {
        let records = vec![
            PathRecord::branch(1, Feature::HasGender, positive("plural")),
            PathRecord::leaf(2, "Hand_wave"),
        ];
        let history = history();
        let err = RuleCompiler::new(&history).compile(&records).unwrap_err();
        assert!(matches!(err, CompileError::InvalidValue { .. }));
    }

    #[test]
    fn negated_body_grounds_against_history() {
        // ~hadMood(Sad) for Rock_music: only row s4 (Tired) supports it.
        let records = vec![
            PathRecord::branch(
                1,
                Feature::HadMood,
                Check::Equal {
                    value: "Sad".into(),
                    negated: true,
                },
            ),
            PathRecord::leaf(2, "Rock_music"),
        ];
        let history = history();
        let rules = RuleCompiler::new(&history).compile(&records).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].canonical(),
            "Situation(?s), hadMood(?s, Tired) -> takenAction(?s, Rock_music)"
        );
    }

    #[test]
    fn unsupported_negated_body_drops_the_leaf() {
        let records = vec![
            PathRecord::branch(
                1,
                Feature::HadMood,
                Check::Equal {
                    value: "Sad".into(),
                    negated: true,
                },
            ),
            PathRecord::leaf(2, "Unseen_action"),
        ];
        let history = history();
        let rules = RuleCompiler::new(&history).compile(&records).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn grounding_yields_one_rule_per_distinct_row() {
        let records = vec![
            PathRecord::branch(
                1,
                Feature::WasWeather,
                Check::Equal {
                    value: "Snow".into(),
                    negated: true,
                },
            ),
            PathRecord::leaf(2, "Telling_a_joke"),
        ];
        let history = history();
        let rules = RuleCompiler::new(&history).compile(&records).unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].canonical().contains("wasWeather(?s, Rain)"));
        assert!(rules[1].canonical().contains("wasWeather(?s, Cloudy)"));
    }

    #[test]
    fn concrete_user_drops_generic_user_atoms() {
        let records = vec![
            PathRecord::branch(1, Feature::HadUser, positive("John")),
            PathRecord::branch(
                2,
                Feature::HasAge,
                Check::Age {
                    op: AgeOp::Gt,
                    threshold: 30,
                },
            ),
            PathRecord::leaf(3, "Telling_a_joke"),
        ];
        let history = history();
        let rules = RuleCompiler::new(&history).compile(&records).unwrap();
        assert_eq!(
            rules[0].canonical(),
            "Situation(?s), hadUser(?s, John) -> takenAction(?s, Telling_a_joke)"
        );
    }

    #[test]
    fn depth_gap_aborts_compilation() {
        let records = vec![
            PathRecord::branch(1, Feature::HadMood, positive("Sad")),
            PathRecord::branch(3, Feature::WasTime, positive("Night")),
        ];
        let history = history();
        let err = RuleCompiler::new(&history).compile(&records).unwrap_err();
        assert!(matches!(
            err,
            CompileError::DepthGap {
                level: 3,
                stack_depth: 2
            }
        ));
    }

    #[test]
    fn empty_leaf_is_rejected() {
        let records = vec![PathRecord::leaf(1, "")];
        let history = history();
        let err = RuleCompiler::new(&history).compile(&records).unwrap_err();
        assert!(matches!(err, CompileError::EmptyLeaf));
    }
}
