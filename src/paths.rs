//! Decision-path normalizer: canonical per-leaf path records.
//!
//! External tree learners export their fitted model either as indented
//! `if/else` text (scikit-learn's `export_text` with one-hot features) or as
//! a JSON array of per-level records (chefboost style). Both forms normalize
//! to the same ordered [`PathRecord`] sequence — a pre-order linearization of
//! the tree — which is all the rule compiler ever sees.
//!
//! Malformed records fail fast: they indicate a producer bug upstream, so the
//! whole learning pass is aborted rather than retried.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::PathError;
use crate::history::Gender;
use crate::rule::Feature;

/// Age comparators as they appear in raw exports. Inclusive bounds are
/// normalized away by the compiler; the normalizer keeps them verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeOp {
    Le,
    Lt,
    Ge,
    Gt,
}

/// The condition tested at one branch of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// Symbolic equality, possibly negated (`not feature == value`).
    Equal { value: String, negated: bool },
    /// Numeric age comparison against an integer threshold.
    Age { op: AgeOp, threshold: i64 },
}

/// One step of a pre-order tree path.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Branch { feature: Feature, check: Check },
    /// A true leaf; carries the concluded action that becomes the rule head.
    Leaf { action: String },
}

/// One canonical path record: 1-based depth plus the step taken there.
#[derive(Debug, Clone, PartialEq)]
pub struct PathRecord {
    pub level: usize,
    pub step: Step,
}

impl PathRecord {
    pub fn branch(level: usize, feature: Feature, check: Check) -> Self {
        Self {
            level,
            step: Step::Branch { feature, check },
        }
    }

    pub fn leaf(level: usize, action: impl Into<String>) -> Self {
        Self {
            level,
            step: Step::Leaf {
                action: action.into(),
            },
        }
    }
}

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("static regex"));
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.?\d*").expect("static regex"));

/// Parse a scikit-learn style `export_text` tree dump.
///
/// Depth is the count of `|` markers per line; categorical features arrive
/// one-hot encoded as `feature_value <= 0.50` / `feature_value > 0.50`. The
/// "off" branch of a one-hot split becomes a negated equality, except for the
/// two-valued gender domain where the opposite value is asserted instead.
pub fn parse_tree_text(text: &str) -> Result<Vec<PathRecord>, PathError> {
    let mut records = Vec::new();
    let mut prev_level = 0usize;

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let level = line.matches('|').count();
        let content = match WORD.find(line) {
            Some(m) => &line[m.start()..],
            None => {
                return Err(PathError::MalformedRecord {
                    index,
                    message: format!("no condition found in line {line:?}"),
                });
            }
        };
        let tokens: Vec<&str> = content.split_whitespace().collect();

        let record = if tokens[0] == "class:" {
            let action = tokens.get(1).ok_or(PathError::MalformedRecord {
                index,
                message: "leaf line has no action label".into(),
            })?;
            PathRecord::leaf(level, *action)
        } else if tokens[0] == Feature::HasAge.name() {
            let (op, raw) = match (tokens.get(1), tokens.get(2)) {
                (Some(op), Some(raw)) => (*op, *raw),
                _ => {
                    return Err(PathError::MalformedRecord {
                        index,
                        message: "age condition is missing comparator or threshold".into(),
                    });
                }
            };
            PathRecord::branch(
                level,
                Feature::HasAge,
                Check::Age {
                    op: parse_age_op(op, index)?,
                    threshold: parse_threshold(raw, index)?,
                },
            )
        } else {
            parse_one_hot(&tokens, level, index)?
        };

        check_depth(record.level, prev_level, index)?;
        prev_level = record.level;
        records.push(record);
    }

    Ok(records)
}

/// One-hot branch line: `hadMood_Sad <= 0.50` or `hadMood_Sad > 0.50`.
fn parse_one_hot(tokens: &[&str], level: usize, index: usize) -> Result<PathRecord, PathError> {
    let (name, value) = tokens[0]
        .split_once('_')
        .ok_or_else(|| PathError::MalformedRecord {
            index,
            message: format!("one-hot condition {:?} has no feature_value form", tokens[0]),
        })?;
    let feature = Feature::parse(name).ok_or_else(|| PathError::UnknownFeature {
        name: name.into(),
        index,
    })?;
    let op = tokens.get(1).ok_or(PathError::MalformedRecord {
        index,
        message: "one-hot condition is missing its comparator".into(),
    })?;

    let check = match *op {
        // Indicator off: the value is ruled out. Gender flips to the other
        // label; everything else becomes a negated equality.
        "<=" => {
            if feature == Feature::HasGender {
                let gender = Gender::parse(value).ok_or_else(|| PathError::MalformedRecord {
                    index,
                    message: format!("unknown gender value {value:?}"),
                })?;
                Check::Equal {
                    value: gender.flipped().as_str().into(),
                    negated: false,
                }
            } else {
                Check::Equal {
                    value: value.into(),
                    negated: true,
                }
            }
        }
        ">" => Check::Equal {
            value: value.into(),
            negated: false,
        },
        other => {
            return Err(PathError::MalformedRecord {
                index,
                message: format!("unsupported one-hot comparator {other:?}"),
            });
        }
    };

    Ok(PathRecord::branch(level, feature, check))
}

// ---------------------------------------------------------------------------
// JSON export form
// ---------------------------------------------------------------------------

/// Raw per-level record as exported by the chefboost-style trainers.
#[derive(Debug, Deserialize)]
struct RawJsonRecord {
    current_level: usize,
    return_statement: u8,
    feature_name: String,
    rule: String,
}

/// Parse a JSON array of path records.
///
/// `return_statement == 1` marks a leaf whose action is the last word of the
/// rule string. Records with an explicitly empty feature name are
/// trainer-internal `else` fallbacks that fit no concrete value and are
/// skipped; a record missing the field altogether is a producer bug and
/// fails the parse.
pub fn parse_path_json(text: &str) -> Result<Vec<PathRecord>, PathError> {
    let raw: Vec<RawJsonRecord> =
        serde_json::from_str(text).map_err(|e| PathError::Json {
            message: e.to_string(),
        })?;

    let mut records = Vec::new();
    let mut prev_level = 0usize;

    for (index, rec) in raw.iter().enumerate() {
        if rec.return_statement == 0 && rec.feature_name.is_empty() {
            continue;
        }

        let record = if rec.return_statement == 1 {
            PathRecord::leaf(rec.current_level, leaf_action(&rec.rule, index)?)
        } else if rec.feature_name == Feature::HasAge.name() {
            let threshold = NUMBER
                .find_iter(&rec.rule)
                .last()
                .map(|m| m.as_str())
                .ok_or(PathError::MalformedRecord {
                    index,
                    message: "age rule has no numeric threshold".into(),
                })?;
            let op = if rec.rule.contains("<=") {
                AgeOp::Le
            } else if rec.rule.contains(">=") {
                AgeOp::Ge
            } else if rec.rule.contains('<') {
                AgeOp::Lt
            } else if rec.rule.contains('>') {
                AgeOp::Gt
            } else {
                return Err(PathError::MalformedRecord {
                    index,
                    message: format!("age rule {:?} has no comparator", rec.rule),
                });
            };
            PathRecord::branch(
                rec.current_level,
                Feature::HasAge,
                Check::Age {
                    op,
                    threshold: parse_threshold(threshold, index)?,
                },
            )
        } else {
            let feature =
                Feature::parse(&rec.feature_name).ok_or_else(|| PathError::UnknownFeature {
                    name: rec.feature_name.clone(),
                    index,
                })?;
            let negated = rec.rule.split_whitespace().nth(1) == Some("not");
            let value = last_word(&rec.rule).ok_or_else(|| PathError::MalformedRecord {
                index,
                message: format!("rule {:?} has no condition value", rec.rule),
            })?;
            PathRecord::branch(rec.current_level, feature, Check::Equal { value, negated })
        };

        check_depth(record.level, prev_level, index)?;
        prev_level = record.level;
        records.push(record);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

/// Depth contract: 1-based, and a record may descend at most one level past
/// its predecessor (backtracking to any shallower level is fine).
fn check_depth(level: usize, prev_level: usize, index: usize) -> Result<(), PathError> {
    if level == 0 || level > prev_level + 1 {
        return Err(PathError::DepthSkip {
            previous: prev_level,
            level,
            index,
        });
    }
    Ok(())
}

fn parse_age_op(op: &str, index: usize) -> Result<AgeOp, PathError> {
    match op {
        "<=" => Ok(AgeOp::Le),
        "<" => Ok(AgeOp::Lt),
        ">=" => Ok(AgeOp::Ge),
        ">" => Ok(AgeOp::Gt),
        other => Err(PathError::MalformedRecord {
            index,
            message: format!("unsupported age comparator {other:?}"),
        }),
    }
}

/// Thresholds arrive as floats (`16.50`); the integer part is what matters
/// for the integer-valued age domain.
fn parse_threshold(raw: &str, index: usize) -> Result<i64, PathError> {
    raw.parse::<f64>()
        .map(|v| v.trunc() as i64)
        .map_err(|_| PathError::MalformedRecord {
            index,
            message: format!("cannot parse age threshold {raw:?}"),
        })
}

/// The concluded action of a leaf rule string (`class: X`, `return 'X'`).
fn leaf_action(rule: &str, index: usize) -> Result<String, PathError> {
    last_word(rule).ok_or_else(|| PathError::MalformedRecord {
        index,
        message: format!("leaf rule {rule:?} has no action label"),
    })
}

/// The word-character run of a rule's last whitespace token, stripping the
/// quoting and punctuation the trainers wrap values in.
fn last_word(rule: &str) -> Option<String> {
    let token = rule.split_whitespace().last()?;
    WORD.find(token).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = "\
|--- hadMood_Sad <= 0.50
|   |--- wasTime_Morning <= 0.50
|   |   |--- class: Staying_quiet
|   |--- wasTime_Morning >  0.50
|   |   |--- class: Verbal_greeting
|--- hadMood_Sad >  0.50
|   |--- hasAge <= 16.50
|   |   |--- class: Rock_music
|   |--- hasAge >  16.50
|   |   |--- class: User_comforting
";

    #[test]
    fn tree_text_parses_in_preorder() {
        let records = parse_tree_text(TREE).unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(
            records[0],
            PathRecord::branch(
                1,
                Feature::HadMood,
                Check::Equal {
                    value: "Sad".into(),
                    negated: true
                }
            )
        );
        assert_eq!(records[2], PathRecord::leaf(3, "Staying_quiet"));
        assert_eq!(
            records[6],
            PathRecord::branch(
                2,
                Feature::HasAge,
                Check::Age {
                    op: AgeOp::Le,
                    threshold: 16
                }
            )
        );
    }

    #[test]
    fn one_hot_off_branch_negates() {
        let records = parse_tree_text("|--- wasWeather_Rain <= 0.50\n|   |--- class: Hand_wave\n")
            .unwrap();
        assert_eq!(
            records[0].step,
            Step::Branch {
                feature: Feature::WasWeather,
                check: Check::Equal {
                    value: "Rain".into(),
                    negated: true
                }
            }
        );
    }

    #[test]
    fn gender_off_branch_flips_instead_of_negating() {
        let records =
            parse_tree_text("|--- hasGender_male <= 0.50\n|   |--- class: Hand_wave\n").unwrap();
        assert_eq!(
            records[0].step,
            Step::Branch {
                feature: Feature::HasGender,
                check: Check::Equal {
                    value: "female".into(),
                    negated: false
                }
            }
        );
    }

    #[test]
    fn unknown_feature_fails_fast() {
        let err = parse_tree_text("|--- hadSnack_Crisps > 0.50\n").unwrap_err();
        assert!(matches!(err, PathError::UnknownFeature { .. }));
    }

    #[test]
    fn missing_leaf_label_fails_fast() {
        let err = parse_tree_text("|--- class:\n").unwrap_err();
        assert!(matches!(err, PathError::MalformedRecord { .. }));
    }

    #[test]
    fn depth_skip_is_rejected() {
        let err = parse_tree_text("|   |   |--- hadMood_Sad > 0.50\n").unwrap_err();
        assert!(matches!(
            err,
            PathError::DepthSkip {
                previous: 0,
                level: 3,
                ..
            }
        ));
    }

    #[test]
    fn json_records_parse() {
        let json = r#"[
            {"current_level": 1, "return_statement": 0, "feature_name": "hadMood", "rule": "if obj[4] == 'Sad':"},
            {"current_level": 2, "return_statement": 0, "feature_name": "hasAge", "rule": "if obj[3]<=16:"},
            {"current_level": 3, "return_statement": 1, "feature_name": "takenAction", "rule": "return 'Rock_music'"}
        ]"#;
        let records = parse_path_json(json).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0].step,
            Step::Branch {
                feature: Feature::HadMood,
                check: Check::Equal {
                    value: "Sad".into(),
                    negated: false
                }
            }
        );
        assert_eq!(
            records[1].step,
            Step::Branch {
                feature: Feature::HasAge,
                check: Check::Age {
                    op: AgeOp::Le,
                    threshold: 16
                }
            }
        );
        assert_eq!(records[2], PathRecord::leaf(3, "Rock_music"));
    }

    #[test]
    fn json_negated_condition() {
        let json = r#"[
            {"current_level": 1, "return_statement": 0, "feature_name": "hadMood", "rule": "if not hadMood == Sad"},
            {"current_level": 2, "return_statement": 1, "feature_name": "takenAction", "rule": "class: Staying_quiet"}
        ]"#;
        let records = parse_path_json(json).unwrap();
        assert_eq!(
            records[0].step,
            Step::Branch {
                feature: Feature::HadMood,
                check: Check::Equal {
                    value: "Sad".into(),
                    negated: true
                }
            }
        );
    }

    #[test]
    fn json_empty_feature_records_are_skipped() {
        let json = r#"[
            {"current_level": 1, "return_statement": 0, "feature_name": "", "rule": "else:"},
            {"current_level": 1, "return_statement": 0, "feature_name": "hadMood", "rule": "if hadMood == Sad"},
            {"current_level": 2, "return_statement": 1, "feature_name": "takenAction", "rule": "class: Hand_wave"}
        ]"#;
        let records = parse_path_json(json).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn json_record_without_feature_name_fails_fast() {
        // Unlike the explicit "" of an else-fallback record, a missing key
        // means the producer is broken.
        let json = r#"[
            {"current_level": 1, "return_statement": 0, "rule": "if hadMood == Sad"}
        ]"#;
        let err = parse_path_json(json).unwrap_err();
        assert!(matches!(err, PathError::Json { .. }));
    }

    #[test]
    fn json_age_last_number_wins() {
        // The chefboost form references the column index first; only the
        // trailing number is the threshold.
        let json = r#"[
            {"current_level": 1, "return_statement": 0, "feature_name": "hasAge", "rule": "if obj[3]>24:"},
            {"current_level": 2, "return_statement": 1, "feature_name": "takenAction", "rule": "return 'Hand_wave'"}
        ]"#;
        let records = parse_path_json(json).unwrap();
        assert_eq!(
            records[0].step,
            Step::Branch {
                feature: Feature::HasAge,
                check: Check::Age {
                    op: AgeOp::Gt,
                    threshold: 24
                }
            }
        );
    }
}
