//! Knowledge store: the persisted observation history behind the session.
//!
//! The canonical persistence format is a `;`-separated CSV with one row per
//! resolved situation. The store also derives user profiles from past rows,
//! since a new situation only names the user and the circumstances.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::HistoryError;
use crate::history::{Gender, ObservationRow, Situation, SynonymMap, UserProfile};
use crate::rule::Feature;

/// The nine columns of the history CSV, in order.
const COLUMNS: [&str; 9] = [
    "Id",
    "hadUser",
    "hasPersonality",
    "hasGender",
    "hasAge",
    "hadMood",
    "wasWeather",
    "wasTime",
    "takenAction",
];

/// What the classification session needs from the persisted knowledge.
pub trait KnowledgeStore {
    /// A snapshot of all observation rows.
    fn rows(&self) -> Vec<ObservationRow>;

    /// Every action label the session may offer the user, sorted and unique.
    fn action_labels(&self) -> Vec<String>;

    /// The declared action-label equivalences.
    fn synonyms(&self) -> SynonymMap;

    /// Append the resolved action for a situation as a new observation row.
    fn record_resolution(&mut self, situation: &Situation, action: &str)
        -> Result<(), HistoryError>;

    /// Total number of stored observations.
    fn situation_count(&self) -> usize;
}

/// File-backed store over the `;`-separated history CSV.
#[derive(Debug, Clone, Default)]
pub struct CsvStore {
    rows: Vec<ObservationRow>,
    extra_actions: Vec<String>,
    synonyms: SynonymMap,
    next_id: u64,
}

impl CsvStore {
    /// Load the history from a CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| HistoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Build a store from in-memory rows.
    pub fn from_rows(rows: Vec<ObservationRow>) -> Self {
        let next_id = next_id_after(&rows);
        Self {
            rows,
            extra_actions: Vec::new(),
            synonyms: SynonymMap::new(),
            next_id,
        }
    }

    /// Parse the CSV text form.
    pub fn parse(text: &str) -> Result<Self, HistoryError> {
        let mut lines = text.lines().enumerate();
        let (_, header) = lines.next().ok_or(HistoryError::MissingColumn {
            column: COLUMNS[0].into(),
        })?;
        let positions = column_positions(header)?;

        let mut rows = Vec::new();
        for (index, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            rows.push(parse_row(line, &positions, index + 1)?);
        }
        Ok(Self::from_rows(rows))
    }

    /// Declare extra action labels the user may pick even though no past row
    /// concluded them yet.
    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn set_synonyms(&mut self, synonyms: SynonymMap) {
        self.synonyms = synonyms;
    }

    /// Serialize back to the CSV text form.
    pub fn to_csv(&self) -> String {
        rows_to_csv(&self.rows)
    }

    /// Write the history back to a CSV file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), HistoryError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_csv()).map_err(|source| HistoryError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// The latest known attributes of every user seen in the history.
    pub fn user_profiles(&self) -> HashMap<String, UserProfile> {
        let mut profiles = HashMap::new();
        for row in &self.rows {
            profiles.insert(
                row.user.clone(),
                UserProfile {
                    personality: row.personality.clone(),
                    gender: row.gender,
                    age: row.age,
                },
            );
        }
        profiles
    }
}

impl KnowledgeStore for CsvStore {
    fn rows(&self) -> Vec<ObservationRow> {
        self.rows.clone()
    }

    fn action_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.rows.iter().map(|r| r.action.clone()).collect();
        labels.extend(self.extra_actions.iter().cloned());
        labels.sort();
        labels.dedup();
        labels
    }

    fn synonyms(&self) -> SynonymMap {
        self.synonyms.clone()
    }

    fn record_resolution(
        &mut self,
        situation: &Situation,
        action: &str,
    ) -> Result<(), HistoryError> {
        let profile = self
            .rows
            .iter()
            .rev()
            .find(|r| r.user == situation.user)
            .map(|r| UserProfile {
                personality: r.personality.clone(),
                gender: r.gender,
                age: r.age,
            })
            .ok_or_else(|| HistoryError::UnknownUser {
                user: situation.user.clone(),
            })?;

        self.rows.push(ObservationRow {
            id: format!("s{}", self.next_id),
            user: situation.user.clone(),
            personality: profile.personality,
            gender: profile.gender,
            age: profile.age,
            mood: situation.mood.clone(),
            weather: situation.weather.clone(),
            time: situation.time.clone(),
            action: action.to_string(),
        });
        self.next_id += 1;
        Ok(())
    }

    fn situation_count(&self) -> usize {
        self.rows.len()
    }
}

/// Serialize rows to the `;`-separated CSV text, header included.
pub fn rows_to_csv(rows: &[ObservationRow]) -> String {
    let mut out = COLUMNS.join(";");
    out.push('\n');
    for row in rows {
        let _ = writeln!(
            out,
            "{};{};{};{};{};{};{};{};{}",
            row.id,
            row.user,
            row.personality,
            row.gender.as_str(),
            row.age,
            row.mood,
            row.weather,
            row.time,
            row.action
        );
    }
    out
}

/// Map each required column to its position in the header.
fn column_positions(header: &str) -> Result<Vec<usize>, HistoryError> {
    let names: Vec<&str> = header.split(';').map(str::trim).collect();
    COLUMNS
        .iter()
        .map(|column| {
            names
                .iter()
                .position(|n| n == column)
                .ok_or(HistoryError::MissingColumn {
                    column: (*column).to_string(),
                })
        })
        .collect()
}

fn parse_row(
    line: &str,
    positions: &[usize],
    line_no: usize,
) -> Result<ObservationRow, HistoryError> {
    let fields: Vec<&str> = line.split(';').map(str::trim).collect();
    let field = |slot: usize| -> Result<&str, HistoryError> {
        fields
            .get(positions[slot])
            .copied()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| HistoryError::MalformedRow {
                line: line_no,
                message: format!("missing value for column {}", COLUMNS[slot]),
            })
    };

    let gender_text = field(3)?;
    let gender = Gender::parse(gender_text).ok_or_else(|| HistoryError::MalformedRow {
        line: line_no,
        message: format!("unknown gender {gender_text:?}"),
    })?;
    let age_text = field(4)?;
    let age = age_text
        .parse::<i64>()
        .map_err(|_| HistoryError::MalformedRow {
            line: line_no,
            message: format!("cannot parse {} {age_text:?}", Feature::HasAge.name()),
        })?;

    Ok(ObservationRow {
        id: field(0)?.to_string(),
        user: field(1)?.to_string(),
        personality: field(2)?.to_string(),
        gender,
        age,
        mood: field(5)?.to_string(),
        weather: field(6)?.to_string(),
        time: field(7)?.to_string(),
        action: field(8)?.to_string(),
    })
}

/// The next free numeric id suffix after the stored rows.
fn next_id_after(rows: &[ObservationRow]) -> u64 {
    rows.iter()
        .filter_map(|r| r.id.trim_start_matches(|c: char| !c.is_ascii_digit()).parse::<u64>().ok())
        .max()
        .map_or(rows.len() as u64 + 1, |max| max + 1)
}
