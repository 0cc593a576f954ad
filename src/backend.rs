//! Trainer backends: fitting a decision tree over the history and exporting
//! its paths.
//!
//! Tree induction itself stays external; the engine only ever consumes the
//! normalized path records. [`CommandBackend`] shells out to a trainer
//! executable with a fixed file contract: it writes the dataset CSV, runs the
//! command, and reads the export file back in the configured format.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::history::ObservationRow;
use crate::paths::{parse_path_json, parse_tree_text, PathRecord};
use crate::store::rows_to_csv;

/// How the trainer exports its fitted tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Indented `export_text` dump with one-hot feature names.
    #[default]
    TreeText,
    /// JSON array of per-level path records.
    PathJson,
}

impl ExportFormat {
    fn export_file(self) -> &'static str {
        match self {
            ExportFormat::TreeText => "tree_rules.txt",
            ExportFormat::PathJson => "tree_rules.json",
        }
    }

    fn parse(self, text: &str) -> Result<Vec<PathRecord>, crate::error::PathError> {
        match self {
            ExportFormat::TreeText => parse_tree_text(text),
            ExportFormat::PathJson => parse_path_json(text),
        }
    }
}

/// A source of fresh path records for the current history.
pub trait TrainerBackend {
    /// Fit a tree on `rows` predicting `label` and return its paths.
    fn train_and_export(
        &mut self,
        rows: &[ObservationRow],
        label: &str,
    ) -> Result<Vec<PathRecord>, BackendError>;
}

/// Runs an external trainer executable over a work directory.
///
/// Invocation contract: `<command> <args..> <dataset.csv> <export-file>
/// <label>`. The trainer must write its export to the given path and exit
/// zero.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    command: PathBuf,
    args: Vec<String>,
    format: ExportFormat,
    work_dir: PathBuf,
}

impl CommandBackend {
    pub fn new(
        command: impl Into<PathBuf>,
        args: Vec<String>,
        format: ExportFormat,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command: command.into(),
            args,
            format,
            work_dir: work_dir.into(),
        }
    }

    fn write_dataset(&self, path: &Path, rows: &[ObservationRow]) -> Result<(), BackendError> {
        std::fs::create_dir_all(&self.work_dir).map_err(|source| BackendError::Io {
            path: self.work_dir.display().to_string(),
            source,
        })?;
        std::fs::write(path, rows_to_csv(rows)).map_err(|source| BackendError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

impl TrainerBackend for CommandBackend {
    fn train_and_export(
        &mut self,
        rows: &[ObservationRow],
        label: &str,
    ) -> Result<Vec<PathRecord>, BackendError> {
        let dataset = self.work_dir.join("dataset.csv");
        let export = self.work_dir.join(self.format.export_file());
        self.write_dataset(&dataset, rows)?;

        tracing::debug!(
            command = %self.command.display(),
            rows = rows.len(),
            "running external trainer"
        );
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(&dataset)
            .arg(&export)
            .arg(label)
            .output()
            .map_err(|source| BackendError::Spawn {
                command: self.command.display().to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(BackendError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let text = std::fs::read_to_string(&export).map_err(|source| BackendError::Io {
            path: export.display().to_string(),
            source,
        })?;
        let records = self.format.parse(&text)?;
        tracing::debug!(records = records.len(), "trainer export parsed");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_rows;

    #[test]
    fn export_format_picks_the_parser() {
        let tree = "|--- hadMood_Sad >  0.50\n|   |--- class: Telling_a_joke\n";
        let records = ExportFormat::TreeText.parse(tree).unwrap();
        assert_eq!(records.len(), 2);

        let json = r#"[
            {"current_level": 1, "return_statement": 1, "feature_name": "takenAction", "rule": "return 'Hand_wave'"}
        ]"#;
        let records = ExportFormat::PathJson.parse(json).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn failed_command_surfaces_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = CommandBackend::new(
            "sh",
            vec!["-c".into(), "echo boom >&2; exit 3".into()],
            ExportFormat::TreeText,
            dir.path(),
        );
        let err = backend
            .train_and_export(&test_rows::sample(), "takenAction")
            .unwrap_err();
        match err {
            BackendError::CommandFailed { stderr, .. } => assert!(stderr.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_command_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = CommandBackend::new(
            "ontoloop-no-such-trainer",
            Vec::new(),
            ExportFormat::TreeText,
            dir.path(),
        );
        let err = backend
            .train_and_export(&test_rows::sample(), "takenAction")
            .unwrap_err();
        assert!(matches!(err, BackendError::Spawn { .. }));
    }

    #[test]
    fn successful_run_reads_the_export() {
        let dir = tempfile::tempdir().unwrap();
        let export = dir.path().join("tree_rules.txt");
        std::fs::write(
            &export,
            "|--- hadMood_Sad >  0.50\n|   |--- class: Telling_a_joke\n",
        )
        .unwrap();
        // `true` ignores its arguments and leaves the prepared export alone.
        let mut backend =
            CommandBackend::new("true", Vec::new(), ExportFormat::TreeText, dir.path());
        let records = backend
            .train_and_export(&test_rows::sample(), "takenAction")
            .unwrap();
        assert_eq!(records.len(), 2);
        assert!(dir.path().join("dataset.csv").exists());
    }
}
