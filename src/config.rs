//! Run configuration, loaded from a TOML file with sensible defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::ExportFormat;
use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Path to the observation history CSV.
    pub history: PathBuf,
    /// Where the analysis statistics JSON is written.
    pub results: PathBuf,
    /// Probability of asking the human instead of learning when reasoning
    /// fails. Must lie in `[0, 1]`.
    pub ask_rate: f64,
    /// Seed for the session RNG; omit for entropy.
    pub seed: Option<u64>,
    /// Seed for the situation generator.
    pub generator_seed: Option<u64>,
    /// Number of situations to generate and classify per run.
    pub situations: usize,
    /// Action labels offered to the human even before any row concludes them.
    pub extra_actions: Vec<String>,
    /// Action-label equivalence groups; the first label of each group wins.
    pub synonyms: Vec<Vec<String>>,
    pub trainer: TrainerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainerConfig {
    /// The external trainer executable.
    pub command: PathBuf,
    pub args: Vec<String>,
    pub format: ExportFormat,
    /// Directory for the dataset/export file exchange.
    pub work_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            history: PathBuf::from("knowledge/actions_taken.csv"),
            results: PathBuf::from("results/analysis_results.json"),
            ask_rate: 0.1,
            seed: None,
            generator_seed: None,
            situations: 20,
            extra_actions: Vec::new(),
            synonyms: Vec::new(),
            trainer: TrainerConfig::default(),
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from("ontoloop-train"),
            args: Vec::new(),
            format: ExportFormat::TreeText,
            work_dir: PathBuf::from("knowledge"),
        }
    }
}

impl RunConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.ask_rate) {
            return Err(ConfigError::Invalid {
                message: format!("ask_rate must lie in [0, 1], got {}", self.ask_rate),
            });
        }
        if self.situations == 0 {
            return Err(ConfigError::Invalid {
                message: "situations must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::default();
        config.validate().unwrap();
        assert_eq!(config.ask_rate, 0.1);
        assert_eq!(config.trainer.format, ExportFormat::TreeText);
    }

    #[test]
    fn toml_roundtrip() {
        let text = r#"
history = "data/history.csv"
ask_rate = 0.25
seed = 42
situations = 5
synonyms = [["Verbal_greeting", "Saying_hello"]]

[trainer]
command = "python3"
args = ["train.py"]
format = "path-json"
"#;
        let config: RunConfig = toml::from_str(text).unwrap();
        config.validate().unwrap();
        assert_eq!(config.history, PathBuf::from("data/history.csv"));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.trainer.format, ExportFormat::PathJson);
        assert_eq!(config.synonyms[0][1], "Saying_hello");
    }

    #[test]
    fn out_of_range_ask_rate_is_rejected() {
        let config = RunConfig {
            ask_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = RunConfig::load("no/such/config.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
