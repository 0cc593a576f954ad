//! Rich diagnostic error types for the ontoloop engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so users know exactly what went wrong
//! and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the ontoloop engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (error codes, help text, sources) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum OntoError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// History errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum HistoryError {
    #[error("failed to read history file: {path}")]
    #[diagnostic(
        code(ontoloop::history::io),
        help("Check that the history CSV exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed history row at line {line}: {message}")]
    #[diagnostic(
        code(ontoloop::history::malformed_row),
        help(
            "History rows are `;`-separated with the columns \
             Id;hadUser;hasPersonality;hasGender;hasAge;hadMood;wasWeather;wasTime;takenAction."
        )
    )]
    MalformedRow { line: usize, message: String },

    #[error("history header is missing column \"{column}\"")]
    #[diagnostic(
        code(ontoloop::history::missing_column),
        help("The first line of the history CSV must name all nine observation columns.")
    )]
    MissingColumn { column: String },

    #[error("no profile recorded for user \"{user}\"")]
    #[diagnostic(
        code(ontoloop::history::unknown_user),
        help(
            "A new situation can only reference users that appear in the \
             observation history, since their attributes come from past rows."
        )
    )]
    UnknownUser { user: String },
}

// ---------------------------------------------------------------------------
// Path-record errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("malformed path record at index {index}: {message}")]
    #[diagnostic(
        code(ontoloop::paths::malformed_record),
        help(
            "The classifier export produced a record without a required field. \
             This indicates a bug in the upstream trainer; the learning pass is aborted."
        )
    )]
    MalformedRecord { index: usize, message: String },

    #[error("unknown feature \"{name}\" in path record at index {index}")]
    #[diagnostic(
        code(ontoloop::paths::unknown_feature),
        help(
            "Valid features are hadUser, hasPersonality, hasGender, hasAge, \
             hadMood, wasWeather and wasTime. Check the trainer's column names."
        )
    )]
    UnknownFeature { name: String, index: usize },

    #[error("depth jumps from {previous} to {level} at record index {index}")]
    #[diagnostic(
        code(ontoloop::paths::depth_skip),
        help(
            "A pre-order tree export may descend at most one level per record. \
             The export is corrupt or was produced by an unsupported tree library."
        )
    )]
    DepthSkip {
        previous: usize,
        level: usize,
        index: usize,
    },

    #[error("failed to parse JSON path export: {message}")]
    #[diagnostic(
        code(ontoloop::paths::json),
        help("The export must be a JSON array of path-record objects.")
    )]
    Json { message: String },
}

// ---------------------------------------------------------------------------
// Compilation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error("branch at depth {level} does not extend the current body (depth {stack_depth})")]
    #[diagnostic(
        code(ontoloop::compile::depth_gap),
        help(
            "The path export skipped a tree level. The learning pass is aborted \
             and the previously installed rule set is kept."
        )
    )]
    DepthGap { level: usize, stack_depth: usize },

    #[error("leaf record carries no action label")]
    #[diagnostic(
        code(ontoloop::compile::empty_leaf),
        help("Every leaf of the exported tree must name the concluded action.")
    )]
    EmptyLeaf,

    #[error("invalid {feature} value \"{value}\" in branch condition")]
    #[diagnostic(
        code(ontoloop::compile::invalid_value),
        help("The two-valued gender domain only admits \"male\" and \"female\".")
    )]
    InvalidValue { feature: String, value: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),
}

// ---------------------------------------------------------------------------
// Trainer backend errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum BackendError {
    #[error("failed to run trainer command \"{command}\"")]
    #[diagnostic(
        code(ontoloop::backend::spawn),
        help("Check that the trainer executable exists and is on PATH.")
    )]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("trainer command exited with {status}: {stderr}")]
    #[diagnostic(
        code(ontoloop::backend::command_failed),
        help("The external trainer reported an error. Inspect its stderr output above.")
    )]
    CommandFailed { status: String, stderr: String },

    #[error("failed to exchange training data at {path}")]
    #[diagnostic(
        code(ontoloop::backend::io),
        help(
            "The dataset or export file could not be written or read. \
             Check permissions on the work directory."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] PathError),
}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("external reasoner failed: {message}")]
    #[diagnostic(
        code(ontoloop::session::reasoner),
        help(
            "The symbolic reasoner could not process the situation. \
             The registry keeps its last consistent rule set."
        )
    )]
    Reasoner { message: String },

    #[error("human input channel closed")]
    #[diagnostic(
        code(ontoloop::session::channel_closed),
        help(
            "The classification loop blocks on human confirmation and cannot \
             proceed without it. Run interactively or supply a scripted channel."
        )
    )]
    ChannelClosed,

    #[error(transparent)]
    #[diagnostic(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Backend(#[from] BackendError),
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(ontoloop::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {path}")]
    #[diagnostic(
        code(ontoloop::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(ontoloop::config::invalid),
        help("Check the RunConfig fields. {message}")
    )]
    Invalid { message: String },
}

/// Convenience alias for functions returning ontoloop results.
pub type OntoResult<T> = std::result::Result<T, OntoError>;

/// Alias for results inside a classification session.
pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_error_converts_to_onto_error() {
        let err = PathError::MalformedRecord {
            index: 3,
            message: "missing feature".into(),
        };
        let onto: OntoError = err.into();
        assert!(matches!(
            onto,
            OntoError::Path(PathError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn compile_error_wraps_path_error() {
        let err = PathError::UnknownFeature {
            name: "hadSnack".into(),
            index: 0,
        };
        let compile: CompileError = err.into();
        assert!(matches!(
            compile,
            CompileError::Path(PathError::UnknownFeature { .. })
        ));
    }

    #[test]
    fn session_error_wraps_backend_error() {
        let err = BackendError::CommandFailed {
            status: "exit code: 1".into(),
            stderr: "boom".into(),
        };
        let session: SessionError = err.into();
        let msg = format!("{session}");
        assert!(msg.contains("boom"));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = PathError::DepthSkip {
            previous: 1,
            level: 3,
            index: 7,
        };
        let msg = format!("{err}");
        assert!(msg.contains('1'));
        assert!(msg.contains('3'));
        assert!(msg.contains('7'));
    }
}
