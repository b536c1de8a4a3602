//! Error types for shared envkit operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading documents, interpolating or rendering output.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Error reading a file from disk.
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error.
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error.
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A single line of a JSON Lines file failed to parse.
    #[error("Invalid JSON on line {line}: {source}")]
    JsonLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// File extension is not one of the supported seed formats.
    #[error("Unsupported document format for {0:?} (expected .json, .jsonl, .ndjson, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),

    /// `${name}` placeholder with no value and no default.
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),

    /// `${` without a closing brace.
    #[error("Unterminated placeholder in '{0}'")]
    UnterminatedPlaceholder(String),

    /// Placeholder with an empty name, e.g. `${}`.
    #[error("Invalid placeholder '{0}'")]
    InvalidPlaceholder(String),

    /// `--var` argument without `=`.
    #[error("Invalid variable assignment '{0}' (expected KEY=VALUE)")]
    InvalidAssignment(String),
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }
}
