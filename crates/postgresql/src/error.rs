//! Error types for Postgres operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running SQL, migrations or seeds.
#[derive(Error, Debug)]
pub enum PostgresError {
    /// Connection URL could not be parsed.
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    /// A subprocess could not be started.
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A subprocess exited unsuccessfully.
    #[error("'{program}' exited with {}: {stderr}", status_text(.status))]
    CommandFailed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    /// I/O while talking to a subprocess or reading a script.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Native driver error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Seed document error.
    #[error(transparent)]
    Seed(#[from] SeedError),

    /// Interpolation or file loading error.
    #[error(transparent)]
    Core(#[from] envkit_core::CoreError),
}

fn status_text(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Errors raised while loading or compiling a seed-yaml document.
#[derive(Error, Debug)]
pub enum SeedError {
    /// Error reading the seed file.
    #[error("Failed to read seed file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing YAML.
    #[error("Failed to parse seed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Variable interpolation failed.
    #[error("{location}: {source}")]
    Interpolation {
        location: String,
        #[source]
        source: envkit_core::CoreError,
    },

    /// A `vars` entry was not a scalar.
    #[error("Variable '{0}' must be a string, number or boolean")]
    InvalidVariable(String),

    /// A row with no values.
    #[error("{location}: row has no values")]
    EmptyRow { location: String },

    /// A row lacks one of its table's upsert key columns.
    #[error("{location}: missing upsert key column '{column}'")]
    MissingUpsertKey { location: String, column: String },

    /// Two rows in one database scope share a `ref` name.
    #[error("Duplicate ref '{name}' in database '{scope}'")]
    DuplicateRef { scope: String, name: String },

    /// `@ref:` to a name not defined anywhere in the scope.
    #[error("{location}: unknown ref '{name}'")]
    UnknownReference { location: String, name: String },

    /// `@ref:` to a row declared later in the scope.
    #[error("{location}: ref '{name}' is used before the row that defines it")]
    ForwardReference { location: String, name: String },

    /// `@ref:` to a row whose table has no upsert key to look it up by.
    #[error("{location}: ref '{name}' points into table '{table}', which has no upsert_key")]
    UnaddressableReference {
        location: String,
        name: String,
        table: String,
    },

    /// Malformed `@ref:` value.
    #[error("{location}: invalid reference '{value}' (expected @ref:NAME.COLUMN)")]
    InvalidReference { location: String, value: String },

    /// A value that cannot be turned into SQL.
    #[error("{location}: column '{column}': {reason}")]
    UnsupportedValue {
        location: String,
        column: String,
        reason: String,
    },

    /// Empty table name or empty identifier part.
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// `--only` named a database the document does not define.
    #[error("Unknown database scope '{0}'")]
    UnknownDatabase(String),

    /// `databases` used the reserved name for the unnamed scope.
    #[error("Database name 'default' is reserved for top-level tables")]
    ReservedDatabaseName,
}
