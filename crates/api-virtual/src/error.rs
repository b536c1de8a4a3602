//! Error types for the virtual API server.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VirtualError {
    /// Error reading a config or body file.
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for the expected shape.
    #[error("Failed to parse {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A `body_file` could not be parsed.
    #[error("Failed to load body file {path:?}: {source}")]
    BodyFile {
        path: PathBuf,
        #[source]
        source: envkit_core::CoreError,
    },

    /// A config directory with no `*.yaml`/`*.yml` files.
    #[error("No .yaml or .yml files found in {0:?}")]
    NoConfigFiles(PathBuf),

    /// Route definitions that cannot be served.
    #[error("Invalid route '{route}': {reason}")]
    InvalidConfig { route: String, reason: String },

    /// Listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Server loop failed.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl VirtualError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VirtualError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(route: impl Into<String>, reason: impl Into<String>) -> Self {
        VirtualError::InvalidConfig {
            route: route.into(),
            reason: reason.into(),
        }
    }
}
