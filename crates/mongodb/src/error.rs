//! Error types for MongoDB operations.

use thiserror::Error;

/// Errors that can occur while seeding or querying MongoDB.
#[derive(Error, Debug)]
pub enum MongoError {
    /// MongoDB connection or query error.
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    /// A seed value could not be read as Extended JSON.
    #[error("Invalid Extended JSON: {0}")]
    ExtendedJson(#[from] bson::extjson::de::Error),

    /// A seed document was not a JSON object.
    #[error("Document #{0} is not a JSON object")]
    NotADocument(usize),

    /// A filter/projection/sort argument was not a JSON object.
    #[error("Invalid {kind}: expected a JSON object")]
    InvalidQuery { kind: &'static str },

    /// Seed file loading error.
    #[error(transparent)]
    Documents(#[from] envkit_core::CoreError),
}
