//! MongoDB seeding and query helpers for envkit.
//!
//! Seed files are plain JSON (MongoDB Extended JSON is accepted, so
//! `{"$oid": ...}` and `{"$date": ...}` round-trip to their BSON types).
//! Query results come back as relaxed Extended JSON.

pub mod args;
mod convert;
mod error;
mod query;
mod seeder;

pub use args::MongoArgs;
pub use convert::{document_to_json, json_to_document, json_to_filter};
pub use error::MongoError;
pub use query::FindQuery;
pub use seeder::{CollectionInfo, MongoSeeder, SeedMetrics, DEFAULT_BATCH_SIZE};
